// Environment variable overlay

use crate::{ConfigError, Result};
use foxweb_core::AppConfig;
use std::env;

/// Environment prefix for configuration keys
pub const ENV_PREFIX: &str = "FOXWEB_";

const KEYS: &[&str] = &[
    "SECRET_KEY",
    "SESSION_COOKIE_NAME",
    "SESSION_COOKIE_SECURE",
    "SESSION_SAME_SITE",
    "SESSION_PERMANENT",
    "SESSION_LIFETIME_SECS",
    "STATIC_URL_PREFIX",
    "STATIC_DIR",
    "TEMPLATE_DIR",
    "DEBUG",
    "TESTING",
];

/// Apply every `FOXWEB_*` variable present in the environment.
///
/// Environment values win over whatever the config already holds, giving the
/// usual file-then-environment precedence.
pub fn overlay_env(config: &mut AppConfig) -> Result<()> {
    for key in KEYS {
        if let Ok(value) = env::var(format!("{}{}", ENV_PREFIX, key)) {
            apply_value(config, key, &value)?;
        }
    }
    Ok(())
}

/// Set a single configuration field from its string form.
pub fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<()> {
    match key.to_uppercase().as_str() {
        "SECRET_KEY" => config.secret_key = value.to_string(),
        "SESSION_COOKIE_NAME" => config.session_cookie_name = value.to_string(),
        "SESSION_COOKIE_SECURE" => config.session_cookie_secure = parse_bool(key, value)?,
        "SESSION_SAME_SITE" => {
            config.session_same_site = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        "SESSION_PERMANENT" => config.session_permanent = parse_bool(key, value)?,
        "SESSION_LIFETIME_SECS" => {
            config.session_lifetime_secs =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected an integer, got {:?}", value),
                })?
        }
        "STATIC_URL_PREFIX" => config.static_url_prefix = value.to_string(),
        "STATIC_DIR" => config.static_dir = value.to_string(),
        "TEMPLATE_DIR" => config.template_dir = value.to_string(),
        "DEBUG" => config.debug = parse_bool(key, value)?,
        "TESTING" => config.testing = parse_bool(key, value)?,
        other => {
            return Err(ConfigError::InvalidValue {
                key: other.to_string(),
                message: "unknown configuration key".to_string(),
            })
        }
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {:?}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_string_value() {
        let mut config = AppConfig::default();
        apply_value(&mut config, "SECRET_KEY", "prod").unwrap();
        assert_eq!(config.secret_key, "prod");
    }

    #[test]
    fn test_apply_bool_value() {
        let mut config = AppConfig::default();
        apply_value(&mut config, "DEBUG", "true").unwrap();
        assert!(config.debug);
        apply_value(&mut config, "DEBUG", "off").unwrap();
        assert!(!config.debug);
        assert!(apply_value(&mut config, "DEBUG", "maybe").is_err());
    }

    #[test]
    fn test_apply_integer_value() {
        let mut config = AppConfig::default();
        apply_value(&mut config, "SESSION_LIFETIME_SECS", "3600").unwrap();
        assert_eq!(config.session_lifetime_secs, 3600);
        assert!(apply_value(&mut config, "SESSION_LIFETIME_SECS", "soon").is_err());
    }

    #[test]
    fn test_same_site_empty_clears() {
        let mut config = AppConfig::default();
        apply_value(&mut config, "SESSION_SAME_SITE", "Lax").unwrap();
        assert_eq!(config.session_same_site.as_deref(), Some("Lax"));
        apply_value(&mut config, "SESSION_SAME_SITE", "").unwrap();
        assert_eq!(config.session_same_site, None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut config = AppConfig::default();
        assert!(apply_value(&mut config, "NOT_A_KEY", "x").is_err());
    }

    #[test]
    fn test_overlay_env_reads_prefixed_vars() {
        // set_var is unsafe in edition 2024; this test owns the variable.
        unsafe { env::set_var("FOXWEB_SECRET_KEY", "from-env") };
        let mut config = AppConfig::default();
        overlay_env(&mut config).unwrap();
        assert_eq!(config.secret_key, "from-env");
        unsafe { env::remove_var("FOXWEB_SECRET_KEY") };
    }
}
