// Runtime configuration consumed by the dispatcher

use crate::session::SessionOptions;
use serde::Deserialize;

/// Application configuration, read-only once the app is built.
///
/// Loading from files or the environment lives in the `foxweb-config` crate;
/// the core only consumes the resulting values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Secret key for session signing. Never logged.
    pub secret_key: String,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    pub session_same_site: Option<String>,
    /// When set, session cookies carry `Max-Age` and survive the browser.
    pub session_permanent: bool,
    pub session_lifetime_secs: u64,
    pub static_url_prefix: String,
    pub static_dir: String,
    pub template_dir: String,
    pub debug: bool,
    pub testing: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret_key: "dev-secret".to_string(),
            session_cookie_name: "micropy_session".to_string(),
            session_cookie_secure: false,
            session_same_site: None,
            session_permanent: false,
            session_lifetime_secs: 2_678_400, // 31 days
            static_url_prefix: "/static".to_string(),
            static_dir: "static".to_string(),
            template_dir: "templates".to_string(),
            debug: false,
            testing: false,
        }
    }
}

impl AppConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            cookie_name: self.session_cookie_name.clone(),
            secure: self.session_cookie_secure,
            same_site: self.session_same_site.clone(),
            permanent: self.session_permanent,
            max_age_secs: self.session_lifetime_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.session_cookie_name, "micropy_session");
        assert_eq!(config.static_url_prefix, "/static");
        assert!(!config.session_permanent);
    }

    #[test]
    fn test_session_options_mirror_config() {
        let config = AppConfig {
            session_cookie_secure: true,
            session_same_site: Some("Strict".to_string()),
            session_permanent: true,
            session_lifetime_secs: 60,
            ..Default::default()
        };
        let options = config.session_options();
        assert!(options.secure);
        assert_eq!(options.same_site.as_deref(), Some("Strict"));
        assert!(options.permanent);
        assert_eq!(options.max_age_secs, 60);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AppConfig =
            serde_json::from_str(r#"{"secret_key": "prod-key", "debug": true}"#).unwrap();
        assert_eq!(config.secret_key, "prod-key");
        assert!(config.debug);
        assert_eq!(config.session_cookie_name, "micropy_session");
    }
}
