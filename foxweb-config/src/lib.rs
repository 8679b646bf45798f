//! Configuration loading for Foxweb.
//!
//! Reads an [`AppConfig`] from a TOML, JSON, or `.env`-style file, then
//! overlays `FOXWEB_*` environment variables on top, so the environment always
//! wins. A `.env` file in the working directory is honoured via `dotenvy`.

pub mod env;
pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use foxweb_core::AppConfig;

/// Load configuration with the standard precedence: defaults, then the file
/// (when given), then the process environment.
pub fn load(path: Option<&str>) -> Result<AppConfig> {
    // Pull a .env file into the process environment first, if present.
    dotenvy::dotenv().ok();

    let mut config = match path {
        Some(path) => ConfigLoader::auto(path)?.load_file(path)?,
        None => AppConfig::default(),
    };
    env::overlay_env(&mut config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults_without_file() {
        let config = load(None).unwrap();
        assert_eq!(config.session_cookie_name, "micropy_session");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "secret_key = \"file-secret\"").unwrap();

        let config = load(path.to_str()).unwrap();
        assert_eq!(config.secret_key, "file-secret");
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "session_cookie_name = \"from_file\"").unwrap();

        // set_var is unsafe in edition 2024; this test owns the variable.
        unsafe { std::env::set_var("FOXWEB_SESSION_COOKIE_NAME", "from_env") };
        let config = load(path.to_str()).unwrap();
        unsafe { std::env::remove_var("FOXWEB_SESSION_COOKIE_NAME") };

        assert_eq!(config.session_cookie_name, "from_env");
    }
}
