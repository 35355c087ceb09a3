//! Application configuration
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path (`--config`), or the override in the data dir
//!    (~/.local/share/zytra/config/zytra.toml) when it exists
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::forecast::{MAX_HORIZON, MIN_HORIZON};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/zytra.toml");

/// Web server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upload limit per request in megabytes
    pub max_upload_mb: usize,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_mb: 10,
            static_dir: None,
        }
    }
}

/// Seed account settings for the in-memory credential store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub seed_admin: bool,
    pub admin_email: String,
    pub admin_name: String,
    pub admin_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            seed_admin: true,
            admin_email: "admin@zytra.com".to_string(),
            admin_name: "admin".to_string(),
            admin_secret: "zytra123".to_string(),
        }
    }
}

/// Forecast panel defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub default_horizon: usize,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            default_horizon: 30,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub auth: AuthConfig,
    pub forecast: ForecastSettings,
}

impl Config {
    /// Load configuration (explicit path, then data dir override, then defaults)
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "Loading config override");
                read_config(path)?
            }
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!(path = %path.display(), "Loading config from data dir");
                    read_config(&path)?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::parse(&content)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Embedded defaults
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    fn validate(&self) -> Result<()> {
        let horizon = self.forecast.default_horizon;
        if !(MIN_HORIZON..=MAX_HORIZON).contains(&horizon) {
            return Err(Error::Config(format!(
                "forecast.default_horizon must be between {} and {}, got {}",
                MIN_HORIZON, MAX_HORIZON, horizon
            )));
        }
        if self.server.max_upload_mb == 0 {
            return Err(Error::Config("server.max_upload_mb must be positive".into()));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::Config(format!("Failed to read config: {}", e)))
}

/// Get the default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("zytra").join("config").join("zytra.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = Config::embedded().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = Config::parse(
            r#"
[server]
port = 9000

[auth]
seed_admin = false
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.auth.seed_admin);
        assert_eq!(config.forecast.default_horizon, 30);
    }

    #[test]
    fn test_default_horizon_out_of_range() {
        let err = Config::parse("[forecast]\ndefault_horizon = 90\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::parse("[forecast]\ndefault_horizon = 6\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::parse("[server\nport = "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[forecast]\ndefault_horizon = 14").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.forecast.default_horizon, 14);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/zytra.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(Config::parse(&rendered).unwrap(), config);
    }
}
