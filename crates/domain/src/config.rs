//! Runtime configuration: TOML file with CLI overrides on top.
//!
//! Lookup order: explicit `--config` path, `chainprobe.toml` in the working
//! directory, `/etc/chainprobe/config.toml`, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("failed to parse config file: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Knobs of the prober core. Addresses are plain IPs; port 53 is implied.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Recursive resolver used for cacheable helper lookups (SOA, A).
    #[serde(default = "default_resolver")]
    pub resolver: String,

    /// Root server queried during trust-anchor bootstrap.
    #[serde(default = "default_root_server")]
    pub root_server: String,

    /// Per-query deadline, applied to UDP and to the TCP fallback alike.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of domains validated concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            resolver: default_resolver(),
            root_server: default_root_server(),
            timeout_secs: default_timeout_secs(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_resolver() -> String {
    "8.8.8.8".to_string()
}

fn default_root_server() -> String {
    // a.root-servers.net
    "198.41.0.4".to_string()
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_workers() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Flags that take precedence over file values.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub resolver: Option<String>,
    pub root_server: Option<String>,
    pub timeout_secs: Option<u64>,
    pub workers: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("chainprobe.toml").exists() {
            Self::from_file("chainprobe.toml")?
        } else if std::path::Path::new("/etc/chainprobe/config.toml").exists() {
            Self::from_file("/etc/chainprobe/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(resolver) = overrides.resolver {
            self.probe.resolver = resolver;
        }
        if let Some(root_server) = overrides.root_server {
            self.probe.root_server = root_server;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.probe.timeout_secs = timeout;
        }
        if let Some(workers) = overrides.workers {
            self.probe.workers = workers;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "probe.timeout_secs cannot be 0".to_string(),
            ));
        }
        if self.probe.workers == 0 {
            return Err(ConfigError::Validation(
                "probe.workers cannot be 0".to_string(),
            ));
        }
        self.probe
            .resolver
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::Validation(format!("bad resolver IP: {}", self.probe.resolver)))?;
        self.probe
            .root_server
            .parse::<IpAddr>()
            .map_err(|_| {
                ConfigError::Validation(format!("bad root server IP: {}", self.probe.root_server))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe.resolver, "8.8.8.8");
        assert_eq!(config.probe.root_server, "198.41.0.4");
        assert_eq!(config.probe.timeout_secs, 3);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply_cli_overrides(CliOverrides {
            resolver: Some("1.1.1.1".into()),
            workers: Some(4),
            ..Default::default()
        });
        assert_eq!(config.probe.resolver, "1.1.1.1");
        assert_eq!(config.probe.workers, 4);
        assert_eq!(config.probe.timeout_secs, 3);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_src = r#"
            [probe]
            resolver = "9.9.9.9"
            workers = 8

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.probe.resolver, "9.9.9.9");
        assert_eq!(config.probe.workers, 8);
        // omitted keys fall back to defaults
        assert_eq!(config.probe.root_server, "198.41.0.4");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.probe.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.probe.resolver = "not-an-ip".into();
        assert!(config.validate().is_err());
    }
}
