//! Configuration for the JSON exporter.

use std::net::SocketAddr;
use std::path::Path;

use json_exporter_common::LoggingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] json_exporter_common::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: ":9116", all interfaces).
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    ":9116".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Outbound request configuration for probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Total timeout for fetching a target (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification when fetching targets.
    #[serde(default = "default_insecure_skip_verify")]
    pub insecure_skip_verify: bool,

    /// User-Agent header sent to targets.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_insecure_skip_verify() -> bool {
    true
}

fn default_user_agent() -> String {
    concat!("json-exporter/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            insecure_skip_verify: default_insecure_skip_verify(),
            user_agent: default_user_agent(),
        }
    }
}

/// Parse a listen address, accepting the `:port` shorthand for all interfaces.
pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };

    candidate
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid listen address: {}", listen)))
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json_exporter_common::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json_exporter_common::parse_config(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The socket address to bind.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.server.listen)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.probe.user_agent.is_empty() {
            return Err(ConfigError::Validation(
                "user_agent must not be empty".to_string(),
            ));
        }

        self.listen_addr()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_exporter_common::LogFormat;

    #[test]
    fn test_parse_minimal_config() {
        let config = ExporterConfig::parse("{}").unwrap();

        assert_eq!(config.server.listen, ":9116");
        assert_eq!(config.probe.timeout_secs, 30);
        assert!(config.probe.insecure_skip_verify);
        assert!(config.probe.user_agent.starts_with("json-exporter/"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.listen_addr().unwrap(),
            "0.0.0.0:9116".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            server: {
                listen: "127.0.0.1:9200",
            },
            probe: {
                timeout_secs: 5,
                insecure_skip_verify: false,
                user_agent: "probe/1.0",
            },
            logging: {
                level: "debug",
                format: "json"
            }
        }"#;

        let config = ExporterConfig::parse(json).unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:9200");
        assert_eq!(config.probe.timeout_secs, 5);
        assert!(!config.probe.insecure_skip_verify);
        assert_eq!(config.probe.user_agent, "probe/1.0");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_listen_addr() {
        assert_eq!(
            parse_listen_addr(":9116").unwrap(),
            "0.0.0.0:9116".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_addr("[::1]:8080").unwrap(),
            "[::1]:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_addr("not-an-address").is_err());
        assert!(parse_listen_addr("9116").is_err());
    }

    #[test]
    fn test_validate_invalid_listen() {
        let json = r#"{
            server: { listen: "not-an-address" }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid listen address")
        );
    }

    #[test]
    fn test_validate_zero_timeout() {
        let json = r#"{
            probe: { timeout_secs: 0 }
        }"#;

        let result = ExporterConfig::parse(json);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = ExporterConfig::parse("{ server: ");
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ server: {{ listen: \":9300\" }} }}").unwrap();

        let config = ExporterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.listen_addr().unwrap().port(), 9300);
    }
}
