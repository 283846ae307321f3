//! Configuration management for the prediction service

use crate::types::record::FeatureName;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "HEART_API_CONFIG";

/// Prefix for `HEART_API__SECTION__KEY` overrides
const ENV_PREFIX: &str = "HEART_API";

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log shippers
    #[default]
    Json,
    /// Human-readable multi-line output
    Pretty,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX classifier
    pub path: PathBuf,
    /// Feature column order used at training time
    pub feature_order: Vec<String>,
    /// Number of threads for ONNX inference per session (default: 1)
    pub onnx_threads: usize,
    /// Number of ONNX sessions serving requests in parallel
    pub session_pool_size: usize,
    /// Probability above which a record is labelled positive, when the
    /// model has no label output of its own
    pub decision_threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/random_forest.onnx"),
            feature_order: FeatureName::canonical_order(),
            onnx_threads: 1,
            session_pool_size: 4,
            decision_threshold: 0.5,
        }
    }
}

impl ModelConfig {
    /// Parsed feature order. Fails unless every feature appears exactly once.
    pub fn features(&self) -> Result<Vec<FeatureName>> {
        let validator = crate::validator::FeatureValidator::with_order(&self.feature_order)?;
        Ok(validator.feature_order().to_vec())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged metrics summaries (0 disables)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from `$HEART_API_CONFIG` or the default file
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; environment variables override it, and the
    /// legacy `MODEL_PATH` and `LOG_LEVEL` variables override both.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("model.path", std::env::var("MODEL_PATH").ok())
            .context("Failed to apply MODEL_PATH override")?
            .set_override_option("logging.level", std::env::var("LOG_LEVEL").ok())
            .context("Failed to apply LOG_LEVEL override")?
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<()> {
        self.server.bind_addr()?;
        self.model.features()?;
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.model.decision_threshold),
            "model.decision_threshold must be within [0, 1], got {}",
            self.model.decision_threshold
        );
        anyhow::ensure!(self.model.onnx_threads > 0, "model.onnx_threads must be positive");
        anyhow::ensure!(
            self.model.session_pool_size > 0,
            "model.session_pool_size must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.feature_order.len(), 13);
        assert_eq!(config.model.feature_order[0], "age");
        assert_eq!(config.model.decision_threshold, 0.5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9100

[model]
path = "artifacts/heart.onnx"
session_pool_size = 2

[logging]
level = "debug"
format = "pretty"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind_addr().unwrap().to_string(), "127.0.0.1:9100");
        assert_eq!(config.model.session_pool_size, 2);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        // untouched keys keep their defaults
        assert_eq!(config.model.onnx_threads, 1);
        assert_eq!(config.metrics.report_interval_secs, 60);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_feature_order_rejected() {
        let mut config = AppConfig::default();
        config.model.feature_order.pop();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.model.decision_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
