//! Translator configuration
//!
//! Loads configuration from a YAML file (query naming and logging
//! settings). Environment variables always override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Naming of the produced query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Name given to every translated query
    pub name: String,

    /// Package the fact prototypes and the query are declared in
    pub namespace: String,

    /// Fact type used when rendering rule source
    pub fact_type: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            name: "Q0".to_string(),
            namespace: "sqlrule.materialized".to_string(),
            fact_type: "Fact".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main translator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

impl TranslatorConfig {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: TranslatorConfig = serde_yaml::from_str(&contents)?;
        Ok(config.with_env_overrides())
    }

    /// Defaults with environment variable overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = std::env::var("SQLRULE_QUERY_NAME") {
            self.query.name = name;
        }
        if let Ok(namespace) = std::env::var("SQLRULE_NAMESPACE") {
            self.query.namespace = namespace;
        }
        if let Ok(fact_type) = std::env::var("SQLRULE_FACT_TYPE") {
            self.query.fact_type = fact_type;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }

        self
    }
}
