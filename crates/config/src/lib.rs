//! Configuration for the SAV claim pipeline
//!
//! - TOML, YAML and JSON files
//! - `SAV_*` environment overrides (`SAV_API__BASE_URL`, `SAV_RETRY__MAX_ATTEMPTS`, ...)
//! - Validation that reports every problem at once

mod config;
mod loader;
mod validation;

pub use config::*;
pub use loader::*;
pub use validation::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Config validation failed: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config library error: {0}")]
    ConfigLibError(#[from] ::config::ConfigError),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
