//! Layered loading: shipped file, then `SAV_*` environment overrides

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Prefix of environment overrides: `SAV_API__BASE_URL`
pub const ENV_PREFIX: &str = "SAV";

/// Keys whose environment value is a comma separated list
const LIST_KEYS: [&str; 1] = ["attachments.accepted_types"];

/// File format, picked from the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Yaml,
    Json,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ConfigError::LoadError(format!("{} has no file extension", path.display()))
        })?;

        match ext {
            "toml" => Ok(SourceFormat::Toml),
            "yaml" | "yml" => Ok(SourceFormat::Yaml),
            "json" => Ok(SourceFormat::Json),
            other => Err(ConfigError::LoadError(format!(
                "unsupported config format '.{other}' ({})",
                path.display()
            ))),
        }
    }

    pub fn parse(self, content: &str) -> Result<AppConfig> {
        Ok(match self {
            SourceFormat::Toml => toml::from_str(content)?,
            SourceFormat::Yaml => serde_yaml::from_str(content)?,
            SourceFormat::Json => serde_json::from_str(content)?,
        })
    }

    fn file_format(self) -> FileFormat {
        match self {
            SourceFormat::Toml => FileFormat::Toml,
            SourceFormat::Yaml => FileFormat::Yaml,
            SourceFormat::Json => FileFormat::Json,
        }
    }
}

/// Entry points for reading an `AppConfig`
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse one TOML, YAML or JSON file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let format = SourceFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        format.parse(&content)
    }

    pub fn from_toml(content: &str) -> Result<AppConfig> {
        SourceFormat::Toml.parse(content)
    }

    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        SourceFormat::Yaml.parse(content)
    }

    pub fn from_json(content: &str) -> Result<AppConfig> {
        SourceFormat::Json.parse(content)
    }

    /// Defaults overlaid by `SAV_*` variables
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Variables are `PREFIX_SECTION__KEY`, for example
    /// `SAV_WEBHOOK__URL=https://hook.example/abc`
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        Self::builder().add_env(prefix).build()
    }

    /// `path` overlaid by variables carrying `env_prefix`
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        Self::builder().add_file(path, true)?.add_env(env_prefix).build()
    }

    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            inner: Config::builder(),
        }
    }
}

/// Sources stacked in call order; a later source wins per key
pub struct ConfigLoaderBuilder {
    inner: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    pub fn add_file(mut self, path: &Path, required: bool) -> Result<Self> {
        let format = SourceFormat::from_path(path)?;
        debug!(path = %path.display(), ?format, required, "adding config file");
        self.inner = self
            .inner
            .add_source(File::from(path).format(format.file_format()).required(required));
        Ok(self)
    }

    pub fn add_env(mut self, prefix: &str) -> Self {
        let env = LIST_KEYS.iter().fold(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .try_parsing(true),
            |env, key| env.with_list_parse_key(key),
        );
        self.inner = self.inner.add_source(env);
        self
    }

    /// Value used when no source sets `key`
    pub fn set_default(mut self, key: &str, value: &str) -> Result<Self> {
        self.inner = self.inner.set_default(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<AppConfig> {
        Ok(self.inner.build()?.try_deserialize()?)
    }
}
