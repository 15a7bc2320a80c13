//! Configuration structures

use sav_forms::{AttachmentPolicy, DEFAULT_ACCEPTED_TYPES, DEFAULT_MAX_FILE_SIZE};
use sav_retry::RetryPolicy;
use sav_telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration.
///
/// Every section and field is optional in sources; missing values take the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage proxy
    pub api: ApiConfig,

    /// Automation webhook receiving the claim
    pub webhook: WebhookConfig,

    /// Retry of every outbound call
    pub retry: RetryConfig,

    /// Photo intake limits
    pub attachments: AttachmentConfig,

    /// Claim folder naming
    pub storage: StorageConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the storage proxy
    pub base_url: String,

    /// Sent as `X-API-Key` when set
    pub api_key: Option<String>,

    /// Transport timeout per request in milliseconds
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// A missing URL is not a load error; submission fails on it instead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts including the first
    pub max_attempts: u32,

    /// Wait after the first failure, doubled after each following one
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.max_attempts, self.base_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: RetryPolicy::DEFAULT_BASE_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    pub max_file_size_bytes: usize,
    pub accepted_types: Vec<String>,
}

impl AttachmentConfig {
    pub fn policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::new(self.accepted_types.clone(), self.max_file_size_bytes)
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefix of every claim folder name
    pub root_folder: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_folder: default_root_folder(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,

    /// One JSON object per line instead of human readable output
    pub json: bool,
}

impl LoggingConfig {
    pub fn format(&self) -> LogFormat {
        LogFormat::from_json_flag(self.json)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_root_folder() -> String {
    "SAV".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
