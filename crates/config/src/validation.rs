//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Storage proxy
    if let Err(e) = validate_url(&config.api.base_url) {
        errors.push(ValidationError::new("api.base_url", e));
    }

    if config.api.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "api.timeout_ms",
            "must be greater than 0",
        ));
    }

    // Webhook: optional, but must be usable when present
    if let Some(url) = config.webhook.url.as_deref().filter(|u| !u.trim().is_empty()) {
        if let Err(e) = validate_url(url) {
            errors.push(ValidationError::new("webhook.url", e));
        }
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retry.max_attempts",
            "must be at least 1",
        ));
    }

    // Attachments
    if config.attachments.max_file_size_bytes == 0 {
        errors.push(ValidationError::new(
            "attachments.max_file_size_bytes",
            "must be greater than 0",
        ));
    }

    if config.attachments.accepted_types.is_empty() {
        errors.push(ValidationError::new(
            "attachments.accepted_types",
            "at least one MIME type must be accepted",
        ));
    }

    for (idx, mime) in config.attachments.accepted_types.iter().enumerate() {
        if !is_mime_type(mime) {
            errors.push(ValidationError::new(
                format!("attachments.accepted_types[{idx}]"),
                format!("'{mime}' is not a MIME type"),
            ));
        }
    }

    if let Err(e) = validate_root_folder(&config.storage.root_folder) {
        errors.push(ValidationError::new("storage.root_folder", e));
    }

    if let Err(e) = validate_log_level(&config.logging.level) {
        errors.push(e);
    }

    // Return all errors if any were found
    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok(())
}

/// Folder prefixes go into storage paths verbatim
fn validate_root_folder(root: &str) -> std::result::Result<(), String> {
    if root.is_empty() {
        return Err("root folder cannot be empty".to_string());
    }

    if !root
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!(
            "invalid root folder '{root}', only letters, digits, '_' and '-' are allowed"
        ));
    }

    Ok(())
}

fn is_mime_type(value: &str) -> bool {
    match value.split_once('/') {
        Some((kind, subtype)) => !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/'),
        None => false,
    }
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "logging.level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
