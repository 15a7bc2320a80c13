use sav_retry::{is_client_error, Retryable};
use thiserror::Error;

/// Failure of a call to the storage proxy or the webhook
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// 4xx: the request itself is wrong, retrying cannot help
    #[error("HTTP {status}: {message}")]
    ClientFault { status: u16, message: String },

    /// Network error, timeout or 5xx
    #[error("{message}{}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    TransientFault { status: Option<u16>, message: String },

    /// 2xx response carrying `success: false`
    #[error("{0}")]
    LogicalFailure(String),

    /// 2xx response missing the expected fields
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A required endpoint or setting is missing
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be built from the given input
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Classify an unsuccessful HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_client_error(status) {
            ApiError::ClientFault { status, message }
        } else {
            ApiError::TransientFault {
                status: Some(status),
                message,
            }
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::TransientFault {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ClientFault { status, .. } => Some(*status),
            ApiError::TransientFault { status, .. } => *status,
            _ => None,
        }
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::TransientFault { .. } | ApiError::MalformedResponse(_)
        )
    }
}
