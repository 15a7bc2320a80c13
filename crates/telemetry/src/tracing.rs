use std::fmt;
use std::str::FromStr;
use tracing::Span;
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Pretty,

    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Filter from `RUST_LOG` when set, else from `default_directives`
pub fn build_filter(default_directives: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directives)
        .map_err(|e| TelemetryError::InvalidFilter(format!("{default_directives}: {e}")))
}

/// Install the global subscriber.
///
/// Fails if the directives do not parse or a subscriber is already installed.
pub fn init_tracing(default_directives: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = build_filter(default_directives)?;
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt_layer::layer().with_target(true).json()))
        .with((!json).then(|| fmt_layer::layer().with_target(true)))
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))?;

    Ok(())
}

/// Identifier carried by every log line of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionId(uuid::Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TelemetryError::InvalidId(format!("{s}: {e}")))
    }
}

/// Span context for one claim submission
#[derive(Debug, Clone)]
pub struct SubmissionSpan {
    pub submission_id: SubmissionId,
    pub invoice_number: String,
}

impl SubmissionSpan {
    pub fn new(invoice_number: impl Into<String>) -> Self {
        Self {
            submission_id: SubmissionId::new(),
            invoice_number: invoice_number.into(),
        }
    }

    /// Span to instrument the submission future with
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "submission",
            submission_id = %self.submission_id,
            invoice = %self.invoice_number,
        )
    }

    pub fn enter(&self) -> tracing::span::EnteredSpan {
        self.span().entered()
    }
}

/// Log an error with submission context on its way up
pub trait ErrorContext {
    fn with_submission_id(self, submission_id: SubmissionId) -> Self;

    fn with_stage(self, stage: &str) -> Self;
}

impl<T, E> ErrorContext for Result<T, E>
where
    E: fmt::Display,
{
    fn with_submission_id(self, submission_id: SubmissionId) -> Self {
        self.map_err(|e| {
            tracing::error!(
                submission_id = %submission_id,
                error = %e,
                "submission error"
            );
            e
        })
    }

    fn with_stage(self, stage: &str) -> Self {
        self.map_err(|e| {
            tracing::error!(stage, error = %e, "submission error");
            e
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter {0}")]
    InvalidFilter(String),

    #[error("tracing initialization error: {0}")]
    InitError(String),

    #[error("invalid submission id {0}")]
    InvalidId(String),
}
