//! Logging and correlation for claim submissions

pub mod tracing;

pub use crate::tracing::{
    build_filter, init_tracing, ErrorContext, LogFormat, SubmissionId, SubmissionSpan,
    TelemetryError,
};
