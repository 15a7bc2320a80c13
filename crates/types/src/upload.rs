use serde::{Deserialize, Serialize};

use crate::SourceFile;

/// MIME type of generated claim reports
pub const SPREADSHEET_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A generated file handed over as base64 text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPayload {
    /// Base64 encoded file content
    pub content: String,
    pub filename: String,
}

impl EncodedPayload {
    pub fn new(content: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
        }
    }
}

/// Something the storage proxy can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPayload {
    /// A customer file, sent as is
    Raw(SourceFile),

    /// A generated report, decoded before sending
    Encoded(EncodedPayload),
}

impl UploadPayload {
    pub fn file_name(&self) -> &str {
        match self {
            UploadPayload::Raw(file) => &file.name,
            UploadPayload::Encoded(payload) => &payload.filename,
        }
    }

    pub fn is_base64(&self) -> bool {
        matches!(self, UploadPayload::Encoded(_))
    }
}

impl From<SourceFile> for UploadPayload {
    fn from(file: SourceFile) -> Self {
        UploadPayload::Raw(file)
    }
}

impl From<EncodedPayload> for UploadPayload {
    fn from(payload: EncodedPayload) -> Self {
        UploadPayload::Encoded(payload)
    }
}

/// Settled result of one upload in a batch.
///
/// Holds either the stored file URL or the failure message, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub file_name: String,
    result: Result<String, String>,
}

impl UploadOutcome {
    pub fn success(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            result: Ok(url.into()),
        }
    }

    pub fn failure(file_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            result: Err(error_message.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn url(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}
