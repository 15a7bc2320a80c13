use sav_upload::ApiError;
use thiserror::Error;

/// Phase of a claim submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    CollectingForms,
    UploadingImages,
    UploadingReport,
    RequestingShareLink,
    PostingWebhook,
}

impl SubmissionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStage::CollectingForms => "collecting_forms",
            SubmissionStage::UploadingImages => "uploading_images",
            SubmissionStage::UploadingReport => "uploading_report",
            SubmissionStage::RequestingShareLink => "requesting_share_link",
            SubmissionStage::PostingWebhook => "posting_webhook",
        }
    }
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First fatal failure of a submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("no filled claim form to submit")]
    NoFilledForms,

    #[error("claim forms {indices:?} are open but not validated")]
    UnfinishedForms { indices: Vec<usize> },

    #[error("claim form {index} is already being processed")]
    FormBusy { index: usize },

    #[error("claim form {index} no longer passes validation")]
    InvalidForm { index: usize },

    #[error("invoice has no line {index}")]
    UnknownLine { index: usize },

    #[error("cannot derive a storage folder name from '{0}'")]
    InvalidFolderName(String),

    #[error("{failed} of {total} image uploads failed: {first_error}")]
    ImageUpload {
        failed: usize,
        total: usize,
        first_error: String,
    },

    #[error("report upload failed: {0}")]
    ReportUpload(ApiError),

    #[error("share link request failed: {0}")]
    ShareLink(ApiError),

    #[error("webhook submission failed: {0}")]
    Webhook(ApiError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SubmissionError {
    pub fn stage(&self) -> SubmissionStage {
        match self {
            SubmissionError::NoFilledForms
            | SubmissionError::UnfinishedForms { .. }
            | SubmissionError::FormBusy { .. }
            | SubmissionError::InvalidForm { .. }
            | SubmissionError::UnknownLine { .. }
            | SubmissionError::InvalidFolderName(_)
            | SubmissionError::Configuration(_) => SubmissionStage::CollectingForms,
            SubmissionError::ImageUpload { .. } => SubmissionStage::UploadingImages,
            SubmissionError::ReportUpload(_) => SubmissionStage::UploadingReport,
            SubmissionError::ShareLink(_) => SubmissionStage::RequestingShareLink,
            SubmissionError::Webhook(_) => SubmissionStage::PostingWebhook,
        }
    }

    /// Underlying backend failure, when the stage talked to one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SubmissionError::ReportUpload(e)
            | SubmissionError::ShareLink(e)
            | SubmissionError::Webhook(e) => Some(e),
            _ => None,
        }
    }
}
