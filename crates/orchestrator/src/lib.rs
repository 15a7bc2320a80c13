pub mod error;
pub mod folder;
pub mod payload;
pub mod submission;

#[cfg(test)]
mod tests;

// Re-export main types
pub use error::{SubmissionError, SubmissionStage};
pub use folder::{claim_folder_name, sanitize_folder_name, MAX_FOLDER_NAME_LEN};
pub use payload::{build_claim_payload, StoredEvidence};
pub use submission::{ClaimSubmission, SubmissionOrchestrator, SubmissionReceipt};
