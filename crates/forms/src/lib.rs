//! Claim form state for the SAV claim wizard
//!
//! One `ClaimForm` per invoice line, owned by a `ClaimFormStore`. Forms are
//! created lazily, validated field by field, locked once filled, and reset on
//! delete. Photo intake lives in `attachments`.

pub mod attachments;
pub mod store;
pub mod validation;

pub use attachments::{
    preview_data_uri, remove_image, AttachmentError, AttachmentPolicy, DEFAULT_ACCEPTED_TYPES,
    DEFAULT_MAX_FILE_SIZE, INVALID_FILES_MESSAGE,
};
pub use store::{ClaimFormStore, FilledForm, ItemValidation};
pub use validation::validate_form;
