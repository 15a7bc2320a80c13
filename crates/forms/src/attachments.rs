use base64::{engine::general_purpose::STANDARD, Engine as _};
use sav_types::{ClaimForm, ImageAttachment, SourceFile};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_ACCEPTED_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/heic",
    "image/heif",
];

/// 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const INVALID_FILES_MESSAGE: &str = "Certains fichiers ne sont pas valides (formats acceptés: JPEG, PNG, GIF, WebP, SVG, HEIC - taille max 10Mo)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("form is filled, re-open it before changing photos")]
    FormLocked,

    #[error("rejected files: {}", .rejected.join(", "))]
    InvalidFiles { rejected: Vec<String> },

    #[error("no photo at position {0}")]
    NoSuchImage(usize),
}

/// Which customer files may be attached to a claim
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    accepted_types: Vec<String>,
    max_file_size: usize,
}

impl AttachmentPolicy {
    pub fn new(accepted_types: Vec<String>, max_file_size: usize) -> Self {
        Self {
            accepted_types,
            max_file_size,
        }
    }

    pub fn accepted_types(&self) -> &[String] {
        &self.accepted_types
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn accepts(&self, file: &SourceFile) -> bool {
        self.accepted_types.iter().any(|t| t == &file.mime_type) && file.size() <= self.max_file_size
    }

    /// Attach a batch of photos to `form`, renamed with `prefix` when one is given.
    ///
    /// The batch is all or nothing: one unacceptable file rejects every file
    /// and records the reason in `form.errors.images`. Returns the number of
    /// photos added.
    pub fn attach(
        &self,
        form: &mut ClaimForm,
        files: Vec<SourceFile>,
        prefix: Option<&str>,
    ) -> Result<usize, AttachmentError> {
        if form.is_locked() {
            return Err(AttachmentError::FormLocked);
        }

        form.errors.images.clear();

        let rejected: Vec<String> = files
            .iter()
            .filter(|file| !self.accepts(file))
            .map(|file| file.name.clone())
            .collect();

        if !rejected.is_empty() {
            warn!(rejected = ?rejected, "photo batch rejected");
            form.errors.images = INVALID_FILES_MESSAGE.to_string();
            return Err(AttachmentError::InvalidFiles { rejected });
        }

        let added = files.len();
        for file in files {
            let file = match prefix.filter(|p| !p.is_empty()) {
                Some(prefix) => file.with_prefix(prefix),
                None => file,
            };
            let preview = preview_data_uri(&file);
            debug!(file = %file.name, size = file.size(), "photo attached");
            form.images.push(ImageAttachment::new(file, preview));
        }

        Ok(added)
    }
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
            DEFAULT_MAX_FILE_SIZE,
        )
    }
}

/// `data:` URI used to preview a file locally
pub fn preview_data_uri(file: &SourceFile) -> String {
    format!("data:{};base64,{}", file.mime_type, STANDARD.encode(&file.bytes))
}

/// Detach the photo at `position`
pub fn remove_image(
    form: &mut ClaimForm,
    position: usize,
) -> Result<ImageAttachment, AttachmentError> {
    if form.is_locked() {
        return Err(AttachmentError::FormLocked);
    }
    if position >= form.images.len() {
        return Err(AttachmentError::NoSuchImage(position));
    }
    Ok(form.images.remove(position))
}
