/// A file selected by the customer, kept in memory until upload
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Copy of this file renamed to `<prefix>_<base>.<ext>`
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let name = match self.name.rsplit_once('.') {
            Some((base, ext)) => format!("{prefix}_{base}.{ext}"),
            None => format!("{prefix}_{}", self.name),
        };

        Self {
            name,
            mime_type: self.mime_type.clone(),
            bytes: self.bytes.clone(),
        }
    }
}

// Bytes are left out so logs stay readable.
impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// A photo attached to a claim form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// File as it will be stored, already renamed
    pub file: SourceFile,

    /// Locally rendered preview, never sent to the backend
    pub preview_data_uri: String,

    /// Set once the upload succeeded
    pub uploaded_url: Option<String>,
}

impl ImageAttachment {
    pub fn new(file: SourceFile, preview_data_uri: impl Into<String>) -> Self {
        Self {
            file,
            preview_data_uri: preview_data_uri.into(),
            uploaded_url: None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded_url.is_some()
    }
}
