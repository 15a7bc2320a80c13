use async_trait::async_trait;
use sav_types::SourceFile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::ApiError;

/// Receives the percentage (0..=100) of the request body sent so far
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Body of `POST /api/upload-onedrive`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub file: Option<StoredFile>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn stored(url: impl Into<String>) -> Self {
        Self {
            success: true,
            file: Some(StoredFile {
                url: Some(url.into()),
                ..Default::default()
            }),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            file: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Body of `POST /api/folder-share-link`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareLinkResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "shareLink")]
    pub share_link: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ShareLinkResponse {
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            success: true,
            share_link: Some(url.into()),
            error: None,
        }
    }
}

/// Storage proxy holding the claim folders
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `file` in `folder`, reporting send progress when asked
    async fn upload_file(
        &self,
        file: &SourceFile,
        folder: &str,
        progress: Option<ProgressFn>,
    ) -> Result<UploadResponse, ApiError>;

    /// Ask for a shareable link to `folder`
    async fn folder_share_link(&self, folder: &str) -> Result<ShareLinkResponse, ApiError>;
}

/// Automation webhook receiving the claim document
#[async_trait]
pub trait WebhookBackend: Send + Sync {
    /// POST `payload` as JSON to `url` and return the response body
    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value, ApiError>;
}

/// `round(sent * 100 / total)`, or `None` when the total is unknown
pub fn progress_percent(sent: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let sent = u128::from(sent.min(total));
    let total = u128::from(total);
    // floor(x + 0.5) without floats
    let percent = (sent * 200 + total) / (total * 2);
    u8::try_from(percent).ok()
}
