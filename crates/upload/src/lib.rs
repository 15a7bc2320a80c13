//! Outbound calls of the SAV claim pipeline
//!
//! - `FileTransferClient`: one file to the storage proxy, retried, with progress
//! - `ParallelUploadCoordinator`: a batch of files, settled independently
//! - `WebhookClient`: the final claim document to the automation webhook
//!
//! Transport sits behind the `StorageBackend` and `WebhookBackend` traits;
//! `HttpStorageBackend` and `HttpWebhookBackend` are the reqwest implementations.

pub mod backend;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod webhook;

pub use backend::{
    progress_percent, ProgressFn, ShareLinkResponse, StorageBackend, StoredFile, UploadResponse,
    WebhookBackend,
};
pub use client::{FileTransferClient, UploadOptions, SHARE_LINK_FAILED, UPLOAD_FAILED};
pub use coordinator::ParallelUploadCoordinator;
pub use error::ApiError;
pub use http::{HttpStorageBackend, HttpWebhookBackend, API_KEY_HEADER};
pub use webhook::{WebhookClient, WEBHOOK_URL_SETTING};
