use base64::{engine::general_purpose::STANDARD, Engine as _};
use sav_retry::{RetryExecutor, RetryPolicy};
use sav_types::{SourceFile, UploadPayload, SPREADSHEET_MIME};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::{ProgressFn, ShareLinkResponse, StorageBackend, UploadResponse};
use crate::ApiError;

pub const UPLOAD_FAILED: &str = "Upload failed";
pub const SHARE_LINK_FAILED: &str = "Impossible de récupérer le lien de partage du dossier.";

#[derive(Clone, Default)]
pub struct UploadOptions {
    pub on_progress: Option<ProgressFn>,
}

impl UploadOptions {
    pub fn with_progress(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            on_progress: Some(Arc::new(callback)),
        }
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// Single-file operations against the storage proxy, each wrapped in retry
#[derive(Clone)]
pub struct FileTransferClient {
    backend: Arc<dyn StorageBackend>,
    executor: RetryExecutor,
}

impl FileTransferClient {
    /// Client with the default policy: 3 attempts, 1000ms base delay
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_retry_policy(backend, RetryPolicy::default())
    }

    pub fn with_retry_policy(backend: Arc<dyn StorageBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            executor: RetryExecutor::new(policy),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    /// Upload one file into `folder` and return its stored URL.
    ///
    /// Base64 payloads are decoded once, before the first attempt; a payload
    /// that does not decode fails without touching the network. Progress
    /// never goes backwards across retries.
    pub async fn upload_single(
        &self,
        payload: &UploadPayload,
        folder: &str,
        options: &UploadOptions,
    ) -> Result<String, ApiError> {
        let file = decode_payload(payload)?;
        let file = &*file;
        info!(file = %file.name, size = file.size(), folder, "uploading file");
        let on_progress = options.on_progress.clone().map(monotonic_progress);

        let url = self
            .executor
            .run(|| {
                let progress = on_progress.clone();
                async move {
                    let response = self.backend.upload_file(file, folder, progress).await?;
                    stored_url(response)
                }
            })
            .await?;

        debug!(file = %file.name, url = %url, "file stored");
        Ok(url)
    }

    /// Shareable link to `folder`
    pub async fn get_folder_share_link(&self, folder: &str) -> Result<String, ApiError> {
        let link = self
            .executor
            .run(|| async move {
                let response = self.backend.folder_share_link(folder).await?;
                share_link(response)
            })
            .await?;

        info!(folder, "share link obtained");
        Ok(link)
    }
}

/// Drops percentages below the highest one already reported
fn monotonic_progress(report: ProgressFn) -> ProgressFn {
    let high_water = AtomicU8::new(0);
    Arc::new(move |percent: u8| {
        if high_water.fetch_max(percent, Ordering::Relaxed) <= percent {
            report(percent);
        }
    })
}

fn decode_payload(payload: &UploadPayload) -> Result<Cow<'_, SourceFile>, ApiError> {
    match payload {
        UploadPayload::Raw(file) => Ok(Cow::Borrowed(file)),
        UploadPayload::Encoded(encoded) => {
            let bytes = STANDARD.decode(encoded.content.as_bytes()).map_err(|e| {
                ApiError::InvalidRequest(format!("{} is not valid base64: {e}", encoded.filename))
            })?;
            Ok(Cow::Owned(SourceFile::new(
                encoded.filename.clone(),
                SPREADSHEET_MIME,
                bytes,
            )))
        }
    }
}

fn stored_url(response: UploadResponse) -> Result<String, ApiError> {
    if !response.success {
        return Err(ApiError::LogicalFailure(
            response
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| UPLOAD_FAILED.to_string()),
        ));
    }
    response
        .file
        .and_then(|file| file.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::MalformedResponse("upload response carries no file url".to_string()))
}

fn share_link(response: ShareLinkResponse) -> Result<String, ApiError> {
    if !response.success {
        return Err(ApiError::LogicalFailure(
            response
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| SHARE_LINK_FAILED.to_string()),
        ));
    }
    response
        .share_link
        .filter(|link| !link.is_empty())
        .ok_or_else(|| ApiError::MalformedResponse("share link response carries no link".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sav_types::EncodedPayload;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Replays scripted responses and records every call
    #[derive(Default)]
    struct ScriptedBackend {
        uploads: Mutex<VecDeque<Result<UploadResponse, ApiError>>>,
        links: Mutex<VecDeque<Result<ShareLinkResponse, ApiError>>>,
        received: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl ScriptedBackend {
        fn uploads(script: Vec<Result<UploadResponse, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                uploads: Mutex::new(script.into()),
                ..Default::default()
            })
        }

        fn links(script: Vec<Result<ShareLinkResponse, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                links: Mutex::new(script.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StorageBackend for ScriptedBackend {
        async fn upload_file(
            &self,
            file: &SourceFile,
            folder: &str,
            progress: Option<ProgressFn>,
        ) -> Result<UploadResponse, ApiError> {
            self.received.lock().unwrap().push((
                file.name.clone(),
                folder.to_string(),
                file.bytes.clone(),
            ));
            if let Some(progress) = progress {
                for percent in [0, 50, 100] {
                    progress(percent);
                }
            }
            self.uploads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(UploadResponse::stored("https://files/default")))
        }

        async fn folder_share_link(&self, folder: &str) -> Result<ShareLinkResponse, ApiError> {
            self.received
                .lock()
                .unwrap()
                .push((String::new(), folder.to_string(), Vec::new()));
            self.links
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ShareLinkResponse::link("https://share/default")))
        }
    }

    fn photo() -> UploadPayload {
        UploadPayload::Raw(SourceFile::new("photo.jpg", "image/jpeg", vec![1, 2, 3]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_returns_stored_url() {
        let backend = ScriptedBackend::uploads(vec![Ok(UploadResponse::stored("https://files/1"))]);
        let client = FileTransferClient::new(backend.clone());

        let url = client
            .upload_single(&photo(), "SAV_F1_1", &UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(url, "https://files/1");
        let received = backend.received.lock().unwrap();
        assert_eq!(received[0].0, "photo.jpg");
        assert_eq!(received[0].1, "SAV_F1_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_forwarded() {
        let backend = ScriptedBackend::uploads(vec![Ok(UploadResponse::stored("https://files/1"))]);
        let client = FileTransferClient::new(backend);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        client
            .upload_single(
                &photo(),
                "SAV",
                &UploadOptions::with_progress(move |p| sink.lock().unwrap().push(p)),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 50, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_does_not_restart_on_retry() {
        let backend = ScriptedBackend::uploads(vec![
            Err(ApiError::from_status(503, "Service Unavailable")),
            Ok(UploadResponse::stored("https://files/1")),
        ]);
        let client = FileTransferClient::new(backend.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        client
            .upload_single(
                &photo(),
                "SAV",
                &UploadOptions::with_progress(move |p| sink.lock().unwrap().push(p)),
            )
            .await
            .unwrap();

        assert_eq!(backend.calls(), 2);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![0, 50, 100, 100]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_monotonic_progress_filters_regressions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let report = monotonic_progress(Arc::new(move |p: u8| sink.lock().unwrap().push(p)));

        for percent in [10, 80, 5, 40, 80, 90] {
            report(percent);
        }

        assert_eq!(*seen.lock().unwrap(), vec![10, 80, 80, 90]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_encoded_payload_is_decoded() {
        let backend = ScriptedBackend::uploads(vec![Ok(UploadResponse::stored("https://files/report"))]);
        let client = FileTransferClient::new(backend.clone());
        let payload = UploadPayload::Encoded(EncodedPayload {
            content: "aGVsbG8=".to_string(),
            filename: "rapport.xlsx".to_string(),
        });

        client
            .upload_single(&payload, "SAV", &UploadOptions::default())
            .await
            .unwrap();

        let received = backend.received.lock().unwrap();
        assert_eq!(received[0].0, "rapport.xlsx");
        assert_eq!(received[0].2, b"hello".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_base64_fails_before_network() {
        let backend = ScriptedBackend::uploads(vec![]);
        let client = FileTransferClient::new(backend.clone());
        let payload = UploadPayload::Encoded(EncodedPayload {
            content: "not base64!".to_string(),
            filename: "rapport.xlsx".to_string(),
        });

        let err = client
            .upload_single(&payload, "SAV", &UploadOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logical_failure_is_not_retried() {
        let backend = ScriptedBackend::uploads(vec![Ok(UploadResponse::rejected("Quota dépassé"))]);
        let client = FileTransferClient::new(backend.clone());

        let err = client
            .upload_single(&photo(), "SAV", &UploadOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::LogicalFailure("Quota dépassé".to_string()));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logical_failure_without_text_uses_fallback() {
        let backend = ScriptedBackend::uploads(vec![Ok(UploadResponse {
            success: false,
            ..Default::default()
        })]);
        let client = FileTransferClient::new(backend);

        let err = client
            .upload_single(&photo(), "SAV", &UploadOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), UPLOAD_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_with_backoff() {
        let backend = ScriptedBackend::uploads(vec![
            Err(ApiError::network("connection reset")),
            Err(ApiError::from_status(503, "Service Unavailable")),
            Ok(UploadResponse::stored("https://files/3")),
        ]);
        let client = FileTransferClient::new(backend.clone());
        let start = Instant::now();

        let url = client
            .upload_single(&photo(), "SAV", &UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(url, "https://files/3");
        assert_eq!(backend.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_fault_fails_fast() {
        let backend = ScriptedBackend::uploads(vec![Err(ApiError::from_status(401, "Unauthorized"))]);
        let client = FileTransferClient::new(backend.clone());

        let err = client
            .upload_single(&photo(), "SAV", &UploadOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_url_is_retried_then_reported() {
        let missing = || {
            Ok(UploadResponse {
                success: true,
                ..Default::default()
            })
        };
        let backend = ScriptedBackend::uploads(vec![missing(), missing(), missing()]);
        let client = FileTransferClient::new(backend.clone());

        let err = client
            .upload_single(&photo(), "SAV", &UploadOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::MalformedResponse(_)));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_link_success() {
        let backend = ScriptedBackend::links(vec![Ok(ShareLinkResponse::link("https://share/abc"))]);
        let client = FileTransferClient::new(backend.clone());

        let link = client.get_folder_share_link("SAV_F1_1").await.unwrap();

        assert_eq!(link, "https://share/abc");
        assert_eq!(backend.received.lock().unwrap()[0].1, "SAV_F1_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_link_failure_fallback_message() {
        let backend = ScriptedBackend::links(vec![Ok(ShareLinkResponse::default())]);
        let client = FileTransferClient::new(backend.clone());

        let err = client.get_folder_share_link("SAV").await.unwrap_err();

        assert_eq!(err, ApiError::LogicalFailure(SHARE_LINK_FAILED.to_string()));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_share_link_rate_limited_is_not_retried() {
        let backend = ScriptedBackend::links(vec![Err(ApiError::from_status(429, "Too Many Requests"))]);
        let client = FileTransferClient::new(backend.clone());

        let err = client.get_folder_share_link("SAV").await.unwrap_err();

        assert!(err.to_string().contains("429"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_applies() {
        let backend = ScriptedBackend::links(vec![
            Err(ApiError::network("down")),
            Err(ApiError::network("down")),
        ]);
        let client = FileTransferClient::with_retry_policy(backend.clone(), RetryPolicy::from_millis(2, 10));
        let start = Instant::now();

        assert!(client.get_folder_share_link("SAV").await.is_err());
        assert_eq!(backend.calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(10));
    }
}
