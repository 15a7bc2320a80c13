use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use sav_types::SourceFile;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{progress_percent, ProgressFn, ShareLinkResponse, StorageBackend, UploadResponse, WebhookBackend};
use crate::ApiError;

pub const API_KEY_HEADER: &str = "X-API-Key";

const UPLOAD_PATH: &str = "/api/upload-onedrive";
const SHARE_LINK_PATH: &str = "/api/folder-share-link";
const FOLDER_FIELD: &str = "savDossier";

/// Bytes handed to reqwest per body chunk; progress ticks once per chunk
const CHUNK_SIZE: usize = 64 * 1024;

/// Storage proxy reached over HTTP
pub struct HttpStorageBackend {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpStorageBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(base_url, api_key, client))
    }

    pub fn with_client(base_url: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

#[derive(Debug, Serialize)]
struct ShareLinkRequest<'a> {
    #[serde(rename = "savDossier")]
    folder: &'a str,
}

#[async_trait]
impl StorageBackend for HttpStorageBackend {
    async fn upload_file(
        &self,
        file: &SourceFile,
        folder: &str,
        progress: Option<ProgressFn>,
    ) -> Result<UploadResponse, ApiError> {
        let total = file.size() as u64;
        let part = Part::stream_with_length(progress_body(file.bytes.clone(), progress), total)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid mime type {}: {e}", file.mime_type)))?;
        let form = Form::new()
            .part("file", part)
            .text(FOLDER_FIELD, folder.to_string());

        let url = self.endpoint(UPLOAD_PATH);
        debug!(url = %url, file = %file.name, size = total, folder, "posting file");

        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    async fn folder_share_link(&self, folder: &str) -> Result<ShareLinkResponse, ApiError> {
        let url = self.endpoint(SHARE_LINK_PATH);
        debug!(url = %url, folder, "requesting share link");

        let response = self
            .authorize(self.client.post(&url))
            .json(&ShareLinkRequest { folder })
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }
}

/// Webhook reached over HTTP
pub struct HttpWebhookBackend {
    client: Client,
}

impl HttpWebhookBackend {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookBackend for HttpWebhookBackend {
    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value, ApiError> {
        debug!(url, "posting claim to webhook");

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(webhook_body(&body))
    }
}

/// Request body that reports progress as reqwest pulls chunks from it
fn progress_body(bytes: Vec<u8>, progress: Option<ProgressFn>) -> Body {
    Body::wrap_stream(progress_chunks(bytes, progress))
}

/// `bytes` in `CHUNK_SIZE` pieces, reporting the rounded share sent once per piece
fn progress_chunks(
    bytes: Vec<u8>,
    progress: Option<ProgressFn>,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
    let mut sent: u64 = 0;

    stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        if let (Some(report), Some(percent)) = (&progress, progress_percent(sent, total)) {
            report(percent);
        }
        Ok(chunk)
    })
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::MalformedResponse(format!("failed to parse response: {e}")))
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    warn!(status = status.as_u16(), body, "backend returned error status");
    ApiError::from_status(status.as_u16(), error_message(status, body))
}

/// Backend `error` or `message` field, else the raw body, else the reason phrase
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message).filter(|m| !m.is_empty()) {
            return message;
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

fn transport_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        return ApiError::from_status(status.as_u16(), error.to_string());
    }
    if error.is_timeout() {
        return ApiError::network(format!("request timed out: {error}"));
    }
    ApiError::network(format!("network error: {error}"))
}

/// JSON bodies verbatim; plain text acknowledgements as a JSON string
fn webhook_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
