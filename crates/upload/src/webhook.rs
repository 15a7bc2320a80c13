use sav_retry::{RetryExecutor, RetryPolicy};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::{ApiError, WebhookBackend};

/// Setting that holds the webhook endpoint
pub const WEBHOOK_URL_SETTING: &str = "webhook.url";

/// Delivers the finished claim document to the automation webhook
#[derive(Clone)]
pub struct WebhookClient {
    url: Option<String>,
    backend: Arc<dyn WebhookBackend>,
    executor: RetryExecutor,
}

impl WebhookClient {
    pub fn new(url: Option<String>, backend: Arc<dyn WebhookBackend>) -> Self {
        Self::with_retry_policy(url, backend, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        url: Option<String>,
        backend: Arc<dyn WebhookBackend>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            backend,
            executor: RetryExecutor::new(policy),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// POST `payload` as JSON and return the response body.
    ///
    /// Fails with `ApiError::Configuration`, without any request, when no URL is set.
    pub async fn submit<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Value, ApiError> {
        let url = self.url.as_deref().ok_or_else(|| {
            ApiError::Configuration(format!("webhook URL is not configured ({WEBHOOK_URL_SETTING})"))
        })?;
        let body = serde_json::to_value(payload)
            .map_err(|e| ApiError::InvalidRequest(format!("failed to serialize claim: {e}")))?;

        let response = self
            .executor
            .run(|| self.backend.post_json(url, &body))
            .await?;

        info!("claim delivered to webhook");
        Ok(response)
    }
}
