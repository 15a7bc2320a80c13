//! SAV claim submission pipeline
//!
//! Wires the workspace crates together: claim forms, photo intake, uploads to
//! the storage proxy with retry, folder share links and the webhook post.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use sav_claims::{init_logging, ClaimFormStore, ConfigLoader, Invoice, SavClient};
//!
//! let config = ConfigLoader::from_file_with_env(
//!     std::path::Path::new("config/default.toml"),
//!     sav_claims::ENV_PREFIX,
//! )?;
//! init_logging(&config)?;
//!
//! let client = SavClient::from_config(&config)?;
//! let mut store = ClaimFormStore::new();
//! let invoice = Invoice::default();
//! // ... fill forms from the wizard ...
//! let receipt = client.submit(&mut store, &invoice, None).await?;
//! println!("claim stored in {}", receipt.folder);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub use sav_config::{validate_config, AppConfig, ConfigError, ConfigLoader, ENV_PREFIX};
pub use sav_forms::{
    AttachmentError, AttachmentPolicy, ClaimFormStore, FilledForm, ItemValidation,
};
pub use sav_orchestrator::{
    ClaimSubmission, SubmissionError, SubmissionOrchestrator, SubmissionReceipt, SubmissionStage,
};
pub use sav_retry::{RetryExecutor, RetryPolicy, Retryable};
pub use sav_telemetry::{LogFormat, SubmissionId, TelemetryError};
pub use sav_types::{
    ClaimForm, ClaimPayload, ClaimReason, EncodedPayload, ImageAttachment, Invoice, LineItem,
    SourceFile, UploadOutcome, UploadPayload,
};
pub use sav_upload::{
    ApiError, FileTransferClient, HttpStorageBackend, HttpWebhookBackend,
    ParallelUploadCoordinator, StorageBackend, WebhookBackend, WebhookClient,
};

/// Failure to build a client from configuration
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Install the global subscriber from the `[logging]` section
pub fn init_logging(config: &AppConfig) -> Result<(), TelemetryError> {
    sav_telemetry::init_tracing(&config.logging.level, config.logging.format())
}

/// Entry point of the pipeline: photo intake rules plus the submission flow
pub struct SavClient {
    attachments: AttachmentPolicy,
    orchestrator: SubmissionOrchestrator,
}

impl SavClient {
    /// Validate `config` and talk to the configured endpoints over HTTP
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        validate_config(config)?;

        let storage = HttpStorageBackend::new(
            config.api.base_url.clone(),
            config.api.api_key.clone(),
            config.api.timeout(),
        )?;
        let webhook = HttpWebhookBackend::new(config.api.timeout())?;

        info!(
            base_url = %storage.base_url(),
            webhook = config.webhook.url.is_some(),
            max_attempts = config.retry.max_attempts,
            "SAV client configured"
        );

        Ok(Self::with_backends(config, Arc::new(storage), Arc::new(webhook)))
    }

    /// Build on caller supplied backends; `config` is not validated
    pub fn with_backends(
        config: &AppConfig,
        storage: Arc<dyn StorageBackend>,
        webhook: Arc<dyn WebhookBackend>,
    ) -> Self {
        let policy = config.retry.policy();
        let uploads = ParallelUploadCoordinator::new(FileTransferClient::with_retry_policy(
            storage,
            policy,
        ));
        let webhook = WebhookClient::with_retry_policy(config.webhook.url.clone(), webhook, policy);

        Self {
            attachments: config.attachments.policy(),
            orchestrator: SubmissionOrchestrator::new(
                uploads,
                webhook,
                config.storage.root_folder.clone(),
            ),
        }
    }

    pub fn attachment_policy(&self) -> &AttachmentPolicy {
        &self.attachments
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.orchestrator
    }

    /// Attach photos to the form of line `index`, prefixed with the invoice reference
    pub fn attach_photos(
        &self,
        store: &mut ClaimFormStore,
        invoice: &Invoice,
        index: usize,
        files: Vec<SourceFile>,
    ) -> Result<usize, AttachmentError> {
        self.attachments
            .attach(store.get_form(index), files, Some(invoice.claim_reference()))
    }

    /// Submit every filled form of `store` against `invoice`
    pub async fn submit(
        &self,
        store: &mut ClaimFormStore,
        invoice: &Invoice,
        report: Option<EncodedPayload>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.orchestrator.submit_invoice(store, invoice, report).await
    }
}
