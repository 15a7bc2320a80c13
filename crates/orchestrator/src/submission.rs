use chrono::{DateTime, Utc};
use sav_forms::{validate_form, ClaimFormStore};
use sav_telemetry::{ErrorContext, SubmissionId, SubmissionSpan};
use sav_types::{ClaimPayload, EncodedPayload, Invoice, UploadPayload};
use sav_upload::{ApiError, ParallelUploadCoordinator, UploadOptions, WebhookClient, WEBHOOK_URL_SETTING};
use serde_json::Value;
use std::ops::{Deref, DerefMut};
use tracing::{info, warn, Instrument};

use crate::payload::{build_claim_payload, StoredEvidence};
use crate::{claim_folder_name, SubmissionError, SubmissionStage};

/// One claim to submit, with its storage folder fixed up front.
///
/// Submitting the same `ClaimSubmission` again after a failure reuses the
/// folder, so photos stored by the first attempt stay next to the rest.
#[derive(Debug, Clone)]
pub struct ClaimSubmission {
    pub id: SubmissionId,
    pub invoice: Invoice,
    pub folder: String,
    pub report: Option<EncodedPayload>,
}

impl ClaimSubmission {
    pub fn with_report(mut self, report: EncodedPayload) -> Self {
        self.report = Some(report);
        self
    }
}

/// What a successful submission produced
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    pub folder: String,
    pub share_link: String,
    pub report_url: Option<String>,
    pub payload: ClaimPayload,
    /// Webhook response body, verbatim
    pub webhook_response: Value,
}

/// Drives a claim from filled forms to the webhook:
/// images, report, share link, then the claim document.
pub struct SubmissionOrchestrator {
    uploads: ParallelUploadCoordinator,
    webhook: WebhookClient,
    root_folder: String,
}

impl SubmissionOrchestrator {
    pub fn new(
        uploads: ParallelUploadCoordinator,
        webhook: WebhookClient,
        root_folder: impl Into<String>,
    ) -> Self {
        Self {
            uploads,
            webhook,
            root_folder: root_folder.into(),
        }
    }

    pub fn root_folder(&self) -> &str {
        &self.root_folder
    }

    /// Fix the submission id and storage folder for `invoice`
    pub fn prepare(&self, invoice: &Invoice) -> Result<ClaimSubmission, SubmissionError> {
        self.prepare_at(invoice, Utc::now())
    }

    pub fn prepare_at(
        &self,
        invoice: &Invoice,
        at: DateTime<Utc>,
    ) -> Result<ClaimSubmission, SubmissionError> {
        let reference = invoice.claim_reference();
        let folder = claim_folder_name(&self.root_folder, reference, at)
            .ok_or_else(|| SubmissionError::InvalidFolderName(reference.to_string()))?;

        Ok(ClaimSubmission {
            id: SubmissionId::new(),
            invoice: invoice.clone(),
            folder,
            report: None,
        })
    }

    /// Prepare and submit in one go
    pub async fn submit_invoice(
        &self,
        store: &mut ClaimFormStore,
        invoice: &Invoice,
        report: Option<EncodedPayload>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut submission = self.prepare(invoice)?;
        submission.report = report;
        self.submit(store, &submission).await
    }

    /// Submit every shown and filled form of `store`.
    ///
    /// The first fatal failure ends the submission. Photos that were stored
    /// keep their URL on the form and are skipped by the next attempt.
    /// Submitted forms are marked loading for the duration and released on
    /// every exit.
    pub async fn submit(
        &self,
        store: &mut ClaimFormStore,
        submission: &ClaimSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let span = SubmissionSpan {
            submission_id: submission.id,
            invoice_number: submission.invoice.invoice_number.clone(),
        };

        self.run(store, submission)
            .instrument(span.span())
            .await
            .with_submission_id(submission.id)
    }

    async fn run(
        &self,
        store: &mut ClaimFormStore,
        submission: &ClaimSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        // 1. Collect forms
        info!(stage = ?SubmissionStage::CollectingForms, folder = %submission.folder, "Collecting claim forms");
        let mut store = self.collect_forms(store, &submission.invoice)?;

        // 2. Upload images
        info!(stage = ?SubmissionStage::UploadingImages, "Uploading claim photos");
        self.upload_images(&mut store, &submission.folder).await?;

        // 3. Upload the report
        let report_url = match &submission.report {
            Some(report) => {
                info!(stage = ?SubmissionStage::UploadingReport, file = %report.filename, "Uploading claim report");
                let url = self
                    .uploads
                    .client()
                    .upload_single(
                        &UploadPayload::Encoded(report.clone()),
                        &submission.folder,
                        &UploadOptions::default(),
                    )
                    .await
                    .map_err(SubmissionError::ReportUpload)?;
                Some(url)
            }
            None => None,
        };

        // 4. Share link
        info!(stage = ?SubmissionStage::RequestingShareLink, "Requesting folder share link");
        let share_link = self
            .uploads
            .client()
            .get_folder_share_link(&submission.folder)
            .await
            .map_err(SubmissionError::ShareLink)?;

        // 5. Webhook
        let payload = build_claim_payload(
            &submission.id.to_string(),
            &submission.invoice,
            &store.filled_forms(),
            StoredEvidence {
                folder: &submission.folder,
                share_link: &share_link,
                report_url: report_url.as_deref(),
            },
            Utc::now(),
        )?;

        info!(
            stage = ?SubmissionStage::PostingWebhook,
            lines = payload.lines.len(),
            images = payload.image_count(),
            "Posting claim to webhook"
        );
        let webhook_response = self.webhook.submit(&payload).await.map_err(|e| match e {
            ApiError::Configuration(message) => SubmissionError::Configuration(message),
            other => SubmissionError::Webhook(other),
        })?;

        info!(folder = %submission.folder, "Claim submitted");

        Ok(SubmissionReceipt {
            submission_id: submission.id,
            folder: submission.folder.clone(),
            share_link,
            report_url,
            payload,
            webhook_response,
        })
    }

    /// Check preconditions and lock the filled forms.
    ///
    /// Nothing is sent to storage unless every filled form is valid and
    /// matches a line of `invoice`.
    fn collect_forms<'a>(
        &self,
        store: &'a mut ClaimFormStore,
        invoice: &Invoice,
    ) -> Result<LoadingGuard<'a>, SubmissionError> {
        if !self.webhook.is_configured() {
            return Err(SubmissionError::Configuration(format!(
                "webhook URL is not configured ({WEBHOOK_URL_SETTING})"
            )));
        }

        let unfinished: Vec<usize> = store
            .iter()
            .filter(|(_, form)| form.is_unfinished())
            .map(|(index, _)| index)
            .collect();
        if !unfinished.is_empty() {
            return Err(SubmissionError::UnfinishedForms {
                indices: unfinished,
            });
        }

        let indices = store.filled_indices();
        if indices.is_empty() {
            return Err(SubmissionError::NoFilledForms);
        }

        let mut guard = LoadingGuard::new(store);
        for index in indices {
            guard.acquire(index)?;
        }

        for &index in &guard.indices {
            let form = guard.store.get_form(index);
            if !validate_form(form) {
                warn!(index, fields = ?form.errors.invalid_fields(), "Filled form failed re-validation");
                form.filled = false;
                return Err(SubmissionError::InvalidForm { index });
            }
            if invoice.line_item(index).is_none() {
                warn!(index, lines = invoice.line_items.len(), "Filled form has no invoice line");
                return Err(SubmissionError::UnknownLine { index });
            }
        }

        Ok(guard)
    }

    /// Upload every photo of the filled forms that has no URL yet
    async fn upload_images(
        &self,
        store: &mut ClaimFormStore,
        folder: &str,
    ) -> Result<(), SubmissionError> {
        let (locations, payloads): (Vec<(usize, usize)>, Vec<UploadPayload>) = store
            .filled_forms()
            .iter()
            .flat_map(|filled| {
                filled
                    .form
                    .images
                    .iter()
                    .enumerate()
                    .filter(|(_, image)| !image.is_uploaded())
                    .map(move |(position, image)| {
                        ((filled.index, position), UploadPayload::Raw(image.file.clone()))
                    })
            })
            .unzip();

        if payloads.is_empty() {
            info!("No photo left to upload");
            return Ok(());
        }

        let outcomes = self.uploads.upload_all(&payloads, folder).await;

        let mut failed = 0;
        let mut first_error = None;
        for (&(index, position), outcome) in locations.iter().zip(&outcomes) {
            match outcome.url() {
                Some(url) => {
                    if let Some(image) = store.get_form(index).images.get_mut(position) {
                        image.uploaded_url = Some(url.to_string());
                    }
                }
                None => {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(format!(
                            "{}: {}",
                            outcome.file_name,
                            outcome.error_message().unwrap_or_default()
                        ));
                    }
                }
            }
        }

        match first_error {
            Some(first_error) => Err::<(), _>(SubmissionError::ImageUpload {
                failed,
                total: outcomes.len(),
                first_error,
            })
            .with_stage(SubmissionStage::UploadingImages.as_str()),
            None => Ok(()),
        }
    }
}

/// Exclusive access to the store while submitted forms are marked loading.
///
/// Dropping the guard clears the flag on every acquired form, including when
/// the submission future is dropped half way.
struct LoadingGuard<'a> {
    store: &'a mut ClaimFormStore,
    indices: Vec<usize>,
}

impl<'a> LoadingGuard<'a> {
    fn new(store: &'a mut ClaimFormStore) -> Self {
        Self {
            store,
            indices: Vec::new(),
        }
    }

    fn acquire(&mut self, index: usize) -> Result<(), SubmissionError> {
        if !self.store.begin_loading(index) {
            return Err(SubmissionError::FormBusy { index });
        }
        self.indices.push(index);
        Ok(())
    }
}

impl Deref for LoadingGuard<'_> {
    type Target = ClaimFormStore;

    fn deref(&self) -> &ClaimFormStore {
        self.store
    }
}

impl DerefMut for LoadingGuard<'_> {
    fn deref_mut(&mut self) -> &mut ClaimFormStore {
        self.store
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        for &index in &self.indices {
            self.store.end_loading(index);
        }
    }
}
