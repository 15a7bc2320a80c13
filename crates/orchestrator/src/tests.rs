//! Submission flow tests against in-memory backends

mod submission_tests {
    use crate::{SubmissionError, SubmissionOrchestrator, SubmissionStage};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use sav_forms::{ClaimFormStore, ItemValidation};
    use sav_types::{
        ClaimReason, EncodedPayload, ImageAttachment, Invoice, LineItem, SourceFile,
    };
    use sav_upload::{
        ApiError, FileTransferClient, ParallelUploadCoordinator, ProgressFn, ShareLinkResponse,
        StorageBackend, UploadResponse, WebhookBackend, WebhookClient,
    };
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    const WEBHOOK_URL: &str = "https://hook.example/sav";

    /// Storage proxy that stores everything except the names it was told to refuse
    #[derive(Default)]
    struct MockStorage {
        refused: Mutex<HashSet<String>>,
        share_link: Mutex<Option<ApiError>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockStorage {
        fn refuse(&self, name: &str) {
            self.refused.lock().unwrap().insert(name.to_string());
        }

        fn accept_all(&self) {
            self.refused.lock().unwrap().clear();
        }

        fn fail_share_link(&self, error: ApiError) {
            *self.share_link.lock().unwrap() = Some(error);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn upload_calls(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| c.starts_with("upload:"))
                .collect()
        }
    }

    #[async_trait]
    impl StorageBackend for MockStorage {
        async fn upload_file(
            &self,
            file: &SourceFile,
            folder: &str,
            _progress: Option<ProgressFn>,
        ) -> Result<UploadResponse, ApiError> {
            self.calls.lock().unwrap().push(format!("upload:{}", file.name));
            if self.refused.lock().unwrap().contains(&file.name) {
                return Err(ApiError::from_status(413, "Payload Too Large"));
            }
            Ok(UploadResponse::stored(format!(
                "https://files.example/{folder}/{}",
                file.name
            )))
        }

        async fn folder_share_link(&self, folder: &str) -> Result<ShareLinkResponse, ApiError> {
            self.calls.lock().unwrap().push(format!("share:{folder}"));
            match self.share_link.lock().unwrap().clone() {
                Some(error) => Err(error),
                None => Ok(ShareLinkResponse::link(format!("https://share.example/{folder}"))),
            }
        }
    }

    #[derive(Default)]
    struct MockWebhook {
        posts: Mutex<Vec<Value>>,
        failures: Mutex<Vec<ApiError>>,
    }

    #[async_trait]
    impl WebhookBackend for MockWebhook {
        async fn post_json(&self, url: &str, payload: &Value) -> Result<Value, ApiError> {
            assert_eq!(url, WEBHOOK_URL);
            self.posts.lock().unwrap().push(payload.clone());
            if let Some(error) = self.failures.lock().unwrap().pop() {
                return Err(error);
            }
            Ok(json!({"status": "received"}))
        }
    }

    struct Harness {
        storage: Arc<MockStorage>,
        webhook: Arc<MockWebhook>,
        orchestrator: SubmissionOrchestrator,
    }

    fn harness_with_webhook(url: Option<&str>) -> Harness {
        let storage = Arc::new(MockStorage::default());
        let webhook = Arc::new(MockWebhook::default());
        let uploads = ParallelUploadCoordinator::new(FileTransferClient::new(storage.clone()));
        let webhook_client = WebhookClient::new(url.map(str::to_string), webhook.clone());

        Harness {
            storage,
            webhook,
            orchestrator: SubmissionOrchestrator::new(uploads, webhook_client, "SAV"),
        }
    }

    fn harness() -> Harness {
        harness_with_webhook(Some(WEBHOOK_URL))
    }

    fn invoice() -> Invoice {
        Invoice {
            invoice_number: "F2024-0042".to_string(),
            special_mention: Some("585_25S30_94_1".to_string()),
            line_items: vec![
                LineItem {
                    label: "Tomates grappe".to_string(),
                    quantity: Some(Decimal::from(10)),
                    unit: Some("kg".to_string()),
                    vat_rate: None,
                    amount: Some(Decimal::from(25)),
                },
                LineItem {
                    label: "Courgettes".to_string(),
                    quantity: Some(Decimal::from(5)),
                    unit: Some("kg".to_string()),
                    vat_rate: None,
                    amount: Some(Decimal::from(10)),
                },
            ],
            ..Default::default()
        }
    }

    fn photo(name: &str) -> ImageAttachment {
        ImageAttachment::new(
            SourceFile::new(name, "image/jpeg", vec![0xff, 0xd8]),
            "data:image/jpeg;base64,/9g=",
        )
    }

    fn fill(store: &mut ClaimFormStore, index: usize, reason: ClaimReason, photos: &[&str]) {
        store.open_form(index);
        let form = store.get_form(index);
        form.quantity = Some(Decimal::from(2));
        form.unit = "kg".to_string();
        form.reason = Some(reason);
        form.images = photos.iter().map(|name| photo(name)).collect();
        assert_eq!(store.validate_item(index), ItemValidation::Filled);
    }

    fn assert_released(store: &ClaimFormStore) {
        assert!(store.iter().all(|(_, form)| !form.loading));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_submission() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Abime, &["tomates.jpg"]);

        let receipt = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap();

        let image_url = format!("https://files.example/{}/tomates.jpg", receipt.folder);
        assert!(receipt.folder.starts_with("SAV_585_25S30_94_1_"));
        assert_eq!(
            receipt.share_link,
            format!("https://share.example/{}", receipt.folder)
        );
        assert_eq!(receipt.payload.lines.len(), 1);
        assert_eq!(receipt.payload.lines[0].image_urls, vec![image_url.clone()]);
        assert_eq!(receipt.webhook_response, json!({"status": "received"}));

        let posts = h.webhook.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["invoice_number"], "F2024-0042");
        assert_eq!(posts[0]["lines"][0]["image_urls"][0], image_url.as_str());
        assert_eq!(posts[0]["share_link"], receipt.share_link.as_str());

        let form = store.form(0).unwrap();
        assert_eq!(form.images[0].uploaded_url.as_deref(), Some(image_url.as_str()));
        assert!(form.filled);
        assert_released(&store);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_to_submit() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        store.get_form(0);

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SubmissionError::NoFilledForms);
        assert!(h.storage.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfinished_form_blocks_submission() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Casse, &[]);
        store.open_form(1);

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SubmissionError::UnfinishedForms { indices: vec![1] });
        assert_released(&store);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_webhook_fails_before_any_upload() {
        let h = harness_with_webhook(None);
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Abime, &["a.jpg"]);

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Configuration(ref m) if m.contains("webhook.url")));
        assert!(h.storage.calls().is_empty());
        assert!(h.webhook.posts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_image_failure_then_resubmit() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Abime, &["ok.jpg", "big.jpg"]);
        fill(&mut store, 1, ClaimReason::Casse, &["other.jpg"]);
        h.storage.refuse("big.jpg");

        let submission = h.orchestrator.prepare(&invoice()).unwrap();
        let err = h
            .orchestrator
            .submit(&mut store, &submission)
            .await
            .unwrap_err();

        match &err {
            SubmissionError::ImageUpload {
                failed,
                total,
                first_error,
            } => {
                assert_eq!(*failed, 1);
                assert_eq!(*total, 3);
                assert!(first_error.starts_with("big.jpg: "));
                assert!(first_error.contains("413"));
            }
            other => panic!("expected image upload failure, got {other:?}"),
        }
        assert_eq!(err.stage(), SubmissionStage::UploadingImages);
        assert!(store.form(0).unwrap().images[0].is_uploaded());
        assert!(!store.form(0).unwrap().images[1].is_uploaded());
        assert!(store.form(1).unwrap().images[0].is_uploaded());
        assert!(h.webhook.posts.lock().unwrap().is_empty());
        assert_released(&store);

        // second attempt only sends what is missing, into the same folder
        h.storage.accept_all();
        let before = h.storage.upload_calls().len();
        let receipt = h.orchestrator.submit(&mut store, &submission).await.unwrap();

        assert_eq!(h.storage.upload_calls()[before..], ["upload:big.jpg".to_string()]);
        assert_eq!(receipt.folder, submission.folder);
        assert_eq!(receipt.payload.image_count(), 3);
        assert_released(&store);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_share_link() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Abime, &["a.jpg"]);
        h.storage
            .fail_share_link(ApiError::from_status(429, "Too Many Requests"));

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), SubmissionStage::RequestingShareLink);
        assert!(err.to_string().contains("429"));
        let share_calls = h
            .storage
            .calls()
            .iter()
            .filter(|c| c.starts_with("share:"))
            .count();
        assert_eq!(share_calls, 1);
        assert!(h.webhook.posts.lock().unwrap().is_empty());
        assert_released(&store);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_uploaded_before_share_link() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Manquant, &[]);
        let report = EncodedPayload::new("UEsDBA==", "SAV_F2024-0042.xlsx");

        let receipt = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), Some(report))
            .await
            .unwrap();

        let calls = h.storage.calls();
        assert_eq!(calls[0], "upload:SAV_F2024-0042.xlsx");
        assert!(calls[1].starts_with("share:"));
        assert_eq!(
            receipt.report_url,
            Some(format!(
                "https://files.example/{}/SAV_F2024-0042.xlsx",
                receipt.folder
            ))
        );
        assert_eq!(receipt.payload.report_url, receipt.report_url);
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_changed_after_fill_is_rejected() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Abime, &["a.jpg"]);
        store.get_form(0).images.clear();

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SubmissionError::InvalidForm { index: 0 });
        let form = store.form(0).unwrap();
        assert!(!form.filled);
        assert!(!form.errors.images.is_empty());
        assert_released(&store);
        assert!(h.storage.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_without_invoice_line_uploads_nothing() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Casse, &[]);
        fill(&mut store, 5, ClaimReason::Abime, &["ghost.jpg"]);

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SubmissionError::UnknownLine { index: 5 });
        assert_eq!(err.stage(), SubmissionStage::CollectingForms);
        assert!(h.storage.calls().is_empty());
        assert!(h.webhook.posts.lock().unwrap().is_empty());
        assert!(!store.form(5).unwrap().images[0].is_uploaded());
        assert_released(&store);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_form_is_not_submitted() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Casse, &[]);
        fill(&mut store, 1, ClaimReason::Casse, &[]);
        assert!(store.begin_loading(1));

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SubmissionError::FormBusy { index: 1 });
        // form 0 was acquired then released; form 1 still belongs to its holder
        assert!(!store.form(0).unwrap().loading);
        assert!(store.form(1).unwrap().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_webhook_server_error_retried() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Erreur, &[]);
        h.webhook
            .failures
            .lock()
            .unwrap()
            .push(ApiError::from_status(502, "Bad Gateway"));

        let receipt = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap();

        assert_eq!(h.webhook.posts.lock().unwrap().len(), 2);
        assert_eq!(receipt.payload.lines[0].reason, ClaimReason::Erreur);
    }

    #[tokio::test(start_paused = true)]
    async fn test_webhook_client_error_surfaces() {
        let h = harness();
        let mut store = ClaimFormStore::new();
        fill(&mut store, 0, ClaimReason::Erreur, &[]);
        h.webhook
            .failures
            .lock()
            .unwrap()
            .push(ApiError::from_status(400, "Bad Request"));

        let err = h
            .orchestrator
            .submit_invoice(&mut store, &invoice(), None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), SubmissionStage::PostingWebhook);
        assert_eq!(err.api_error().and_then(ApiError::status), Some(400));
        assert_eq!(h.webhook.posts.lock().unwrap().len(), 1);
        assert_released(&store);
    }

    #[test]
    fn test_prepare_names_folder_from_reference() {
        let h = harness();
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let submission = h.orchestrator.prepare_at(&invoice(), at).unwrap();
        assert_eq!(submission.folder, "SAV_585_25S30_94_1_1700000000000");

        let plain = Invoice {
            invoice_number: "F/77".to_string(),
            ..Default::default()
        };
        let submission = h.orchestrator.prepare_at(&plain, at).unwrap();
        assert_eq!(submission.folder, "SAV_F_77_1700000000000");
        assert!(submission.report.is_none());
    }
}
