use futures::future::join_all;
use sav_types::{UploadOutcome, UploadPayload};
use tracing::{error, info};

use crate::{FileTransferClient, UploadOptions};

/// Uploads a batch of files concurrently into one folder.
///
/// Every file settles on its own: a failure never cancels its siblings,
/// and outcomes come back in input order.
#[derive(Clone)]
pub struct ParallelUploadCoordinator {
    client: FileTransferClient,
}

impl ParallelUploadCoordinator {
    pub fn new(client: FileTransferClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FileTransferClient {
        &self.client
    }

    pub async fn upload_all(&self, payloads: &[UploadPayload], folder: &str) -> Vec<UploadOutcome> {
        if payloads.is_empty() {
            return Vec::new();
        }

        let options = UploadOptions::default();
        let uploads = payloads.iter().map(|payload| {
            let options = &options;
            async move {
                let file_name = payload.file_name().to_string();
                match self.client.upload_single(payload, folder, options).await {
                    Ok(url) => UploadOutcome::success(file_name, url),
                    Err(e) => {
                        error!(file = %file_name, folder, error = %e, "file upload failed");
                        UploadOutcome::failure(file_name, e.to_string())
                    }
                }
            }
        });

        let outcomes = join_all(uploads).await;

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        info!(folder, total = outcomes.len(), failed, "upload batch settled");
        outcomes
    }
}
