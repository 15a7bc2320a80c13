use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ClaimReason, Customer};

/// Final claim document posted to the automation webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimPayload {
    pub version: String,

    /// Correlation id of the submission
    pub submission_id: String,

    pub invoice_number: String,

    pub invoice_date: Option<String>,

    pub special_mention: Option<String>,

    pub order_number: Option<String>,

    pub customer: Customer,

    /// Storage folder holding the claim evidence
    pub folder: String,

    /// Read-only link to `folder`
    pub share_link: String,

    /// Stored claim report, when one was generated
    pub report_url: Option<String>,

    pub lines: Vec<ClaimLine>,

    pub submitted_at: DateTime<Utc>,
}

impl ClaimPayload {
    pub fn image_count(&self) -> usize {
        self.lines.iter().map(|line| line.image_urls.len()).sum()
    }
}

/// One claimed invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimLine {
    /// Index of the line item on the invoice
    pub index: usize,

    pub label: String,

    pub invoiced_quantity: Option<Decimal>,

    pub invoiced_unit: Option<String>,

    pub unit_price: Option<Decimal>,

    pub quantity: Decimal,

    pub unit: String,

    pub reason: ClaimReason,

    pub reason_label: String,

    pub comment: String,

    pub image_urls: Vec<String>,
}
