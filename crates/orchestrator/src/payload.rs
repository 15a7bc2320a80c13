use chrono::{DateTime, Utc};
use sav_forms::FilledForm;
use sav_types::{ClaimLine, ClaimPayload, Invoice, PAYLOAD_VERSION};

use crate::SubmissionError;

/// Where the claim evidence was stored
#[derive(Debug, Clone, Copy)]
pub struct StoredEvidence<'a> {
    pub folder: &'a str,
    pub share_link: &'a str,
    pub report_url: Option<&'a str>,
}

/// Assemble the webhook document from the invoice and the filled forms.
///
/// Each line carries the URLs of the photos uploaded for it, in attachment order.
pub fn build_claim_payload(
    submission_id: &str,
    invoice: &Invoice,
    forms: &[FilledForm<'_>],
    evidence: StoredEvidence<'_>,
    submitted_at: DateTime<Utc>,
) -> Result<ClaimPayload, SubmissionError> {
    let lines = forms
        .iter()
        .map(|filled| claim_line(invoice, filled))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClaimPayload {
        version: PAYLOAD_VERSION.to_string(),
        submission_id: submission_id.to_string(),
        invoice_number: invoice.invoice_number.clone(),
        invoice_date: invoice.date.clone(),
        special_mention: invoice.special_mention.clone(),
        order_number: invoice.order_number().map(str::to_string),
        customer: invoice.customer.clone(),
        folder: evidence.folder.to_string(),
        share_link: evidence.share_link.to_string(),
        report_url: evidence.report_url.map(str::to_string),
        lines,
        submitted_at,
    })
}

fn claim_line(invoice: &Invoice, filled: &FilledForm<'_>) -> Result<ClaimLine, SubmissionError> {
    let index = filled.index;
    let form = filled.form;
    let item = invoice
        .line_item(index)
        .ok_or(SubmissionError::UnknownLine { index })?;
    // a filled form always passed validation
    let (quantity, reason) = match (form.quantity, form.reason) {
        (Some(quantity), Some(reason)) => (quantity, reason),
        _ => return Err(SubmissionError::InvalidForm { index }),
    };

    Ok(ClaimLine {
        index,
        label: item.label.clone(),
        invoiced_quantity: item.quantity,
        invoiced_unit: item.unit.clone(),
        unit_price: item.unit_price(),
        quantity,
        unit: form.unit.clone(),
        reason,
        reason_label: reason.label().to_string(),
        comment: form.comment.clone(),
        image_urls: form.uploaded_urls(),
    })
}
