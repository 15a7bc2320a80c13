use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ImageAttachment;

/// Cause code of a claim line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimReason {
    /// Damaged product, photos required
    Abime,
    /// Broken product
    Casse,
    /// Missing product
    Manquant,
    /// Picking error
    Erreur,
}

impl ClaimReason {
    pub const ALL: [ClaimReason; 4] = [
        ClaimReason::Abime,
        ClaimReason::Casse,
        ClaimReason::Manquant,
        ClaimReason::Erreur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimReason::Abime => "abime",
            ClaimReason::Casse => "casse",
            ClaimReason::Manquant => "manquant",
            ClaimReason::Erreur => "erreur",
        }
    }

    /// Label used in claim summaries
    pub fn label(&self) -> &'static str {
        match self {
            ClaimReason::Abime => "ABIME",
            ClaimReason::Casse => "CASSE",
            ClaimReason::Manquant => "MANQUANT",
            ClaimReason::Erreur => "ERREUR DE PREPARATION",
        }
    }

    /// Whether a claim with this reason must carry at least one photo
    pub fn requires_photos(&self) -> bool {
        matches!(self, ClaimReason::Abime)
    }
}

impl fmt::Display for ClaimReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown claim reason: {0}")]
pub struct UnknownReason(pub String);

impl FromStr for ClaimReason {
    type Err = UnknownReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| UnknownReason(s.to_string()))
    }
}

/// Validatable fields of a claim form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Quantity,
    Unit,
    Reason,
    Images,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Quantity,
        FormField::Unit,
        FormField::Reason,
        FormField::Images,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Quantity => "quantity",
            FormField::Unit => "unit",
            FormField::Reason => "reason",
            FormField::Images => "images",
        }
    }
}

/// Last validation result of a form, one message per field.
///
/// An empty message means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    pub quantity: String,
    pub unit: String,
    pub reason: String,
    pub images: String,
}

impl FormErrors {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Quantity => &self.quantity,
            FormField::Unit => &self.unit,
            FormField::Reason => &self.reason,
            FormField::Images => &self.images,
        }
    }

    pub fn set(&mut self, field: FormField, message: impl Into<String>) {
        let slot = match field {
            FormField::Quantity => &mut self.quantity,
            FormField::Unit => &mut self.unit,
            FormField::Reason => &mut self.reason,
            FormField::Images => &mut self.images,
        };
        *slot = message.into();
    }

    pub fn is_empty(&self) -> bool {
        FormField::ALL.iter().all(|field| self.get(*field).is_empty())
    }

    /// Fields currently carrying an error message
    pub fn invalid_fields(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| !self.get(*field).is_empty())
            .collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Claim form attached to one invoice line item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimForm {
    /// Form is open for this item
    pub shown: bool,

    /// Form passed validation and is locked for submission
    pub filled: bool,

    /// Claimed quantity; `None` when the field was left empty
    pub quantity: Option<Decimal>,

    /// Unit of measure; empty when not selected
    pub unit: String,

    /// Cause code; `None` when not selected
    pub reason: Option<ClaimReason>,

    pub comment: String,

    pub images: Vec<ImageAttachment>,

    pub errors: FormErrors,

    /// Guards re-entrant validation and submission
    pub loading: bool,
}

impl ClaimForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the initial empty state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Open and filled, ready for submission
    pub fn is_submittable(&self) -> bool {
        self.shown && self.filled
    }

    /// Open but not yet validated
    pub fn is_unfinished(&self) -> bool {
        self.shown && !self.filled
    }

    /// A filled form must be re-opened before its fields change
    pub fn is_locked(&self) -> bool {
        self.filled
    }

    /// URLs of the attachments that were uploaded, in attachment order
    pub fn uploaded_urls(&self) -> Vec<String> {
        self.images
            .iter()
            .filter_map(|image| image.uploaded_url.clone())
            .collect()
    }
}
