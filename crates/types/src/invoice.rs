use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Invoice the claim is made against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub paid: bool,

    /// Order reference printed on the invoice (e.g. "585_25S30_94_1")
    #[serde(default)]
    pub special_mention: Option<String>,

    #[serde(default)]
    pub customer: Customer,

    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Invoice {
    /// Special mention without its trailing delivery counter
    pub fn order_number(&self) -> Option<&str> {
        let mention = self.special_mention.as_deref().filter(|m| !m.is_empty())?;
        Some(match mention.rfind('_') {
            Some(idx) => &mention[..idx],
            None => mention,
        })
    }

    /// Reference used to name the claim folder and prefix photos
    pub fn claim_reference(&self) -> &str {
        self.special_mention
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.invoice_number)
    }

    pub fn line_item(&self, index: usize) -> Option<&LineItem> {
        self.line_items.get(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub source_id: Option<String>,

    #[serde(default)]
    pub emails: Vec<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub delivery_address: Option<Address>,

    #[serde(default)]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country_alpha2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,

    #[serde(default)]
    pub quantity: Option<Decimal>,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub vat_rate: Option<Decimal>,

    /// Line total, tax excluded
    #[serde(default)]
    pub amount: Option<Decimal>,
}

impl LineItem {
    pub fn unit_price(&self) -> Option<Decimal> {
        match (self.amount, self.quantity) {
            (Some(amount), Some(quantity)) if !quantity.is_zero() => Some(amount / quantity),
            _ => None,
        }
    }
}
