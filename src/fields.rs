//! The two shapes invoice data arrives in, and the fixed field set that
//! makes them comparable.
//!
//! The document service returns a *nested* structure where every logical
//! field sits inside an optional wrapper object carrying a `value`
//! (`payee.name.value`, `amounts.gross.value`, …). The vision model returns
//! a *flat* JSON object keyed by snake_case field names. [`ServiceFields`]
//! models the former as an explicit schema with optional sub-objects;
//! [`ExtractedFields`] models the latter. The normalizer
//! ([`crate::normalize`]) maps the nested shape onto the flat one, and that
//! structural symmetry is what makes field-by-field comparison possible.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Tracked fields ───────────────────────────────────────────────────────

/// One of the eleven tracked invoice fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    InvoiceNumber,
    VendorName,
    VendorAddress,
    ClientName,
    ClientAddress,
    InvoiceDate,
    DueDate,
    TotalAmount,
    Currency,
    TaxAmount,
    NetAmount,
}

/// The fixed presentation order of the tracked fields.
///
/// Every [`crate::compare::ComparisonReport`] enumerates exactly these
/// fields in exactly this order, regardless of which values matched or were
/// missing.
pub const FIELD_ORDER: [FieldKind; 11] = [
    FieldKind::InvoiceNumber,
    FieldKind::VendorName,
    FieldKind::VendorAddress,
    FieldKind::ClientName,
    FieldKind::ClientAddress,
    FieldKind::InvoiceDate,
    FieldKind::DueDate,
    FieldKind::TotalAmount,
    FieldKind::Currency,
    FieldKind::TaxAmount,
    FieldKind::NetAmount,
];

impl FieldKind {
    /// The snake_case wire name, as requested from the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::InvoiceNumber => "invoice_number",
            FieldKind::VendorName => "vendor_name",
            FieldKind::VendorAddress => "vendor_address",
            FieldKind::ClientName => "client_name",
            FieldKind::ClientAddress => "client_address",
            FieldKind::InvoiceDate => "invoice_date",
            FieldKind::DueDate => "due_date",
            FieldKind::TotalAmount => "total_amount",
            FieldKind::Currency => "currency",
            FieldKind::TaxAmount => "tax_amount",
            FieldKind::NetAmount => "net_amount",
        }
    }

    /// Human-readable label for table output.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::InvoiceNumber => "Invoice number",
            FieldKind::VendorName => "Vendor name",
            FieldKind::VendorAddress => "Vendor address",
            FieldKind::ClientName => "Client name",
            FieldKind::ClientAddress => "Client address",
            FieldKind::InvoiceDate => "Invoice date",
            FieldKind::DueDate => "Due date",
            FieldKind::TotalAmount => "Total amount",
            FieldKind::Currency => "Currency",
            FieldKind::TaxAmount => "Tax amount",
            FieldKind::NetAmount => "Net amount",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Flat field set ───────────────────────────────────────────────────────

/// The flat field set both extraction paths produce.
///
/// Always carries all eleven fields — a missing value is `None` (the model
/// path) or the literal `"N/A"` (the normalizer path), never an absent key.
/// Amount fields tolerate numeric JSON values because vision models return
/// `123.45` as often as `"123.45"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedFields {
    #[serde(deserialize_with = "de_text")]
    pub invoice_number: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub vendor_name: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub vendor_address: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub client_name: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub client_address: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub invoice_date: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub due_date: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub total_amount: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub tax_amount: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub net_amount: Option<String>,
    pub items: Vec<LineItem>,
}

impl ExtractedFields {
    /// Look up one tracked field.
    pub fn get(&self, field: FieldKind) -> Option<&str> {
        let value = match field {
            FieldKind::InvoiceNumber => &self.invoice_number,
            FieldKind::VendorName => &self.vendor_name,
            FieldKind::VendorAddress => &self.vendor_address,
            FieldKind::ClientName => &self.client_name,
            FieldKind::ClientAddress => &self.client_address,
            FieldKind::InvoiceDate => &self.invoice_date,
            FieldKind::DueDate => &self.due_date,
            FieldKind::TotalAmount => &self.total_amount,
            FieldKind::Currency => &self.currency,
            FieldKind::TaxAmount => &self.tax_amount,
            FieldKind::NetAmount => &self.net_amount,
        };
        value.as_deref()
    }

    /// Set one tracked field.
    pub fn set(&mut self, field: FieldKind, value: impl Into<String>) {
        let slot = match field {
            FieldKind::InvoiceNumber => &mut self.invoice_number,
            FieldKind::VendorName => &mut self.vendor_name,
            FieldKind::VendorAddress => &mut self.vendor_address,
            FieldKind::ClientName => &mut self.client_name,
            FieldKind::ClientAddress => &mut self.client_address,
            FieldKind::InvoiceDate => &mut self.invoice_date,
            FieldKind::DueDate => &mut self.due_date,
            FieldKind::TotalAmount => &mut self.total_amount,
            FieldKind::Currency => &mut self.currency,
            FieldKind::TaxAmount => &mut self.tax_amount,
            FieldKind::NetAmount => &mut self.net_amount,
        };
        *slot = Some(value.into());
    }
}

/// One invoice line item as returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(deserialize_with = "de_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub quantity: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub unit_price: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub total: Option<String>,
}

/// Accept a string, a number, or null where a textual value is expected.
fn de_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_text))
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── Nested service schema ────────────────────────────────────────────────

/// A service-side field wrapper: `{ "value": … }`.
///
/// The `value` may be a string or a number depending on the field; `text()`
/// renders either as text so downstream code sees one representation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueBox {
    #[serde(default)]
    pub value: Option<Value>,
}

impl ValueBox {
    /// The wrapped value as text; `None` for null or non-scalar payloads.
    pub fn text(&self) -> Option<String> {
        self.value.clone().and_then(value_text)
    }
}

/// The service's nested invoice field structure.
///
/// Every sub-object is optional: the service omits whole sections when its
/// OCR produced nothing for them, and normalization must survive any subset
/// being absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceFields {
    pub invoice_no: Option<ValueBox>,
    pub payee: Option<ServiceParty>,
    pub payer: Option<ServiceParty>,
    pub dates: Option<ServiceDates>,
    pub amounts: Option<ServiceAmounts>,
    pub currency: Option<ValueBox>,
}

/// One party (vendor = payee, client = payer) on the service side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceParty {
    pub name: Option<ValueBox>,
    pub street_name: Option<ValueBox>,
    pub building_no: Option<ValueBox>,
    pub postal_code: Option<ValueBox>,
    pub city: Option<ValueBox>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceDates {
    pub issue: Option<ValueBox>,
    pub due: Option<ValueBox>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceAmounts {
    pub gross: Option<ValueBox>,
    pub net: Option<ValueBox>,
    pub vat: Option<ValueBox>,
}
