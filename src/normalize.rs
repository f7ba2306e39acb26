//! Mapping between the service's nested shape and the flat field set.
//!
//! [`normalize`] is a pure function: the same `ServiceFields` always yields
//! the same `ExtractedFields`, with every missing path replaced by the
//! literal `"N/A"`. The model path uses `None` for missing values instead;
//! the asymmetry is intentional and the comparator treats both as missing.
//!
//! [`update_payload`] is the inverse direction, used by the push-back
//! operation: it rebuilds the service's `{ "value": … }` wrapper shape from
//! a flat field set so corrected data can be written back in the form the
//! service expects.

use crate::compare::MISSING;
use crate::fields::{ExtractedFields, ServiceFields, ServiceParty, ValueBox};
use serde_json::{json, Value};

/// Flatten a service field set into the comparable shape.
///
/// Per-field source paths:
///
/// | field          | service path          |
/// |----------------|-----------------------|
/// | invoice_number | `invoiceNo.value`     |
/// | vendor_name    | `payee.name.value`    |
/// | vendor_address | `payee.{streetName, buildingNo, postalCode, city}` joined with `", "` |
/// | client_name    | `payer.name.value`    |
/// | client_address | `payer.{…}` as above  |
/// | invoice_date   | `dates.issue.value`   |
/// | due_date       | `dates.due.value`     |
/// | total_amount   | `amounts.gross.value` |
/// | currency       | `currency.value`      |
/// | tax_amount     | `amounts.vat.value`   |
/// | net_amount     | `amounts.net.value`   |
///
/// Any absent link in a path yields `"N/A"`. Line items are not part of the
/// service shape, so `items` is always empty here.
pub fn normalize(service: &ServiceFields) -> ExtractedFields {
    ExtractedFields {
        invoice_number: Some(boxed_text(&service.invoice_no)),
        vendor_name: Some(boxed_text(
            &service.payee.as_ref().and_then(|p| p.name.clone()),
        )),
        vendor_address: Some(party_address(service.payee.as_ref())),
        client_name: Some(boxed_text(
            &service.payer.as_ref().and_then(|p| p.name.clone()),
        )),
        client_address: Some(party_address(service.payer.as_ref())),
        invoice_date: Some(boxed_text(
            &service.dates.as_ref().and_then(|d| d.issue.clone()),
        )),
        due_date: Some(boxed_text(
            &service.dates.as_ref().and_then(|d| d.due.clone()),
        )),
        total_amount: Some(boxed_text(
            &service.amounts.as_ref().and_then(|a| a.gross.clone()),
        )),
        currency: Some(boxed_text(&service.currency)),
        tax_amount: Some(boxed_text(
            &service.amounts.as_ref().and_then(|a| a.vat.clone()),
        )),
        net_amount: Some(boxed_text(
            &service.amounts.as_ref().and_then(|a| a.net.clone()),
        )),
        items: Vec::new(),
    }
}

/// Unwrap a `ValueBox`, treating null and empty as missing.
fn boxed_text(boxed: &Option<ValueBox>) -> String {
    boxed
        .as_ref()
        .and_then(ValueBox::text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Join the non-empty address parts of a party with `", "`.
///
/// An absent party, or a party with no address parts at all, is `"N/A"`.
fn party_address(party: Option<&ServiceParty>) -> String {
    let Some(party) = party else {
        return MISSING.to_string();
    };
    let parts: Vec<String> = [
        &party.street_name,
        &party.building_no,
        &party.postal_code,
        &party.city,
    ]
    .into_iter()
    .filter_map(|b| b.as_ref().and_then(ValueBox::text))
    .filter(|s| !s.is_empty())
    .collect();

    if parts.is_empty() {
        MISSING.to_string()
    } else {
        parts.join(", ")
    }
}

/// Build the sparse update body for the push-back call.
///
/// The service expects its own nested wrapper shape on writes. Present
/// values become `{ "value": … }`; missing ones become empty objects, which
/// the service treats as "leave unchanged". The due date falls back to the
/// invoice date when the model found none, matching how the service
/// pre-fills payment terms.
pub fn update_payload(fields: &ExtractedFields) -> Value {
    let wrap = |value: &Option<String>| -> Value {
        match value.as_deref().filter(|s| !s.is_empty() && *s != MISSING) {
            Some(v) => json!({ "value": v }),
            None => json!({}),
        }
    };

    let due = fields
        .due_date
        .clone()
        .filter(|s| !s.is_empty() && s != MISSING)
        .or_else(|| fields.invoice_date.clone());

    json!({
        "invoiceNo": wrap(&fields.invoice_number),
        "dates": {
            "issue": wrap(&fields.invoice_date),
            "due": wrap(&due),
        },
        "payee": { "name": wrap(&fields.vendor_name) },
        "payer": { "name": wrap(&fields.client_name) },
        "amounts": {
            "gross": wrap(&fields.total_amount),
            "net": wrap(&fields.net_amount),
            "vat": wrap(&fields.tax_amount),
        },
        "currency": wrap(&fields.currency),
    })
}
