//! Format-insensitive field comparison.
//!
//! The two extraction paths disagree constantly on formatting while agreeing
//! on substance: the service reports dates as `DD.MM.YYYY` where the model
//! emits ISO `YYYY-MM-DD`, and amounts differ in decimal separators and
//! currency symbols. [`values_match`] canonicalizes both sides just enough
//! to let those two discrepancy sources converge, and no further.
//!
//! The comparison is intentionally textual, not numeric: `"100.00"` and
//! `"100"` do not match. Doing arithmetic on OCR output would hide real
//! discrepancies behind false equality.

use crate::fields::{ExtractedFields, FieldKind, FIELD_ORDER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentinel for a missing value. Missing never matches anything, including
/// another missing value.
pub const MISSING: &str = "N/A";

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// `DD.MM.YYYY` — the service's locale date format.
static RE_DOTTED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").unwrap());

/// Decide whether two field values should be considered equal.
///
/// Rules, in order:
/// 1. Either side is the missing sentinel → no match. This is checked before
///    literal equality so `N/A` never self-matches.
/// 2. Exact equality → match.
/// 3. Otherwise compare the canonicalized forms (see [`canonical`]).
pub fn values_match(a: &str, b: &str) -> bool {
    if a == MISSING || b == MISSING {
        return false;
    }
    if a == b {
        return true;
    }
    canonical(a) == canonical(b)
}

/// Canonicalize one value for comparison.
///
/// Lowercase, trim, collapse whitespace runs; rewrite a `DD.MM.YYYY` date to
/// ISO `YYYY-MM-DD` so both date formats meet in one form (ISO input needs
/// no rewrite); strip everything that is not a digit, `.` or `,`; fold `,`
/// into `.`. After stripping, both date forms reduce to the same digit run.
fn canonical(value: &str) -> String {
    let lowered = value.to_lowercase();
    let collapsed = RE_WHITESPACE.replace_all(lowered.trim(), " ");

    let dated = RE_DOTTED_DATE.replace(&collapsed, "$3-$2-$1");

    dated
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

// ── Comparison report ────────────────────────────────────────────────────

/// One field with its two values and the match verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub field: FieldKind,
    /// The service-side value (missing = `"N/A"`).
    pub service_value: String,
    /// The model-side value (missing rendered as `"N/A"`).
    pub model_value: String,
    pub matched: bool,
}

/// The ordered, complete comparison of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// One row per tracked field, in [`FIELD_ORDER`].
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonReport {
    /// Number of rows where both sides matched.
    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|r| r.matched).count()
    }

    /// True when every tracked field matched.
    pub fn is_full_match(&self) -> bool {
        self.rows.iter().all(|r| r.matched)
    }
}

/// Compare two flat field sets field by field.
///
/// Always produces all eleven rows in the fixed order. Empty strings and
/// `None` both render as the missing sentinel, so a report is well-formed
/// even when one side found nothing at all.
pub fn compare_fields(service: &ExtractedFields, model: &ExtractedFields) -> ComparisonReport {
    let rows = FIELD_ORDER
        .iter()
        .map(|&field| {
            let service_value = present_or_missing(service.get(field));
            let model_value = present_or_missing(model.get(field));
            let matched = values_match(&service_value, &model_value);
            ComparisonRow {
                field,
                service_value,
                model_value,
                matched,
            }
        })
        .collect();

    ComparisonReport { rows }
}

fn present_or_missing(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => MISSING.to_string(),
    }
}
