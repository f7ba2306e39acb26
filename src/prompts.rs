//! The fixed extraction instruction sent to the vision model.
//!
//! Centralising the prompt serves two purposes:
//!
//! 1. **Single source of truth** — the requested field names must stay in
//!    lock-step with [`crate::fields::FieldKind`]; one place to edit keeps
//!    them from drifting apart.
//!
//! 2. **Testability** — unit tests can assert every tracked field name
//!    appears in the instruction without spinning up a real model.

/// Extraction instruction for one invoice image.
///
/// Requests exactly the tracked field set plus the line-items array, and
/// pins down the missing-value convention: null, never an omitted key. The
/// model is asked for bare JSON; fenced replies are still tolerated by
/// [`crate::pipeline::fence`].
pub const EXTRACTION_PROMPT: &str = "\
Please extract all invoice data from this image/document. Return the data in JSON format with the following fields:
- invoice_number
- vendor_name
- vendor_address
- client_name
- client_address
- invoice_date
- due_date
- total_amount
- currency
- tax_amount
- net_amount
- items (array of line items with description, quantity, unit_price, total)

If any field is not found, use null — never omit the key. Be as accurate as possible. Return only the JSON object, without commentary.";
