//! # invoice-crosscheck
//!
//! Cross-checks a document service's OCR invoice extraction against an
//! independent vision-model extraction of the same document, field by field.
//!
//! ```text
//!   document id
//!        │
//!        ├──► service OCR fields ──► normalize ─┐
//!        │                                      ├──► compare ──► report
//!        └──► render ► rasterise ► model ───────┘
//!                                      │
//!                          (optional) PATCH corrections back
//! ```
//!
//! The service's nested field structure and the model's flat JSON reply are
//! both flattened into the same eleven-field shape, then compared with a
//! format-insensitive matcher that tolerates date-format and number-format
//! disagreements without doing arithmetic.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use invoice_crosscheck::{ComparisonEngine, EngineConfig, MemoryCredentials};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), invoice_crosscheck::CrossCheckError> {
//! let engine = ComparisonEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(MemoryCredentials::from_env()),
//! )?;
//!
//! if let Some(outcome) = engine.run("invoice-id").await? {
//!     for row in &outcome.report.rows {
//!         println!("{}: {}", row.field, if row.matched { "match" } else { "MISMATCH" });
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod fields;
pub mod normalize;
pub mod pipeline;
pub mod prompts;

pub use compare::{compare_fields, values_match, ComparisonReport, ComparisonRow, MISSING};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use credentials::{CredentialStore, MemoryCredentials, MODEL_API_KEY, SERVICE_API_KEY};
pub use engine::{ComparisonEngine, ComparisonOutcome};
pub use error::CrossCheckError;
pub use fields::{ExtractedFields, FieldKind, LineItem, ServiceFields, FIELD_ORDER};
pub use normalize::{normalize, update_payload};
