//! The two extraction pipelines and their shared plumbing.
//!
//! A comparison run drives two independent paths to the same flat field set:
//!
//! ```text
//!   service path:  GET fields ──────────────────────────► normalize
//!
//!   model path:    request render ─ poll ─ download
//!                        │
//!                        ▼
//!                  rasterise first page (PDF) or pass through (image)
//!                        │
//!                        ▼
//!                  PNG encode ─► base64 data URI ─► chat/completions
//!                        │
//!                        ▼
//!                  fence-strip ─► parse JSON fields
//! ```
//!
//! [`service`] owns everything that talks to the document service, including
//! the three-phase render protocol. [`vision`] owns the model call and
//! composes [`render`], [`encode`] and [`fence`] for its input and output
//! handling.

pub mod encode;
pub mod fence;
pub mod render;
pub mod service;
pub mod vision;
