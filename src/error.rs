//! Error types for the invoice-crosscheck library.
//!
//! Every failure in a comparison run is terminal for that run — nothing here
//! is retried automatically. The one deliberate exception is the render-status
//! poll, which retries on a *still-pending* status only; an HTTP or transport
//! failure during polling surfaces as [`CrossCheckError::RenderStatus`]
//! immediately.
//!
//! The variants mirror the three call surfaces a run touches:
//!
//! * the document service (auth, lookup, decode),
//! * the render pipeline (request → poll → download),
//! * the vision model API (auth, rate limit, response parsing).
//!
//! Keeping them in one enum lets callers render any failure as a single
//! human-readable status string without losing the ability to match on the
//! specific failure mode in tests.

use thiserror::Error;

/// All errors returned by the invoice-crosscheck library.
#[derive(Debug, Error)]
pub enum CrossCheckError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// A required credential is absent from the store (reads as empty).
    #[error("Credential '{name}' is not configured.\nStore it before starting a comparison run.")]
    MissingCredential { name: &'static str },

    // ── Document-service errors ───────────────────────────────────────────
    /// The service rejected the API key (HTTP 401).
    #[error("Invalid document-service API key (HTTP 401). Check the stored credential.")]
    Auth,

    /// The document id does not exist on the service (HTTP 404).
    #[error("Document '{id}' not found on the service (HTTP 404).")]
    NotFound { id: String },

    /// Any other non-2xx response from the document service.
    #[error("Document service error (HTTP {status}): {body}")]
    Service { status: u16, body: String },

    /// The service returned a 2xx response whose body is not valid field data.
    #[error("Document service returned a body that is not valid invoice data: {detail}")]
    Decode { detail: String },

    // ── Render-pipeline errors ────────────────────────────────────────────
    /// The render-request call failed (HTTP non-2xx on the printout request).
    #[error("Failed to request a document render (HTTP {status}): {body}")]
    RenderRequest { status: u16, body: String },

    /// A status poll failed at the HTTP level (never retried).
    #[error("Failed to check render status (HTTP {status}): {body}")]
    RenderStatus { status: u16, body: String },

    /// The service reported the render job as failed.
    #[error("Document render failed on the service side.")]
    RenderFailed,

    /// The poll ceiling was exhausted without the job finishing.
    #[error("Document render did not finish within {attempts} status checks.")]
    RenderTimeout { attempts: u32 },

    /// Downloading the finished render failed (HTTP non-2xx).
    #[error("Failed to download the rendered document (HTTP {status}): {body}")]
    RenderDownload { status: u16, body: String },

    // ── Vision-model errors ───────────────────────────────────────────────
    /// The model API rejected the API key (HTTP 401).
    #[error("Invalid model API key (HTTP 401). Check the stored credential.")]
    ModelAuth,

    /// The model API returned HTTP 429 — try again later.
    #[error("Model API rate limit exceeded (HTTP 429). Try again later.")]
    ModelRateLimit,

    /// Any other non-2xx response from the model API.
    #[error("Model API error (HTTP {status}): {body}")]
    Model { status: u16, body: String },

    /// The model's reply was not valid field data, even after fence stripping.
    #[error("Model response is not valid invoice JSON: {detail}")]
    ModelResponseParse { detail: String },

    // ── Local processing errors ───────────────────────────────────────────
    /// The document bytes could not be rasterised or decoded into an image.
    #[error("Failed to rasterise the document: {detail}")]
    Raster { detail: String },

    // ── Transport / catch-all ─────────────────────────────────────────────
    /// Network-level failure before any HTTP status was received.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
