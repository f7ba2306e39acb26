//! Client for the document-processing service.
//!
//! Three operations, one auth scheme:
//!
//! * `fetch_fields` — read the service's own OCR extraction for a document.
//! * `fetch_rendered_document` — obtain the document as displayable bytes,
//!   via the service's asynchronous render protocol (request, poll,
//!   download).
//! * `update_fields` — PATCH corrected field data back onto the document.
//!
//! ## The render protocol
//!
//! Rendering is server-side and asynchronous. `POST /printouts` with a
//! one-element id list enqueues a job and answers with the job id as a
//! *quoted* string. `GET /printouts/{job}` reports `Pending`, `Finished` or
//! `Failed` plus a file-type hint; the client polls it at a fixed interval
//! up to a fixed ceiling. On `Finished`, `GET /printouts/{job}/data` returns
//! the binary render. `Failed` is terminal and never retried, and any HTTP
//! failure during the protocol is terminal too — the only retried condition
//! is a still-pending status.

use crate::config::EngineConfig;
use crate::error::CrossCheckError;
use crate::fields::ServiceFields;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// Auth scheme name for the service's `Authorization` header.
const AUTH_SCHEME: &str = "Scanye";

/// HTTP client for the document service, bound to one base URL and one key.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// A downloaded document render.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// File-type hint from the status response, e.g. `"Pdf"` or `"Png"`.
    pub file_type: Option<String>,
}

impl RenderedDocument {
    /// Whether the payload should go through the PDF rasteriser.
    ///
    /// The hint decides when present; otherwise the `%PDF` magic does.
    pub fn is_pdf(&self) -> bool {
        match self.file_type.as_deref() {
            Some(hint) => hint.eq_ignore_ascii_case("pdf"),
            None => self.bytes.starts_with(b"%PDF"),
        }
    }

    /// Media type for the hint, defaulting to PNG for unknown raster hints.
    pub fn media_type(&self) -> &'static str {
        match self.file_type.as_deref() {
            Some(h) if h.eq_ignore_ascii_case("pdf") => "application/pdf",
            Some(h) if h.eq_ignore_ascii_case("jpeg") || h.eq_ignore_ascii_case("jpg") => {
                "image/jpeg"
            }
            _ => "image/png",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderStatusBody {
    status: RenderState,
    file_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum RenderState {
    Pending,
    Finished,
    Failed,
    /// Forward compatibility: unknown states keep the poll loop going.
    #[serde(other)]
    Other,
}

impl ServiceClient {
    pub fn new(http: reqwest::Client, config: &EngineConfig, api_key: String) -> Self {
        Self {
            http,
            base_url: config.service_base_url.clone(),
            api_key,
        }
    }

    /// The `Authorization` header value: `"Scanye <key>"`.
    ///
    /// Idempotent — a stored credential that already carries the scheme
    /// prefix is passed through unchanged, so double-prefixing cannot
    /// happen whichever form the user saved.
    fn authorization_value(&self) -> String {
        let prefix = format!("{AUTH_SCHEME} ");
        if self.api_key.starts_with(&prefix) {
            self.api_key.clone()
        } else {
            format!("{prefix}{}", self.api_key)
        }
    }

    /// Fetch the service's extracted field data for one document.
    pub async fn fetch_fields(&self, id: &str) -> Result<ServiceFields, CrossCheckError> {
        let url = format!("{}/invoices/{id}/data", self.base_url);
        tracing::debug!(%id, "fetching service field data");

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.authorization_value())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(CrossCheckError::Auth),
            StatusCode::NOT_FOUND => Err(CrossCheckError::NotFound { id: id.to_string() }),
            status if !status.is_success() => Err(CrossCheckError::Service {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
            _ => {
                let body = response.text().await?;
                serde_json::from_str(&body).map_err(|e| CrossCheckError::Decode {
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Run the full render protocol for one document.
    pub async fn fetch_rendered_document(
        &self,
        id: &str,
        config: &EngineConfig,
    ) -> Result<RenderedDocument, CrossCheckError> {
        let job_id = self.request_render(id).await?;
        tracing::debug!(%id, %job_id, "render job enqueued");

        let file_type = self.poll_until_finished(&job_id, config).await?;
        let bytes = self.download_render(&job_id).await?;
        tracing::debug!(%job_id, size = bytes.len(), ?file_type, "render downloaded");

        Ok(RenderedDocument { bytes, file_type })
    }

    async fn request_render(&self, id: &str) -> Result<String, CrossCheckError> {
        let url = format!("{}/printouts", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.authorization_value())
            .json(&vec![id])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CrossCheckError::RenderRequest {
                status: status.as_u16(),
                body,
            });
        }
        Ok(strip_quotes(body.trim()).to_string())
    }

    /// Poll the job until `Finished`, returning the file-type hint.
    async fn poll_until_finished(
        &self,
        job_id: &str,
        config: &EngineConfig,
    ) -> Result<Option<String>, CrossCheckError> {
        let url = format!("{}/printouts/{job_id}", self.base_url);

        for attempt in 1..=config.poll_max_attempts {
            let response = self
                .http
                .get(&url)
                .header("Authorization", self.authorization_value())
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(CrossCheckError::RenderStatus {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }

            let body: RenderStatusBody =
                response.json().await.map_err(|e| CrossCheckError::Decode {
                    detail: format!("render status body: {e}"),
                })?;

            match body.status {
                RenderState::Finished => return Ok(body.file_type),
                RenderState::Failed => return Err(CrossCheckError::RenderFailed),
                RenderState::Pending | RenderState::Other => {
                    tracing::trace!(%job_id, attempt, "render still pending");
                }
            }

            // No point sleeping after the final attempt.
            if attempt < config.poll_max_attempts {
                tokio::time::sleep(config.poll_interval).await;
            }
        }

        Err(CrossCheckError::RenderTimeout {
            attempts: config.poll_max_attempts,
        })
    }

    async fn download_render(&self, job_id: &str) -> Result<Vec<u8>, CrossCheckError> {
        let url = format!("{}/printouts/{job_id}/data", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Authorization", self.authorization_value())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrossCheckError::RenderDownload {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// PATCH corrected field data back onto the document.
    pub async fn update_fields(&self, id: &str, payload: &Value) -> Result<(), CrossCheckError> {
        let url = format!("{}/invoices/{id}", self.base_url);
        tracing::debug!(%id, "pushing corrected field data");

        let response = self
            .http
            .patch(&url)
            .header("Authorization", self.authorization_value())
            .json(payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(CrossCheckError::Auth),
            StatusCode::NOT_FOUND => Err(CrossCheckError::NotFound { id: id.to_string() }),
            status if !status.is_success() => Err(CrossCheckError::Service {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(()),
        }
    }
}

/// Strip one pair of surrounding double quotes, if present.
fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}
