//! Independent field extraction via a vision model.
//!
//! Composes the rest of the pipeline: rasterise the rendered document
//! ([`crate::pipeline::render`]), encode it for inline transport
//! ([`crate::pipeline::encode`]), send one multimodal chat turn, then
//! recover the JSON field set from the reply ([`crate::pipeline::fence`]).
//!
//! The request shape is the OpenAI chat/completions dialect with image
//! content parts, so any compatible host works by pointing
//! `model_base_url` at it.

use crate::config::EngineConfig;
use crate::error::CrossCheckError;
use crate::fields::ExtractedFields;
use crate::pipeline::encode::encode_png;
use crate::pipeline::fence::fenced_payload;
use crate::pipeline::render::first_page_image;
use crate::pipeline::service::RenderedDocument;
use crate::prompts::EXTRACTION_PROMPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

/// HTTP client for the vision model API.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    config: EngineConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, config: EngineConfig, api_key: String) -> Self {
        Self {
            http,
            config,
            api_key,
        }
    }

    /// Extract the field set from a rendered document.
    pub async fn extract(
        &self,
        document: &RenderedDocument,
    ) -> Result<ExtractedFields, CrossCheckError> {
        let image = first_page_image(document, self.config.render_scale).await?;
        let encoded = encode_png(&image)?;
        tracing::debug!(
            media_type = document.media_type(),
            width = image.width(),
            height = image.height(),
            "document rasterised for extraction"
        );

        let reply = self.chat(&encoded.to_data_uri()).await?;
        let payload = fenced_payload(&reply);

        serde_json::from_str(payload).map_err(|e| CrossCheckError::ModelResponseParse {
            detail: e.to_string(),
        })
    }

    /// One multimodal chat turn: the extraction instruction plus the image.
    async fn chat(&self, data_uri: &str) -> Result<String, CrossCheckError> {
        let url = format!("{}/chat/completions", self.config.model_base_url);
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACTION_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_uri } },
                ],
            }],
        });

        tracing::debug!(model = %self.config.model, "requesting model extraction");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(CrossCheckError::ModelAuth),
            StatusCode::TOO_MANY_REQUESTS => return Err(CrossCheckError::ModelRateLimit),
            status if !status.is_success() => {
                return Err(CrossCheckError::Model {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            _ => {}
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            CrossCheckError::ModelResponseParse {
                detail: format!("chat response envelope: {e}"),
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CrossCheckError::ModelResponseParse {
                detail: "response has no message content".to_string(),
            })
    }
}
