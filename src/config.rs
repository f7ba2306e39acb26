//! Configuration for a comparison run.
//!
//! All behaviour is controlled through [`EngineConfig`], built via its
//! [`EngineConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share a config across engine instances and to point both remote
//! endpoints at a local mock server in tests.

use crate::error::CrossCheckError;
use std::time::Duration;

/// Default document-service endpoint.
pub const DEFAULT_SERVICE_BASE_URL: &str = "https://api.scanye.pl";

/// Default model API endpoint (an OpenAI-compatible chat/completions host).
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for [`crate::engine::ComparisonEngine`].
///
/// Built via [`EngineConfig::builder()`] or [`EngineConfig::default()`].
///
/// # Example
/// ```rust
/// use invoice_crosscheck::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .model("gpt-4o")
///     .poll_max_attempts(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the document-processing service.
    pub service_base_url: String,

    /// Base URL of the vision model API.
    pub model_base_url: String,

    /// Vision model identifier. Default: "gpt-4o".
    pub model: String,

    /// Maximum tokens the model may generate for one extraction. Default: 2000.
    ///
    /// An invoice field set plus line items fits comfortably under 2 000
    /// tokens; the bound keeps a rambling model from running up cost.
    pub max_tokens: usize,

    /// Interval between render-status polls. Default: 1 s.
    pub poll_interval: Duration,

    /// Maximum number of render-status polls before giving up. Default: 30.
    ///
    /// Render is asynchronous server-side work with unknown completion time;
    /// the ceiling guarantees the pipeline terminates even if the service
    /// stalls. This is the only timeout in the system.
    pub poll_max_attempts: u32,

    /// Scale factor for rasterising the first PDF page. Default: 1.5.
    ///
    /// 1.5× the page's native size keeps small print legible to the model
    /// without producing an image large enough to hit API upload limits.
    pub render_scale: f32,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub http_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_base_url: DEFAULT_SERVICE_BASE_URL.to_string(),
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            poll_interval: Duration::from_secs(1),
            poll_max_attempts: 30,
            render_scale: 1.5,
            http_timeout_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn service_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.service_base_url = trim_trailing_slash(url.into());
        self
    }

    pub fn model_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.model_base_url = trim_trailing_slash(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn poll_max_attempts(mut self, n: u32) -> Self {
        self.config.poll_max_attempts = n.max(1);
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, CrossCheckError> {
        let c = &self.config;
        if c.service_base_url.is_empty() || c.model_base_url.is_empty() {
            return Err(CrossCheckError::Internal(
                "Base URLs must not be empty".into(),
            ));
        }
        if c.model.is_empty() {
            return Err(CrossCheckError::Internal("Model must not be empty".into()));
        }
        Ok(self.config)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
