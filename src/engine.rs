//! The comparison engine: orchestration and the single-flight guard.
//!
//! [`ComparisonEngine`] wires the two extraction paths together. One engine
//! instance admits at most one run at a time: a run touches a paid model API
//! and enqueues server-side render work, so an accidental double trigger
//! (a double-click, two UI events) must collapse into one run rather than
//! two. The guard is an `AtomicBool` claimed before the first await and
//! released on every exit path via `Drop`, so early errors and panics
//! cannot leave the engine wedged.

use crate::compare::{compare_fields, ComparisonReport};
use crate::config::EngineConfig;
use crate::credentials::{CredentialStore, MODEL_API_KEY, SERVICE_API_KEY};
use crate::error::CrossCheckError;
use crate::fields::ExtractedFields;
use crate::normalize::{normalize, update_payload};
use crate::pipeline::service::ServiceClient;
use crate::pipeline::vision::VisionClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    /// The field-by-field comparison.
    pub report: ComparisonReport,
    /// The service's extraction, flattened.
    pub service_fields: ExtractedFields,
    /// The model's extraction, as parsed from its reply.
    pub model_fields: ExtractedFields,
}

/// Orchestrates one document's dual extraction and comparison.
pub struct ComparisonEngine {
    config: EngineConfig,
    credentials: Arc<dyn CredentialStore>,
    http: reqwest::Client,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ComparisonEngine {
    pub fn new(
        config: EngineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, CrossCheckError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            config,
            credentials,
            http,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Whether a run is currently in progress on this engine.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run a full comparison for one document.
    ///
    /// Returns `Ok(None)` without doing anything when another run is already
    /// in flight on this engine. The two extraction paths run concurrently;
    /// the service path is a single fetch, the model path is the longer
    /// render-and-extract chain.
    pub async fn run(&self, id: &str) -> Result<Option<ComparisonOutcome>, CrossCheckError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(%id, "comparison already in flight, ignoring trigger");
            return Ok(None);
        }
        let _guard = InFlightGuard(&self.in_flight);

        tracing::info!(%id, "starting comparison run");
        let service = self.service_client()?;
        let vision = self.vision_client()?;

        let service_path = service.fetch_fields(id);
        let model_path = async {
            let document = service.fetch_rendered_document(id, &self.config).await?;
            vision.extract(&document).await
        };

        let (raw_service, model_fields) = futures::try_join!(service_path, model_path)?;
        let service_fields = normalize(&raw_service);

        let report = compare_fields(&service_fields, &model_fields);
        tracing::info!(
            %id,
            matched = report.matched_count(),
            total = report.rows.len(),
            "comparison finished"
        );

        Ok(Some(ComparisonOutcome {
            report,
            service_fields,
            model_fields,
        }))
    }

    /// Push a model-extracted field set back onto the document.
    ///
    /// Returns `Ok(false)` without calling the service when a comparison run
    /// is in flight, so a push can never interleave with an extraction.
    pub async fn push_corrections(
        &self,
        id: &str,
        fields: &ExtractedFields,
    ) -> Result<bool, CrossCheckError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(%id, "comparison in flight, refusing to push corrections");
            return Ok(false);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let payload = update_payload(fields);
        self.service_client()?.update_fields(id, &payload).await?;
        tracing::info!(%id, "corrections pushed");
        Ok(true)
    }

    fn service_client(&self) -> Result<ServiceClient, CrossCheckError> {
        let key = self.required_credential(SERVICE_API_KEY)?;
        Ok(ServiceClient::new(self.http.clone(), &self.config, key))
    }

    fn vision_client(&self) -> Result<VisionClient, CrossCheckError> {
        let key = self.required_credential(MODEL_API_KEY)?;
        Ok(VisionClient::new(
            self.http.clone(),
            self.config.clone(),
            key,
        ))
    }

    fn required_credential(&self, name: &'static str) -> Result<String, CrossCheckError> {
        let value = self.credentials.get(name);
        if value.is_empty() {
            return Err(CrossCheckError::MissingCredential { name });
        }
        Ok(value)
    }
}
