//! Bundle-backed inference service
//!
//! Owns the model state for the lifetime of the process. The state is
//! decided once at construction and never changes afterwards, so a
//! `PredictorService` can be shared behind an `Arc` without locks.

use super::{argmax, OutputFormatter, PredictError};
use crate::bundle::{BundleFile, ModelBundle};
use crate::health::{HealthResponse, ReadinessResponse, ServiceIdentity, ServiceInfo};
use crate::models::{Prediction, Sample};
use crate::observability::{ServiceMetrics, StructuredLogger};
use ndarray::{Array1, Array2};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Whether a bundle is available for predictions
#[derive(Debug, Clone)]
pub enum ModelState {
    /// No bundle; every prediction fails with [`PredictError::Unavailable`]
    Unloaded { reason: String },
    /// Bundle loaded and validated
    Ready(Box<ModelBundle>),
}

/// Serves health, metadata and predictions from a fixed model state
pub struct PredictorService {
    state: ModelState,
    identity: ServiceIdentity,
    formatter: OutputFormatter,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictorService {
    /// Serve an in-memory bundle
    pub fn from_bundle(bundle: ModelBundle, identity: ServiceIdentity) -> Self {
        let service = Self::with_state(ModelState::Ready(Box::new(bundle)), identity);
        service
            .metrics
            .set_bundle(Some((service.trainer_version(), "in-memory")));
        service
    }

    /// Load a bundle from disk.
    ///
    /// A bundle that cannot be read or fails validation is logged and the
    /// service starts unloaded; this never fails.
    pub fn load(path: impl AsRef<Path>, identity: ServiceIdentity) -> Self {
        let path = path.as_ref();
        let path_display = path.display().to_string();

        match BundleFile::read(path) {
            Ok(file) => {
                let service =
                    Self::with_state(ModelState::Ready(Box::new(file.bundle)), identity);
                service.logger.log_bundle_loaded(
                    &path_display,
                    &file.sha256,
                    service.classes(),
                );
                service
                    .metrics
                    .set_bundle(Some((service.trainer_version(), &file.sha256)));
                service
            }
            Err(e) => {
                let reason = e.to_string();
                let service = Self::unloaded(reason.clone(), identity);
                service
                    .logger
                    .log_bundle_load_failed(&path_display, &reason);
                service
            }
        }
    }

    /// A service with no model
    pub fn unloaded(reason: impl Into<String>, identity: ServiceIdentity) -> Self {
        let service = Self::with_state(
            ModelState::Unloaded {
                reason: reason.into(),
            },
            identity,
        );
        service.metrics.set_bundle(None);
        service
    }

    fn with_state(state: ModelState, identity: ServiceIdentity) -> Self {
        let logger = StructuredLogger::new(identity.name.clone());
        Self {
            state,
            identity,
            formatter: OutputFormatter::new(),
            metrics: ServiceMetrics::new(),
            logger,
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        match &self.state {
            ModelState::Ready(bundle) => Some(bundle.as_ref()),
            ModelState::Unloaded { .. } => None,
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    fn classes(&self) -> &[String] {
        self.bundle()
            .map(|b| b.classes().classes())
            .unwrap_or_default()
    }

    fn trainer_version(&self) -> &str {
        self.bundle().map(|b| b.trainer_version()).unwrap_or("")
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse::new(self.is_ready())
    }

    pub fn readiness(&self) -> ReadinessResponse {
        match &self.state {
            ModelState::Ready(_) => ReadinessResponse::ready(),
            ModelState::Unloaded { reason } => ReadinessResponse::not_ready(reason.clone()),
        }
    }

    pub fn info(&self) -> ServiceInfo {
        ServiceInfo::new(&self.identity, self.classes().to_vec())
    }

    /// Validate a raw request body and classify it.
    ///
    /// The model state is checked before the body, so an unloaded service
    /// reports [`PredictError::Unavailable`] whatever was sent.
    pub fn predict_json(&self, body: &Value) -> Result<Prediction, PredictError> {
        self.counted(
            self.require_bundle()
                .and_then(|_| Sample::from_json(body))
                .and_then(|sample| self.predict(&sample)),
        )
    }

    /// Like [`predict_json`](Self::predict_json) for an undecoded body.
    /// Malformed JSON is a processing error.
    pub fn predict_bytes(&self, body: &[u8]) -> Result<Prediction, PredictError> {
        self.counted(
            self.require_bundle()
                .and_then(|_| {
                    serde_json::from_slice::<Value>(body).map_err(|e| {
                        PredictError::Processing(format!("invalid JSON body: {}", e))
                    })
                })
                .and_then(|value| Sample::from_json(&value))
                .and_then(|sample| self.predict(&sample)),
        )
    }

    fn counted(&self, result: Result<Prediction, PredictError>) -> Result<Prediction, PredictError> {
        if let Err(e) = &result {
            self.metrics.inc_prediction_errors(e.kind());
        }
        result
    }

    /// Classify a validated sample
    pub fn predict(&self, sample: &Sample) -> Result<Prediction, PredictError> {
        let bundle = self.require_bundle()?;
        let start = Instant::now();

        let row = Array1::from(sample.to_features().to_vec());
        let scaled = bundle
            .scaler()
            .transform_row(row.view())
            .map_err(|e| PredictError::Processing(e.to_string()))?;
        let x = Array2::from_shape_vec((1, scaled.len()), scaled)
            .map_err(|e| PredictError::Processing(e.to_string()))?;

        let proba = bundle
            .model()
            .predict_proba(&x)
            .map_err(|e| PredictError::Processing(e.to_string()))?;
        let probabilities: Vec<f64> = proba.iter().copied().collect();
        let index = argmax(probabilities.iter().copied());

        let output = self
            .formatter
            .format(*sample, index, &probabilities, bundle.classes())?;

        for inconsistency in &output.inconsistencies {
            self.logger
                .log_bundle_inconsistency(inconsistency.kind(), &inconsistency.to_string());
            self.metrics.inc_bundle_inconsistencies(inconsistency.kind());
        }

        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
        self.metrics.inc_predictions();
        debug!(elapsed_us = elapsed.as_micros() as u64, "Inference completed");

        let prediction = output.prediction;
        self.logger.log_prediction(
            prediction.prediction,
            &prediction.label,
            prediction.confidence,
            elapsed.as_micros(),
        );
        Ok(prediction)
    }

    fn require_bundle(&self) -> Result<&ModelBundle, PredictError> {
        self.bundle().ok_or(PredictError::Unavailable)
    }
}
