//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, bundle state)
//! - Structured JSON logging events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Histogram, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for inference latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance, registered once. `None` if registration failed.
static GLOBAL_METRICS: OnceLock<Option<ServiceMetricsInner>> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors: IntCounterVec,
    bundle_loaded: IntGauge,
    bundle_info: IntGaugeVec,
    bundle_inconsistencies: IntCounterVec,
}

impl ServiceMetricsInner {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            prediction_latency_seconds: register_histogram!(
                "airq_prediction_latency_seconds",
                "Time spent scaling and classifying a sample",
                LATENCY_BUCKETS.to_vec()
            )?,

            predictions_total: register_int_counter!(
                "airq_predictions_total",
                "Total number of predictions served"
            )?,

            prediction_errors: register_int_counter_vec!(
                "airq_prediction_errors_total",
                "Total number of rejected or failed prediction requests",
                &["kind"]
            )?,

            bundle_loaded: register_int_gauge!(
                "airq_bundle_loaded",
                "1 if a model bundle is loaded, 0 otherwise"
            )?,

            bundle_info: register_int_gauge_vec!(
                "airq_bundle_info",
                "Information about the loaded model bundle",
                &["trainer_version", "sha256"]
            )?,

            bundle_inconsistencies: register_int_counter_vec!(
                "airq_bundle_inconsistencies_total",
                "Predictions whose classifier output disagreed with the label list",
                &["kind"]
            )?,
        })
    }
}

/// Service metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a handle, registering the global metrics on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match ServiceMetricsInner::new() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register metrics, continuing without them");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&ServiceMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.prediction_latency_seconds.observe(duration_secs);
        }
    }

    pub fn inc_predictions(&self) {
        if let Some(m) = self.inner() {
            m.predictions_total.inc();
        }
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        if let Some(m) = self.inner() {
            m.prediction_errors.with_label_values(&[kind]).inc();
        }
    }

    pub fn inc_bundle_inconsistencies(&self, kind: &str) {
        if let Some(m) = self.inner() {
            m.bundle_inconsistencies.with_label_values(&[kind]).inc();
        }
    }

    /// Record the loaded bundle, or clear it when `None`
    pub fn set_bundle(&self, bundle: Option<(&str, &str)>) {
        let Some(m) = self.inner() else {
            return;
        };
        m.bundle_info.reset();
        match bundle {
            Some((trainer_version, sha256)) => {
                m.bundle_loaded.set(1);
                m.bundle_info
                    .with_label_values(&[trainer_version, sha256])
                    .set(1);
            }
            None => m.bundle_loaded.set(0),
        }
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions, bundle
/// loading and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, address: &str, ready: bool) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            address = %address,
            ready = ready,
            "Prediction service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }

    /// Log a successful bundle load
    pub fn log_bundle_loaded(&self, path: &str, sha256: &str, classes: &[String]) {
        info!(
            event = "bundle_loaded",
            service = %self.service,
            path = %path,
            sha256 = %sha256,
            classes = ?classes,
            "Model bundle loaded"
        );
    }

    /// Log a failed bundle load. The service keeps running without a model.
    pub fn log_bundle_load_failed(&self, path: &str, reason: &str) {
        error!(
            event = "bundle_load_failed",
            service = %self.service,
            path = %path,
            reason = %reason,
            "Failed to load model bundle, predictions are unavailable"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, prediction: usize, label: &str, confidence: f64, latency_us: u128) {
        info!(
            event = "prediction_served",
            service = %self.service,
            prediction = prediction,
            label = %label,
            confidence = confidence,
            latency_us = latency_us as u64,
            "Served prediction"
        );
    }

    /// Log a classifier/label disagreement
    pub fn log_bundle_inconsistency(&self, kind: &str, details: &str) {
        warn!(
            event = "bundle_inconsistency",
            service = %self.service,
            kind = %kind,
            details = %details,
            "Classifier output disagrees with bundle labels"
        );
    }
}
