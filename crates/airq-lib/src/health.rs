//! Health, readiness and service metadata responses

use crate::models::FEATURE_FIELDS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model description reported by `/health`
pub const MODEL_TYPE: &str = "AdaBoost + StandardScaler";

/// Model description reported by `/`
pub const MODEL_DESCRIPTION: &str = "AdaBoost Classifier + StandardScaler";

/// Liveness response. Always reports `healthy`; load state is carried in
/// the flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub model_type: String,
}

impl HealthResponse {
    pub fn new(loaded: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            model_loaded: loaded,
            scaler_loaded: loaded,
            model_type: MODEL_TYPE.to_string(),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReadinessResponse {
    pub fn ready() -> Self {
        Self {
            ready: true,
            reason: None,
        }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: Some(reason.into()),
        }
    }
}

/// Deployment facts reported by `/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
    pub platform: String,
    /// Held-out accuracy of the deployed bundle, as a display string
    pub accuracy: Option<String>,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: "Air Quality ML API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: "self-hosted".to_string(),
            accuracy: None,
        }
    }
}

/// Static service metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub model: String,
    pub platform: String,
    pub accuracy: Option<String>,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    pub endpoints: BTreeMap<String, String>,
}

impl ServiceInfo {
    pub fn new(identity: &ServiceIdentity, classes: Vec<String>) -> Self {
        Self {
            name: identity.name.clone(),
            version: identity.version.clone(),
            model: MODEL_DESCRIPTION.to_string(),
            platform: identity.platform.clone(),
            accuracy: identity.accuracy.clone(),
            features: FEATURE_FIELDS.iter().map(|f| f.to_string()).collect(),
            classes,
            endpoints: endpoints(),
        }
    }
}

fn endpoints() -> BTreeMap<String, String> {
    [
        ("/", "API info"),
        ("/health", "Health check"),
        ("/predict", "POST - Predict air quality"),
        ("/readyz", "Readiness probe"),
        ("/metrics", "Prometheus metrics"),
    ]
    .into_iter()
    .map(|(path, description)| (path.to_string(), description.to_string()))
    .collect()
}
