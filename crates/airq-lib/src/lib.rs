//! Air quality classification library
//!
//! This crate provides the core functionality for:
//! - Training an AdaBoost classifier on labeled sensor readings
//! - Persisting the classifier, scaler and labels as one bundle
//! - Serving predictions from a loaded bundle
//! - Health checks and observability

pub mod bundle;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod trainer;

pub use bundle::{BundleError, BundleFile, ModelBundle, DEFAULT_BUNDLE_FILE};
pub use health::{HealthResponse, ReadinessResponse, ServiceIdentity, ServiceInfo};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ModelState, PredictError, PredictorService};
pub use trainer::{TrainConfig, TrainError, Trainer, TrainingOutcome};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::bundle::ModelBundle;
    use crate::trainer::{LabeledDataset, Trainer};
    use ndarray::Array2;

    pub const GOOD_LABEL: &str = "TCI Comfort & IAQI Good";
    pub const MODERATE_LABEL: &str = "TCI Hot & IAQI Moderate";
    pub const UNHEALTHY_LABEL: &str = "TCI Warm & IAQI Unhealthy";

    /// Three well separated, imbalanced clusters.
    ///
    /// `per_class` rows of the good class, half as many moderate and a
    /// third as many unhealthy. Values are spread deterministically so no
    /// column is constant within a class.
    pub fn synthetic_dataset(per_class: usize) -> LabeledDataset {
        let groups = [
            (GOOD_LABEL, per_class, [24.0, 400.0, 10.0, 55.0]),
            (MODERATE_LABEL, (per_class / 2).max(4), [30.0, 700.0, 55.0, 60.0]),
            (UNHEALTHY_LABEL, (per_class / 3).max(4), [28.0, 1200.0, 120.0, 70.0]),
        ];
        let spread = [3.0, 150.0, 25.0, 12.0];

        let mut values = Vec::new();
        let mut labels = Vec::new();
        for (label, count, base) in groups {
            for i in 0..count {
                for (f, (b, s)) in base.iter().zip(spread).enumerate() {
                    let jitter = ((i * (3 + 2 * f) + f) % 11) as f64 / 10.0;
                    values.push(b + s * jitter);
                }
                labels.push(label.to_string());
            }
        }

        let rows = labels.len();
        LabeledDataset::new(Array2::from_shape_vec((rows, 4), values).unwrap(), labels).unwrap()
    }

    pub fn trained_bundle() -> ModelBundle {
        Trainer::default()
            .train(&synthetic_dataset(30))
            .unwrap()
            .bundle
    }
}
