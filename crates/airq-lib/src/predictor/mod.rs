//! Classification engine: scaling, boosting, label mapping and serving

mod boosting;
mod features;
mod inference;
mod labels;
mod output;
mod stump;

pub use boosting::{
    argmax, AdaBoostClassifier, BoostingError, BoostingParams, DEFAULT_LEARNING_RATE,
    DEFAULT_N_ESTIMATORS,
};
pub use features::{ScalerError, StandardScaler};
pub use inference::{ModelState, PredictorService};
pub use labels::{LabelEncoder, UNKNOWN_LABEL};
pub use output::{FormattedOutput, Inconsistency, OutputFormatter};
pub use stump::DecisionStump;

use thiserror::Error;

/// Errors surfaced to prediction callers.
///
/// The display strings are the response messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictError {
    /// No bundle is loaded
    #[error("Model or scaler not loaded")]
    Unavailable,

    /// A required request field is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Anything else that went wrong while handling a request
    #[error("{0}")]
    Processing(String),
}

impl PredictError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Unavailable => "unavailable",
            PredictError::MissingField(_) => "missing_field",
            PredictError::Processing(_) => "processing",
        }
    }
}
