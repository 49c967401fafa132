//! Prediction output shaping
//!
//! Turns a class index and probability distribution into the response
//! record: label lookup, confidence, and the per-class probability map.

use super::labels::LabelEncoder;
use super::PredictError;
use crate::models::{Prediction, Sample};
use std::collections::BTreeMap;
use std::fmt;

/// A disagreement between the classifier output and the label list.
///
/// Either one indicates a bundle whose classifier and labels were not
/// produced by the same training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// Predicted index has no label
    IndexOutOfRange { index: usize, n_classes: usize },
    /// Distribution length differs from the label count
    DistributionLength { probabilities: usize, n_classes: usize },
}

impl Inconsistency {
    pub fn kind(&self) -> &'static str {
        match self {
            Inconsistency::IndexOutOfRange { .. } => "index_out_of_range",
            Inconsistency::DistributionLength { .. } => "distribution_length",
        }
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::IndexOutOfRange { index, n_classes } => write!(
                f,
                "predicted index {} is outside the {} known classes",
                index, n_classes
            ),
            Inconsistency::DistributionLength {
                probabilities,
                n_classes,
            } => write!(
                f,
                "classifier returned {} probabilities for {} known classes",
                probabilities, n_classes
            ),
        }
    }
}

/// Formatted prediction plus anything worth reporting about it
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedOutput {
    pub prediction: Prediction,
    pub inconsistencies: Vec<Inconsistency>,
}

/// Builds [`Prediction`] records from raw classifier output
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format a prediction.
    ///
    /// # Arguments
    /// * `input` - The sample as parsed, echoed back unscaled
    /// * `index` - Predicted class index
    /// * `probabilities` - Distribution over class indices
    /// * `labels` - Label mapping from the bundle
    pub fn format(
        &self,
        input: Sample,
        index: usize,
        probabilities: &[f64],
        labels: &LabelEncoder,
    ) -> Result<FormattedOutput, PredictError> {
        let confidence = probabilities
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
            .ok_or_else(|| {
                PredictError::Processing("classifier returned no probabilities".to_string())
            })?;

        let mut inconsistencies = Vec::new();
        if index >= labels.len() {
            inconsistencies.push(Inconsistency::IndexOutOfRange {
                index,
                n_classes: labels.len(),
            });
        }
        if probabilities.len() != labels.len() {
            inconsistencies.push(Inconsistency::DistributionLength {
                probabilities: probabilities.len(),
                n_classes: labels.len(),
            });
        }

        let probabilities: BTreeMap<String, f64> = labels
            .classes()
            .iter()
            .zip(probabilities)
            .map(|(label, &p)| (label.clone(), p))
            .collect();

        Ok(FormattedOutput {
            prediction: Prediction {
                prediction: index,
                label: labels.decode_or_unknown(index).to_string(),
                confidence,
                probabilities,
                input,
            },
            inconsistencies,
        })
    }
}
