//! Multi-class AdaBoost (SAMME) over depth-1 decision trees
//!
//! The weak learner is the in-crate [`DecisionStump`]. This module owns the
//! boosting loop: sample reweighting, estimator weights, and the mapping
//! from the weighted vote to a probability distribution.

use super::stump::{feature_orders, DecisionStump};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default number of boosting rounds
pub const DEFAULT_N_ESTIMATORS: usize = 50;

/// Default shrinkage applied to each estimator weight
pub const DEFAULT_LEARNING_RATE: f64 = 1.0;

/// Errors raised while fitting or applying the booster
#[derive(Debug, Error)]
pub enum BoostingError {
    #[error("boosting needs at least two classes, got {0}")]
    TooFewClasses(usize),

    #[error("training set is empty")]
    Empty,

    #[error("{records} records but {targets} targets")]
    LengthMismatch { records: usize, targets: usize },

    #[error("class index {index} is out of range for {n_classes} classes")]
    LabelOutOfRange { index: usize, n_classes: usize },

    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("invalid boosting parameters: {0}")]
    InvalidParams(String),

    #[error("first weak learner is no better than chance (weighted error {0:.4})")]
    NoBetterThanChance(f64),

    #[error("classifier has no estimators")]
    NoEstimators,

    #[error("{estimators} estimators but {weights} estimator weights")]
    WeightCount { estimators: usize, weights: usize },

    #[error("estimator {index} is malformed: {reason}")]
    MalformedEstimator { index: usize, reason: String },
}

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

/// Fitted AdaBoost ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    n_classes: usize,
    n_features: usize,
    estimators: Vec<DecisionStump>,
    estimator_weights: Vec<f64>,
}

impl AdaBoostClassifier {
    /// Fit on scaled features `x` and class indices `y` in `0..n_classes`
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<usize>,
        n_classes: usize,
        params: &BoostingParams,
    ) -> Result<Self, BoostingError> {
        if n_classes < 2 {
            return Err(BoostingError::TooFewClasses(n_classes));
        }
        if x.nrows() == 0 {
            return Err(BoostingError::Empty);
        }
        if x.nrows() != y.len() {
            return Err(BoostingError::LengthMismatch {
                records: x.nrows(),
                targets: y.len(),
            });
        }
        if let Some(&index) = y.iter().find(|&&c| c >= n_classes) {
            return Err(BoostingError::LabelOutOfRange { index, n_classes });
        }
        if params.n_estimators == 0 {
            return Err(BoostingError::InvalidParams(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(params.learning_rate > 0.0) || !params.learning_rate.is_finite() {
            return Err(BoostingError::InvalidParams(format!(
                "learning_rate must be positive, got {}",
                params.learning_rate
            )));
        }

        let n = x.nrows();
        let orders = feature_orders(x);
        let chance = 1.0 - 1.0 / n_classes as f64;
        let mut weights = Array1::from_elem(n, 1.0 / n as f64);
        let mut estimators = Vec::with_capacity(params.n_estimators);
        let mut estimator_weights = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            let tree = DecisionStump::fit(x, y, &weights, n_classes, &orders);
            let predicted = tree.predict(x);
            let incorrect: Vec<bool> = predicted.iter().zip(y).map(|(p, t)| p != t).collect();
            let total: f64 = weights.sum();
            let mut missed = 0.0;
            for (&miss, &w) in incorrect.iter().zip(weights.iter()) {
                if miss {
                    missed += w;
                }
            }
            let error = missed / total;

            debug!(round, error, "Fitted weak learner");

            if error <= 0.0 {
                estimators.push(tree);
                estimator_weights.push(1.0);
                break;
            }

            if error >= chance {
                if estimators.is_empty() {
                    return Err(BoostingError::NoBetterThanChance(error));
                }
                break;
            }

            let alpha = params.learning_rate
                * (((1.0 - error) / error).ln() + ((n_classes - 1) as f64).ln());
            estimators.push(tree);
            estimator_weights.push(alpha);

            if round + 1 == params.n_estimators {
                break;
            }

            let boost = alpha.exp();
            for (w, &miss) in weights.iter_mut().zip(&incorrect) {
                if miss && *w > 0.0 {
                    *w *= boost;
                }
            }
            let sum = weights.sum();
            weights.mapv_inplace(|w| w / sum);
        }

        Ok(Self {
            n_classes,
            n_features: x.ncols(),
            estimators,
            estimator_weights,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.estimators.len()
    }

    pub fn estimator_weights(&self) -> &[f64] {
        &self.estimator_weights
    }

    /// Check the structure of a deserialized classifier
    pub fn validate(&self) -> Result<(), BoostingError> {
        if self.n_classes < 2 {
            return Err(BoostingError::TooFewClasses(self.n_classes));
        }
        if self.estimators.is_empty() {
            return Err(BoostingError::NoEstimators);
        }
        if self.estimators.len() != self.estimator_weights.len() {
            return Err(BoostingError::WeightCount {
                estimators: self.estimators.len(),
                weights: self.estimator_weights.len(),
            });
        }

        let rounds = self.estimators.iter().zip(&self.estimator_weights);
        for (index, (tree, &alpha)) in rounds.enumerate() {
            let reason = if tree.feature() >= self.n_features {
                format!("splits on feature {} of {}", tree.feature(), self.n_features)
            } else if tree.max_class() >= self.n_classes {
                format!("predicts class {} of {}", tree.max_class(), self.n_classes)
            } else if !tree.threshold().is_finite() {
                "threshold is not finite".to_string()
            } else if !alpha.is_finite() || alpha <= 0.0 {
                format!("weight {} is not a positive number", alpha)
            } else {
                continue;
            };
            return Err(BoostingError::MalformedEstimator { index, reason });
        }

        Ok(())
    }

    /// Normalized SAMME vote per class, one row per sample
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>, BoostingError> {
        if x.ncols() != self.n_features {
            return Err(BoostingError::FeatureCount {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }

        self.validate()?;

        let k = self.n_classes;
        let against = -1.0 / (k - 1) as f64;
        let mut decision = Array2::<f64>::zeros((x.nrows(), k));

        for (tree, &alpha) in self.estimators.iter().zip(&self.estimator_weights) {
            let predicted = tree.predict(x);
            for (mut row, &class) in decision.rows_mut().into_iter().zip(predicted.iter()) {
                for (c, v) in row.iter_mut().enumerate() {
                    *v += if c == class { alpha } else { against * alpha };
                }
            }
        }

        let total: f64 = self.estimator_weights.iter().sum();
        if total > 0.0 {
            decision.mapv_inplace(|v| v / total);
        }
        Ok(decision)
    }

    /// Class probabilities, one row per sample, each row summing to 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, BoostingError> {
        let mut decision = self.decision_function(x)?;
        let scale = (self.n_classes - 1) as f64;

        for mut row in decision.rows_mut() {
            let max = row.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b / scale));
            row.mapv_inplace(|v| (v / scale - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        Ok(decision)
    }

    /// Most supported class per sample
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>, BoostingError> {
        let decision = self.decision_function(x)?;
        Ok(decision.rows().into_iter().map(|row| argmax(row.iter().copied())).collect())
    }
}

/// Index of the first maximum
pub fn argmax<I: IntoIterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three clusters along both axes, centred at 0, 10 and 20
    fn clustered(per_class: usize) -> (Array2<f64>, Array1<usize>) {
        let mut records = Vec::new();
        let mut targets = Vec::new();
        for class in 0..3 {
            for i in 0..per_class {
                let jitter = (i % 5) as f64 * 0.3 - 0.6;
                records.push(class as f64 * 10.0 + jitter);
                records.push(class as f64 * 10.0 - jitter);
                targets.push(class);
            }
        }
        (
            Array2::from_shape_vec((3 * per_class, 2), records).unwrap(),
            Array1::from(targets),
        )
    }

    fn accuracy(predicted: &Array1<usize>, truth: &Array1<usize>) -> f64 {
        let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
        hits as f64 / truth.len() as f64
    }

    #[test]
    fn test_fits_separable_clusters() {
        let (x, y) = clustered(20);
        let model = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();

        assert!(model.n_estimators() >= 1);
        assert_eq!(model.n_classes(), 3);
        assert!(accuracy(&model.predict(&x).unwrap(), &y) >= 0.9);
    }

    #[test]
    fn test_probabilities_sum_to_one_and_agree_with_predict() {
        let (x, y) = clustered(10);
        let model = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        let predicted = model.predict(&x).unwrap();

        for (row, &class) in proba.rows().into_iter().zip(predicted.iter()) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
            assert_eq!(argmax(row.iter().copied()), class);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = clustered(10);
        let a = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();
        let b = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();

        assert_eq!(a.estimator_weights(), b.estimator_weights());
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_binary_problem() {
        let x = Array2::from_shape_vec((6, 1), vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]).unwrap();
        let y = Array1::from(vec![0, 0, 0, 1, 1, 1]);
        let model = AdaBoostClassifier::fit(&x, &y, 2, &BoostingParams::default()).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[[0, 0]] > 0.5);
        assert!(proba[[5, 1]] > 0.5);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (x, y) = clustered(5);
        assert!(matches!(
            AdaBoostClassifier::fit(&x, &y, 1, &BoostingParams::default()),
            Err(BoostingError::TooFewClasses(1))
        ));
        assert!(matches!(
            AdaBoostClassifier::fit(&x, &y, 2, &BoostingParams::default()),
            Err(BoostingError::LabelOutOfRange { index: 2, .. })
        ));

        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        assert!(matches!(
            AdaBoostClassifier::fit(&x, &y, 3, &params),
            Err(BoostingError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_feature_count_checked_at_inference() {
        let (x, y) = clustered(5);
        let model = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();
        let wrong = Array2::<f64>::zeros((1, 3));
        assert!(matches!(
            model.predict_proba(&wrong),
            Err(BoostingError::FeatureCount { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_fit_is_repeatable_across_many_runs() {
        let (x, y) = clustered(12);
        let first = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();
        let proba = first.predict_proba(&x).unwrap();

        for _ in 0..10 {
            let again = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();
            assert_eq!(again.estimator_weights(), first.estimator_weights());
            assert_eq!(again.estimators, first.estimators);
            assert_eq!(again.predict_proba(&x).unwrap(), proba);
        }
    }

    #[test]
    fn test_validate_accepts_fitted_model() {
        let (x, y) = clustered(5);
        let model = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_models() {
        let (x, y) = clustered(5);
        let model = AdaBoostClassifier::fit(&x, &y, 3, &BoostingParams::default()).unwrap();

        let mut one_class = model.clone();
        one_class.n_classes = 1;
        assert!(matches!(one_class.validate(), Err(BoostingError::TooFewClasses(1))));

        let mut no_classes = model.clone();
        no_classes.n_classes = 0;
        assert!(matches!(no_classes.validate(), Err(BoostingError::TooFewClasses(0))));
        assert!(no_classes.predict_proba(&x).is_err());

        let mut empty = model.clone();
        empty.estimators.clear();
        empty.estimator_weights.clear();
        assert!(matches!(empty.validate(), Err(BoostingError::NoEstimators)));

        let mut short = model.clone();
        short.estimator_weights.pop();
        assert!(matches!(short.validate(), Err(BoostingError::WeightCount { .. })));

        let mut narrow = model.clone();
        narrow.n_features = 0;
        assert!(matches!(
            narrow.validate(),
            Err(BoostingError::MalformedEstimator { index: 0, .. })
        ));

        let mut negative = model;
        negative.estimator_weights[0] = -1.0;
        assert!(matches!(
            negative.validate(),
            Err(BoostingError::MalformedEstimator { index: 0, .. })
        ));
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax([0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax([0.9]), 0);
    }
}
