//! Offline training pipeline
//!
//! CSV → label encoding → stratified split → SMOTE (training split only) →
//! standardization (fit on the rebalanced training split) → AdaBoost →
//! held-out evaluation → [`ModelBundle`].

mod dataset;
mod metrics;
mod smote;
mod split;

pub use dataset::LabeledDataset;
pub use metrics::{evaluate, Averages, ClassReport, EvaluationReport};
pub use smote::{oversample, DEFAULT_K_NEIGHBORS};
pub use split::{stratified_split, Split};

use crate::bundle::{BundleError, ModelBundle};
use crate::models::DATASET_COLUMNS;
use crate::predictor::{
    AdaBoostClassifier, BoostingError, BoostingParams, LabelEncoder, ScalerError, StandardScaler,
    DEFAULT_LEARNING_RATE, DEFAULT_N_ESTIMATORS,
};
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Default held-out fraction
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Default seed for splitting and oversampling
pub const DEFAULT_SEED: u64 = 42;

/// Errors raised by the training pipeline
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),

    #[error("line {line}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("dataset has {features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("dataset has {0} class(es), at least two are required")]
    TooFewClasses(usize),

    #[error("class '{class}' has {count} member(s), stratified splitting needs at least 2")]
    ClassTooSmall { class: String, count: usize },

    #[error("feature '{feature}' is constant on the training split")]
    DegenerateFeature { feature: String },

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Scaler(ScalerError),

    #[error(transparent)]
    Boosting(#[from] BoostingError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] linfa::Error),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

impl From<ScalerError> for TrainError {
    fn from(err: ScalerError) -> Self {
        match err {
            ScalerError::DegenerateFeature { index, .. } => TrainError::DegenerateFeature {
                feature: DATASET_COLUMNS
                    .get(index)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| format!("#{}", index)),
            },
            other => TrainError::Scaler(other),
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Fraction of each class held out for evaluation
    pub test_size: f64,
    /// Seed for the split and the oversampler
    pub seed: u64,
    /// Boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to each estimator weight
    pub learning_rate: f64,
    /// Neighbourhood size for SMOTE
    pub k_neighbors: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SEED,
            n_estimators: DEFAULT_N_ESTIMATORS,
            learning_rate: DEFAULT_LEARNING_RATE,
            k_neighbors: DEFAULT_K_NEIGHBORS,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), TrainError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TrainError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.n_estimators == 0 {
            return Err(TrainError::InvalidConfig(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.k_neighbors == 0 {
            return Err(TrainError::InvalidConfig(
                "k_neighbors must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn boosting(&self) -> BoostingParams {
        BoostingParams {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
        }
    }
}

/// What happened during a training run, for reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub class_counts_before_oversampling: BTreeMap<String, usize>,
    pub class_counts_after_oversampling: BTreeMap<String, usize>,
    pub estimators_fitted: usize,
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: EvaluationReport,
    pub summary: TrainingSummary,
}

/// Runs the training pipeline with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Load a CSV dataset and train on it
    pub fn train_from_csv(&self, path: impl AsRef<Path>) -> Result<TrainingOutcome, TrainError> {
        self.config.validate()?;
        let dataset = LabeledDataset::from_csv_path(path)?;
        self.train(&dataset)
    }

    /// Train on an in-memory dataset
    pub fn train(&self, dataset: &LabeledDataset) -> Result<TrainingOutcome, TrainError> {
        self.config.validate()?;
        if dataset.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let encoder = LabelEncoder::fit(dataset.labels());
        if encoder.len() < 2 {
            return Err(TrainError::TooFewClasses(encoder.len()));
        }
        for (index, class) in encoder.classes().iter().enumerate() {
            info!(class = %class, index, "Label encoding");
        }

        let targets: Vec<usize> = dataset
            .labels()
            .iter()
            .filter_map(|label| encoder.encode(label))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let split = stratified_split(&targets, encoder.classes(), self.config.test_size, &mut rng)?;

        let x_train = dataset.features().select(Axis(0), &split.train);
        let y_train: Array1<usize> = split.train.iter().map(|&i| targets[i]).collect();
        let x_test = dataset.features().select(Axis(0), &split.test);
        let y_test: Vec<usize> = split.test.iter().map(|&i| targets[i]).collect();

        let before = count_classes(&y_train, &encoder);
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            distribution = ?before,
            "Class distribution before oversampling"
        );

        let (x_resampled, y_resampled) = oversample(
            &x_train,
            &y_train,
            encoder.len(),
            self.config.k_neighbors,
            &mut rng,
        )?;
        let after = count_classes(&y_resampled, &encoder);
        info!(distribution = ?after, "Class distribution after oversampling");

        let scaler = StandardScaler::fit(&x_resampled)?;
        info!(mean = ?scaler.mean(), std = ?scaler.std(), "Fitted scaler");

        let x_resampled = scaler.transform(&x_resampled)?;
        let x_test = scaler.transform(&x_test)?;

        let model = AdaBoostClassifier::fit(
            &x_resampled,
            &y_resampled,
            encoder.len(),
            &self.config.boosting(),
        )?;
        info!(
            estimators = model.n_estimators(),
            "Fitted AdaBoost classifier"
        );

        let predicted = model.predict(&x_test)?.to_vec();
        let report = evaluate(&y_test, &predicted, &encoder)?;
        info!(
            accuracy = report.accuracy,
            precision = report.weighted.precision,
            recall = report.weighted.recall,
            f1 = report.weighted.f1,
            "Held-out evaluation"
        );

        let summary = TrainingSummary {
            rows: dataset.len(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            class_counts_before_oversampling: before,
            class_counts_after_oversampling: after,
            estimators_fitted: model.n_estimators(),
        };

        let bundle = ModelBundle::new(model, scaler, encoder, Some(self.config.clone()))?;

        Ok(TrainingOutcome {
            bundle,
            report,
            summary,
        })
    }
}

fn count_classes(targets: &Array1<usize>, encoder: &LabelEncoder) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for &t in targets {
        *counts
            .entry(encoder.decode_or_unknown(t).to_string())
            .or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_dataset;

    #[test]
    fn test_training_produces_consistent_bundle() {
        let dataset = synthetic_dataset(40);
        let outcome = Trainer::default().train(&dataset).unwrap();

        let bundle = &outcome.bundle;
        assert_eq!(bundle.classes().len(), 3);
        assert_eq!(bundle.scaler().n_features(), 4);
        assert_eq!(bundle.model().n_classes(), 3);
        assert!(outcome.report.accuracy >= 0.8);
    }

    #[test]
    fn test_oversampling_only_touches_training_split() {
        let dataset = synthetic_dataset(40);
        let outcome = Trainer::default().train(&dataset).unwrap();
        let summary = &outcome.summary;

        assert_eq!(summary.train_rows + summary.test_rows, dataset.len());
        assert_eq!(outcome.report.support, summary.test_rows);

        let after: Vec<usize> = summary.class_counts_after_oversampling.values().copied().collect();
        assert!(after.windows(2).all(|w| w[0] == w[1]));
        assert!(after[0] >= *summary.class_counts_before_oversampling.values().max().unwrap());
    }

    #[test]
    fn test_training_is_reproducible() {
        let dataset = synthetic_dataset(30);
        let a = Trainer::default().train(&dataset).unwrap();
        let b = Trainer::default().train(&dataset).unwrap();

        assert_eq!(a.report, b.report);
        assert_eq!(a.bundle.scaler(), b.bundle.scaler());
        assert_eq!(
            a.bundle.model().estimator_weights(),
            b.bundle.model().estimator_weights()
        );

        let x = b.bundle.scaler().transform(dataset.features()).unwrap();
        assert_eq!(
            a.bundle.model().predict_proba(&x).unwrap(),
            b.bundle.model().predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn test_repeated_training_yields_identical_weights() {
        let dataset = synthetic_dataset(40);
        let first = Trainer::default().train(&dataset).unwrap();

        for _ in 0..5 {
            let again = Trainer::default().train(&dataset).unwrap();
            assert_eq!(
                again.bundle.model().estimator_weights(),
                first.bundle.model().estimator_weights()
            );
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let dataset = LabeledDataset::new(
            ndarray::Array2::from_shape_vec((2, 4), vec![1.0, 2.0, 3.0, 4.0, 2.0, 3.0, 4.0, 5.0])
                .unwrap(),
            vec!["only".to_string(), "only".to_string()],
        )
        .unwrap();

        assert!(matches!(
            Trainer::default().train(&dataset),
            Err(TrainError::TooFewClasses(1))
        ));
    }

    #[test]
    fn test_constant_feature_is_named() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            rows.extend([i as f64, 500.0, (i * 2) as f64, 50.0 + i as f64]);
            labels.push(if i % 2 == 0 { "a" } else { "b" }.to_string());
        }
        let dataset =
            LabeledDataset::new(ndarray::Array2::from_shape_vec((20, 4), rows).unwrap(), labels)
                .unwrap();

        match Trainer::default().train(&dataset) {
            Err(TrainError::DegenerateFeature { feature }) => assert_eq!(feature, "CO2"),
            other => panic!("expected degenerate feature, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TrainConfig {
            test_size: 1.5,
            ..TrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(TrainError::InvalidConfig(_))));
    }
}
