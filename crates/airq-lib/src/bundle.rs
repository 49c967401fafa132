//! Model bundle persistence
//!
//! A bundle is the single artifact handed from the trainer to the service:
//! the fitted classifier, the scaler it was trained behind, and the label
//! list, written as one JSON document so the three can never drift apart on
//! disk.

use crate::models::{FEATURE_FIELDS, NUM_FEATURES};
use crate::predictor::{
    AdaBoostClassifier, BoostingError, LabelEncoder, ScalerError, StandardScaler,
};
use crate::trainer::TrainConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Current on-disk format
pub const BUNDLE_FORMAT_VERSION: u32 = 2;

/// File name used when no path is configured
pub const DEFAULT_BUNDLE_FILE: &str = "air_quality_bundle.json";

/// Errors raised while reading, writing or validating a bundle
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bundle is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported bundle format version {found} (expected {expected})")]
    FormatVersion { found: u32, expected: u32 },

    #[error("bundle scaler is invalid: {0}")]
    Scaler(#[from] ScalerError),

    #[error("bundle expects {expected} features, found {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("bundle has no classes")]
    NoClasses,

    #[error("bundle classifier is invalid: {0}")]
    Model(#[from] BoostingError),
}

/// Fitted classifier, scaler and label list, produced by one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    format_version: u32,
    created_at: DateTime<Utc>,
    trainer_version: String,
    feature_names: Vec<String>,
    classes: LabelEncoder,
    scaler: StandardScaler,
    model: AdaBoostClassifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    training_config: Option<TrainConfig>,
}

impl ModelBundle {
    pub fn new(
        model: AdaBoostClassifier,
        scaler: StandardScaler,
        classes: LabelEncoder,
        training_config: Option<TrainConfig>,
    ) -> Result<Self, BundleError> {
        let bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            trainer_version: env!("CARGO_PKG_VERSION").to_string(),
            feature_names: FEATURE_FIELDS.iter().map(|f| f.to_string()).collect(),
            classes,
            scaler,
            model,
            training_config,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn trainer_version(&self) -> &str {
        &self.trainer_version
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn classes(&self) -> &LabelEncoder {
        &self.classes
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn model(&self) -> &AdaBoostClassifier {
        &self.model
    }

    pub fn training_config(&self) -> Option<&TrainConfig> {
        self.training_config.as_ref()
    }

    /// Check the invariants a deserialized bundle must hold.
    ///
    /// A classifier whose class count differs from the label list is
    /// accepted and only logged; predictions then go through the
    /// `"Unknown"` label path.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(BundleError::FormatVersion {
                found: self.format_version,
                expected: BUNDLE_FORMAT_VERSION,
            });
        }

        self.scaler.validate()?;

        for actual in [self.scaler.n_features(), self.model.n_features()] {
            if actual != NUM_FEATURES {
                return Err(BundleError::FeatureCount {
                    expected: NUM_FEATURES,
                    actual,
                });
            }
        }

        self.model.validate()?;

        if self.classes.is_empty() {
            return Err(BundleError::NoClasses);
        }

        if self.model.n_classes() != self.classes.len() {
            warn!(
                event = "bundle_inconsistency",
                model_classes = self.model.n_classes(),
                labels = self.classes.len(),
                "Classifier and label list disagree on class count"
            );
        }

        Ok(())
    }

    /// Write the bundle as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BundleError> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), classes = self.classes.len(), "Saved model bundle");
        Ok(())
    }

    /// Read and validate a bundle
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        BundleFile::read(path).map(|file| file.bundle)
    }

    /// `air_quality_bundle.json` next to the running executable, falling
    /// back to the working directory
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_BUNDLE_FILE)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUNDLE_FILE))
    }
}

/// A loaded bundle plus facts about the file it came from
#[derive(Debug, Clone)]
pub struct BundleFile {
    pub bundle: ModelBundle,
    pub path: PathBuf,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

impl BundleFile {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        let bundle: ModelBundle = serde_json::from_slice(&bytes)?;
        bundle.validate()?;

        info!(
            path = %path.display(),
            sha256 = %sha256,
            classes = bundle.classes.len(),
            estimators = bundle.model.n_estimators(),
            "Loaded model bundle"
        );

        Ok(Self {
            bundle,
            path: path.to_path_buf(),
            sha256,
        })
    }
}
