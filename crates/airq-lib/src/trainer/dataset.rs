//! Labeled training data loaded from CSV

use super::TrainError;
use crate::models::{DATASET_COLUMNS, LABEL_COLUMN, NUM_FEATURES};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Feature matrix in model column order plus one label per row
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    features: Array2<f64>,
    labels: Vec<String>,
}

impl LabeledDataset {
    pub fn new(features: Array2<f64>, labels: Vec<String>) -> Result<Self, TrainError> {
        if features.ncols() != NUM_FEATURES {
            return Err(TrainError::InvalidConfig(format!(
                "dataset must have {} feature columns, got {}",
                NUM_FEATURES,
                features.ncols()
            )));
        }
        if features.nrows() != labels.len() {
            return Err(TrainError::LengthMismatch {
                features: features.nrows(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    /// Load a CSV file with a header row
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, TrainError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = Self::from_csv_reader(file)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Loaded training dataset"
        );
        Ok(dataset)
    }

    /// Parse CSV data with a header row.
    ///
    /// Every required column is located before any row is parsed, so a
    /// missing column fails fast. Cells that do not parse as finite numbers
    /// are reported with their line number; nothing is dropped or imputed.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TrainError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column_index = |name: &str| -> Result<usize, TrainError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TrainError::MissingColumn(name.to_string()))
        };

        let mut feature_idx = [0usize; NUM_FEATURES];
        for (slot, name) in feature_idx.iter_mut().zip(DATASET_COLUMNS) {
            *slot = column_index(name)?;
        }
        let label_idx = column_index(LABEL_COLUMN)?;

        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = i + 2;

            for (&idx, name) in feature_idx.iter().zip(DATASET_COLUMNS) {
                let raw = record.get(idx).unwrap_or("");
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| TrainError::InvalidValue {
                        line,
                        column: name.to_string(),
                        value: raw.to_string(),
                    })?;
                values.push(value);
            }

            let label = record.get(label_idx).unwrap_or("");
            if label.is_empty() {
                return Err(TrainError::InvalidValue {
                    line,
                    column: LABEL_COLUMN.to_string(),
                    value: String::new(),
                });
            }
            labels.push(label.to_string());
        }

        if labels.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let features = Array2::from_shape_vec((labels.len(), NUM_FEATURES), values)
            .map_err(|e| TrainError::InvalidConfig(e.to_string()))?;
        Self::new(features, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Row count per label
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }
}
