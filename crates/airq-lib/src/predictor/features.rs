//! Feature standardization
//!
//! Per-feature `(value - mean) / std` using statistics captured once at
//! training time. The request path must apply exactly the transform the
//! classifier was fit on.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or applying a scaler
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalerError {
    #[error("scaler has {mean} means but {std} standard deviations")]
    LengthMismatch { mean: usize, std: usize },

    #[error("feature {index} has degenerate standard deviation {std}")]
    DegenerateFeature { index: usize, std: f64 },

    #[error("cannot fit a scaler on an empty matrix")]
    Empty,

    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}

/// Standard scaler with fixed per-column mean and standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Build a scaler from known parameters
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, ScalerError> {
        let scaler = Self { mean, std };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Fit on a matrix where rows are samples and columns are features.
    ///
    /// Uses the population standard deviation. A constant column is
    /// rejected rather than silently rescaled.
    pub fn fit(x: &Array2<f64>) -> Result<Self, ScalerError> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ScalerError::Empty);
        }

        let mean = x.mean_axis(Axis(0)).ok_or(ScalerError::Empty)?;
        let std = x.std_axis(Axis(0), 0.0);

        Self::new(mean.to_vec(), std.to_vec())
    }

    /// Check the invariants a deserialized scaler must hold
    pub fn validate(&self) -> Result<(), ScalerError> {
        if self.mean.len() != self.std.len() {
            return Err(ScalerError::LengthMismatch {
                mean: self.mean.len(),
                std: self.std.len(),
            });
        }
        if self.mean.is_empty() {
            return Err(ScalerError::Empty);
        }
        for (index, &std) in self.std.iter().enumerate() {
            if !std.is_finite() || std <= 0.0 {
                return Err(ScalerError::DegenerateFeature { index, std });
            }
        }
        Ok(())
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale a single feature row
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Vec<f64>, ScalerError> {
        if row.len() != self.n_features() {
            return Err(ScalerError::FeatureCount {
                expected: self.n_features(),
                actual: row.len(),
            });
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (mean, std))| (v - mean) / std)
            .collect())
    }

    /// Scale every row of a matrix
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        if x.ncols() != self.n_features() {
            return Err(ScalerError::FeatureCount {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }

        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for ((v, mean), std) in row.iter_mut().zip(&self.mean).zip(&self.std) {
                *v = (*v - mean) / std;
            }
        }
        Ok(out)
    }
}
