//! Core data models for the air quality predictor

use crate::predictor::PredictError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 4;

/// Request field names, in model column order
pub const FEATURE_FIELDS: [&str; NUM_FEATURES] = ["temperature", "co2", "pm25", "humidity"];

/// Dataset column names, in model column order
pub const DATASET_COLUMNS: [&str; NUM_FEATURES] = ["air_temperature", "CO2", "pm2_5", "humidity"];

/// Dataset column holding the class label
pub const LABEL_COLUMN: &str = "Air_Quality_Label";

/// A single sensor reading.
///
/// The scaler and classifier were fit on `[temperature, co2, pm25, humidity]`;
/// [`Sample::to_features`] is the only place that fixes that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Air temperature in °C
    pub temperature: f64,
    /// CO2 concentration in ppm
    pub co2: f64,
    /// PM2.5 concentration in µg/m³
    pub pm25: f64,
    /// Relative humidity in %
    pub humidity: f64,
}

impl Sample {
    pub fn new(temperature: f64, co2: f64, pm25: f64, humidity: f64) -> Self {
        Self {
            temperature,
            co2,
            pm25,
            humidity,
        }
    }

    /// Feature vector in model column order
    pub fn to_features(&self) -> [f64; NUM_FEATURES] {
        [self.temperature, self.co2, self.pm25, self.humidity]
    }

    /// Validate a request body and build a sample from it.
    ///
    /// All four keys are checked for presence first, in column order, so an
    /// absent key is always reported as [`PredictError::MissingField`] even
    /// when another field holds garbage. Values must be JSON numbers or
    /// numeric strings and must be finite. Booleans are rejected rather than
    /// read as 1 and 0.
    pub fn from_json(body: &Value) -> Result<Self, PredictError> {
        let object = body.as_object().ok_or_else(|| {
            PredictError::Processing("request body must be a JSON object".to_string())
        })?;

        for field in FEATURE_FIELDS {
            if !object.contains_key(field) {
                return Err(PredictError::MissingField(field));
            }
        }

        let mut values = [0.0; NUM_FEATURES];
        for (slot, field) in values.iter_mut().zip(FEATURE_FIELDS) {
            *slot = coerce_f64(field, &object[field])?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

fn coerce_f64(field: &str, value: &Value) -> Result<f64, PredictError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(PredictError::Processing(format!(
            "field '{}' must be finite, got {}",
            field, v
        ))),
        None => Err(PredictError::Processing(format!(
            "could not convert field '{}' to float: {}",
            field, value
        ))),
    }
}

/// Prediction response returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class index
    pub prediction: usize,
    /// Class name, or `"Unknown"` when the index is outside the label list
    pub label: String,
    /// Maximum value of the probability distribution
    pub confidence: f64,
    /// Probability per known class name
    pub probabilities: BTreeMap<String, f64>,
    /// Unscaled input values as parsed
    pub input: Sample,
}
