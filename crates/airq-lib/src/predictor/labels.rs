//! Label encoding between class names and class indices

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Label returned when a class index has no name
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Fixed bijection between class names and indices.
///
/// Classes are sorted alphabetically when fit, so the index of a class is
/// its position in the sorted list of distinct names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on every label observed in the dataset
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Use an already ordered class list
    pub fn from_classes(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Index for a class name
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// Class name for an index, if it is in range
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Class name for an index, or [`UNKNOWN_LABEL`]
    pub fn decode_or_unknown(&self, index: usize) -> &str {
        self.decode(index).unwrap_or(UNKNOWN_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_sorts_and_deduplicates() {
        let encoder = LabelEncoder::fit([
            "TCI Hot & IAQI Moderate",
            "TCI Comfort & IAQI Good",
            "TCI Hot & IAQI Moderate",
            "TCI Comfort & IAQI Moderate",
        ]);

        assert_eq!(
            encoder.classes(),
            &[
                "TCI Comfort & IAQI Good",
                "TCI Comfort & IAQI Moderate",
                "TCI Hot & IAQI Moderate"
            ]
        );
    }

    #[test]
    fn test_encode_decode_bijection() {
        let encoder = LabelEncoder::fit(["b", "a", "c"]);
        for (i, class) in encoder.classes().iter().enumerate() {
            assert_eq!(encoder.encode(class), Some(i));
            assert_eq!(encoder.decode(i), Some(class.as_str()));
        }
        assert_eq!(encoder.encode("z"), None);
    }

    #[test]
    fn test_out_of_range_decodes_to_unknown() {
        let encoder = LabelEncoder::fit(["a", "b"]);
        assert_eq!(encoder.decode_or_unknown(1), "b");
        assert_eq!(encoder.decode_or_unknown(2), UNKNOWN_LABEL);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let encoder = LabelEncoder::fit(["b", "a"]);
        let json = serde_json::to_string(&encoder).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
    }
}
