//! Held-out evaluation: accuracy, precision, recall, F1
//!
//! Macro scores come from linfa's one-vs-all confusion matrices. linfa
//! orders its classes by hash, so the per-class rows and the
//! support-weighted averages are folded from a label-ordered count matrix
//! kept alongside.

use crate::predictor::LabelEncoder;
use linfa::metrics::{ConfusionMatrix, ToConfusionMatrix};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Per-class scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Evaluation of the held-out split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Support-weighted averages
    pub weighted: Averages,
    /// Unweighted mean over the classes present in the ground truth
    pub macro_avg: Averages,
    pub classes: Vec<ClassReport>,
    /// `confusion[truth][predicted]`
    pub confusion: Vec<Vec<usize>>,
    pub support: usize,
}

impl EvaluationReport {
    /// Accuracy as a percentage string, the form the service reports in `accuracy`
    pub fn accuracy_percent(&self) -> String {
        format!("{:.2}%", self.accuracy * 100.0)
    }
}

/// Score predictions against ground truth.
///
/// A class that is never predicted has precision 0; one with no support
/// has recall 0 and is left out of the macro average. Predictions naming a
/// class absent from the ground truth count towards accuracy and the
/// per-class rows only.
pub fn evaluate(
    truth: &[usize],
    predicted: &[usize],
    labels: &LabelEncoder,
) -> Result<EvaluationReport, linfa::Error> {
    let k = labels.len();
    let mut confusion = vec![vec![0usize; k]; k];
    let mut hits = 0usize;

    for (&t, &p) in truth.iter().zip(predicted) {
        if t == p {
            hits += 1;
        }
        if t < k && p < k {
            confusion[t][p] += 1;
        }
    }

    let total = truth.len();
    let classes: Vec<ClassReport> = labels
        .classes()
        .iter()
        .enumerate()
        .map(|(c, label)| {
            let tp = confusion[c][c] as f64;
            let support: usize = confusion[c].iter().sum();
            let predicted_as: usize = confusion.iter().map(|row| row[c]).sum();

            let precision = ratio(tp, predicted_as as f64);
            let recall = ratio(tp, support as f64);
            let f1 = ratio(2.0 * precision * recall, precision + recall);

            ClassReport {
                label: label.clone(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let weighted = average(&classes, |c| c.support as f64);
    let macro_avg = if total == 0 {
        Averages {
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        }
    } else {
        // Rows are ground truth, so each one-vs-all split reads as precision/recall of that class
        let truth = Array1::from(truth.to_vec());
        let predicted = Array1::from(predicted.to_vec());
        macro_scores(&truth.confusion_matrix(&predicted)?)
    };

    Ok(EvaluationReport {
        accuracy: ratio(hits as f64, total as f64),
        weighted,
        macro_avg,
        classes,
        confusion,
        support: total,
    })
}

fn macro_scores(matrix: &ConfusionMatrix<usize>) -> Averages {
    let splits = matrix.split_one_vs_all();
    let n = splits.len() as f64;
    let mean = |score: fn(&ConfusionMatrix<bool>) -> f32| {
        ratio(splits.iter().map(|m| finite(score(m))).sum(), n)
    };
    Averages {
        precision: mean(|m| m.precision()),
        recall: mean(|m| m.recall()),
        f1: mean(|m| m.f1_score()),
    }
}

/// linfa reports 0/0 as NaN; those scores count as 0
fn finite(score: f32) -> f64 {
    if score.is_finite() {
        score as f64
    } else {
        0.0
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn average(classes: &[ClassReport], weight: impl Fn(&ClassReport) -> f64) -> Averages {
    let total: f64 = classes.iter().map(&weight).sum();
    let sum = |f: fn(&ClassReport) -> f64| {
        ratio(classes.iter().map(|c| f(c) * weight(c)).sum(), total)
    };
    Averages {
        precision: sum(|c| c.precision),
        recall: sum(|c| c.recall),
        f1: sum(|c| c.f1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelEncoder {
        LabelEncoder::fit(["a", "b", "c"])
    }

    #[test]
    fn test_perfect_predictions() {
        let truth = [0, 1, 2, 2];
        let report = evaluate(&truth, &truth, &labels()).unwrap();

        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.weighted.f1, 1.0);
        assert_eq!(report.macro_avg.precision, 1.0);
        assert_eq!(report.macro_avg.recall, 1.0);
        assert_eq!(report.macro_avg.f1, 1.0);
        assert_eq!(report.confusion, vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 2]]);
    }

    #[test]
    fn test_weighted_scores_follow_support() {
        // a: 2 true, both hit. b: 2 true, one predicted as a. c: never present.
        let truth = [0, 0, 1, 1];
        let predicted = [0, 0, 0, 1];
        let report = evaluate(&truth, &predicted, &labels()).unwrap();

        assert_eq!(report.accuracy, 0.75);

        let a = &report.classes[0];
        assert!((a.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(a.recall, 1.0);

        let b = &report.classes[1];
        assert_eq!(b.precision, 1.0);
        assert_eq!(b.recall, 0.5);

        let c = &report.classes[2];
        assert_eq!((c.precision, c.recall, c.f1, c.support), (0.0, 0.0, 0.0, 0));

        let expected_precision = (2.0 / 3.0 * 2.0 + 1.0 * 2.0) / 4.0;
        assert!((report.weighted.precision - expected_precision).abs() < 1e-12);
        assert_eq!(report.weighted.recall, 0.75);

        // c has no support, so the macro mean is over a and b
        assert!((report.macro_avg.precision - (2.0 / 3.0 + 1.0) / 2.0).abs() < 1e-6);
        assert!((report.macro_avg.recall - 0.75).abs() < 1e-6);
        assert!((report.macro_avg.f1 - (0.8 + 2.0 / 3.0) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_macro_scores_match_class_rows() {
        let truth = [0, 0, 0, 1, 1, 2, 2, 2, 2];
        let predicted = [0, 1, 0, 1, 2, 2, 2, 0, 2];
        let report = evaluate(&truth, &predicted, &labels()).unwrap();

        let mean = |f: fn(&ClassReport) -> f64| {
            report.classes.iter().map(f).sum::<f64>() / report.classes.len() as f64
        };
        assert!((report.macro_avg.precision - mean(|c| c.precision)).abs() < 1e-6);
        assert!((report.macro_avg.recall - mean(|c| c.recall)).abs() < 1e-6);
        assert!((report.macro_avg.f1 - mean(|c| c.f1)).abs() < 1e-6);
    }

    #[test]
    fn test_never_predicted_class_scores_zero_in_macro() {
        let truth = [0, 1, 2];
        let predicted = [0, 0, 0];
        let report = evaluate(&truth, &predicted, &labels()).unwrap();

        assert!((report.macro_avg.precision - (1.0 / 3.0) / 3.0).abs() < 1e-6);
        assert!((report.macro_avg.recall - 1.0 / 3.0).abs() < 1e-6);
        assert!(report.macro_avg.f1.is_finite());
    }

    #[test]
    fn test_accuracy_percent() {
        let report = evaluate(&[0, 0, 1, 1], &[0, 0, 0, 1], &labels()).unwrap();
        assert_eq!(report.accuracy_percent(), "75.00%");

        let report = evaluate(&[0, 1, 2], &[0, 1, 2], &labels()).unwrap();
        assert_eq!(report.accuracy_percent(), "100.00%");
    }

    #[test]
    fn test_empty_input_scores_zero() {
        let report = evaluate(&[], &[], &labels()).unwrap();
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.macro_avg.f1, 0.0);
        assert_eq!(report.support, 0);
    }
}
