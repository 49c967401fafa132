//! Weighted depth-1 decision tree, the boosting weak learner
//!
//! Splits minimise the weighted Gini impurity of the two children. Features
//! are scanned in column order and thresholds in ascending value order; a
//! candidate replaces the current best only when strictly better, and leaf
//! classes resolve ties to the lowest index. Fitting the same data twice
//! therefore yields the same stump.

use super::boosting::argmax;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Impurity gains smaller than this are treated as ties
const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// `x[feature] <= threshold` goes left, everything else right
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStump {
    feature: usize,
    threshold: f64,
    left: usize,
    right: usize,
}

impl DecisionStump {
    /// Fit on `x` with class indices `y` and non-negative sample `weights`.
    ///
    /// `orders[f]` lists the row indices sorted by feature `f`, ties broken
    /// by row index. A stump that cannot improve on its root predicts the
    /// root's majority class on both sides.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<usize>,
        weights: &Array1<f64>,
        n_classes: usize,
        orders: &[Vec<usize>],
    ) -> Self {
        let mut totals = vec![0.0; n_classes];
        for (&class, &w) in y.iter().zip(weights) {
            totals[class] += w;
        }
        let total: f64 = totals.iter().sum();
        let root = argmax(totals.iter().copied());

        let mut best = Self {
            feature: 0,
            threshold: 0.0,
            left: root,
            right: root,
        };
        let mut best_impurity = gini(&totals, total);

        let mut left = vec![0.0; n_classes];
        let mut right = vec![0.0; n_classes];
        for (feature, order) in orders.iter().enumerate() {
            left.iter_mut().for_each(|w| *w = 0.0);
            let mut left_total = 0.0;

            for pair in order.windows(2) {
                let (row, next) = (pair[0], pair[1]);
                left[y[row]] += weights[row];
                left_total += weights[row];

                let (here, there) = (x[[row, feature]], x[[next, feature]]);
                if here >= there {
                    continue;
                }

                for ((r, &t), &l) in right.iter_mut().zip(&totals).zip(&left) {
                    *r = t - l;
                }
                let right_total = total - left_total;
                let impurity = gini(&left, left_total) + gini(&right, right_total);

                if impurity < best_impurity - MIN_IMPURITY_DECREASE {
                    best_impurity = impurity;
                    best = Self {
                        feature,
                        threshold: here + (there - here) / 2.0,
                        left: argmax(left.iter().copied()),
                        right: argmax(right.iter().copied()),
                    };
                }
            }
        }

        best
    }

    pub fn feature(&self) -> usize {
        self.feature
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Largest class index either leaf can return
    pub fn max_class(&self) -> usize {
        self.left.max(self.right)
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        if row[self.feature] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<usize> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Row indices sorted by each feature column, ties in row order
pub fn feature_orders(x: &Array2<f64>) -> Vec<Vec<usize>> {
    x.columns()
        .into_iter()
        .map(|column| {
            let mut order: Vec<usize> = (0..column.len()).collect();
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            order
        })
        .collect()
}

/// Weighted Gini impurity of one node, scaled by the node's weight
fn gini(class_weights: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    total - class_weights.iter().map(|w| w * w).sum::<f64>() / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn uniform(n: usize) -> Array1<f64> {
        Array1::from_elem(n, 1.0 / n as f64)
    }

    #[test]
    fn test_splits_on_the_separating_feature() {
        // Feature 0 is noise, feature 1 separates the classes between 2 and 8
        let x = array![[5.0, 1.0], [1.0, 2.0], [4.0, 8.0], [2.0, 9.0]];
        let y = array![0, 0, 1, 1];
        let stump = DecisionStump::fit(&x, &y, &uniform(4), 2, &feature_orders(&x));

        assert_eq!(stump.feature(), 1);
        assert_eq!(stump.threshold(), 5.0);
        assert_eq!(stump.predict(&x), y);
    }

    #[test]
    fn test_weights_move_the_split() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0, 1, 0, 1];
        let orders = feature_orders(&x);

        let heavy_tail = array![0.05, 0.05, 0.45, 0.45];
        let stump = DecisionStump::fit(&x, &y, &heavy_tail, 2, &orders);
        assert_eq!(stump.threshold(), 2.5);
        assert_eq!(stump.predict_row(x.row(3)), 1);
    }

    #[test]
    fn test_constant_feature_predicts_majority() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![2, 1, 2];
        let stump = DecisionStump::fit(&x, &y, &uniform(3), 3, &feature_orders(&x));

        assert_eq!(stump.predict(&x), array![2, 2, 2]);
        assert_eq!(stump.max_class(), 2);
    }

    #[test]
    fn test_ties_resolve_to_lowest_class() {
        let x = array![[1.0], [1.0]];
        let y = array![1, 0];
        let stump = DecisionStump::fit(&x, &y, &uniform(2), 2, &feature_orders(&x));
        assert_eq!(stump.predict_row(x.row(0)), 0);
    }

    #[test]
    fn test_equal_values_are_never_split() {
        let x = array![[0.0], [1.0], [1.0], [2.0]];
        let y = array![0, 0, 1, 1];
        let stump = DecisionStump::fit(&x, &y, &uniform(4), 2, &feature_orders(&x));
        assert!(stump.threshold() == 0.5 || stump.threshold() == 1.5);
    }

    #[test]
    fn test_fit_is_repeatable() {
        let x = array![[0.3, 2.0], [0.1, 1.0], [0.7, 1.0], [0.9, 3.0], [0.5, 2.0]];
        let y = array![0, 0, 1, 1, 2];
        let weights = array![0.1, 0.3, 0.2, 0.2, 0.2];
        let orders = feature_orders(&x);

        let first = DecisionStump::fit(&x, &y, &weights, 3, &orders);
        for _ in 0..20 {
            assert_eq!(DecisionStump::fit(&x, &y, &weights, 3, &orders), first);
        }
    }
}
