//! Synthetic minority oversampling (SMOTE)
//!
//! Brings every class up to the majority-class count by interpolating
//! between a class member and one of its nearest same-class neighbours.
//! Only ever applied to the training split.

use super::TrainError;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

/// Default neighbourhood size
pub const DEFAULT_K_NEIGHBORS: usize = 5;

/// Oversample `x`/`y` so every class has as many rows as the largest one.
///
/// Original rows come first, in their original order, followed by the
/// synthetic rows grouped by class. A class with a single member cannot be
/// interpolated and is replicated instead.
pub fn oversample(
    x: &Array2<f64>,
    y: &Array1<usize>,
    n_classes: usize,
    k_neighbors: usize,
    rng: &mut StdRng,
) -> Result<(Array2<f64>, Array1<usize>), TrainError> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &class) in y.iter().enumerate() {
        if class < n_classes {
            members[class].push(i);
        }
    }

    let target = members.iter().map(Vec::len).max().unwrap_or(0);
    let mut rows: Vec<f64> = x.iter().copied().collect();
    let mut targets: Vec<usize> = y.to_vec();

    for (class, idx) in members.iter().enumerate() {
        let need = target - idx.len();
        if need == 0 || idx.is_empty() {
            continue;
        }

        if idx.len() == 1 {
            warn!(
                class,
                need, "Class has a single training member, replicating instead of interpolating"
            );
            for _ in 0..need {
                rows.extend(x.row(idx[0]).iter().copied());
                targets.push(class);
            }
            continue;
        }

        let k = k_neighbors.min(idx.len() - 1).max(1);
        let neighbours = nearest_neighbours(x, idx, k);

        for _ in 0..need {
            let pick = rng.gen_range(0..idx.len());
            let nn = neighbours[pick][rng.gen_range(0..k)];
            let gap: f64 = rng.gen();

            let base = x.row(idx[pick]);
            let other = x.row(nn);
            rows.extend(
                base.iter()
                    .zip(other.iter())
                    .map(|(a, b)| a + gap * (b - a)),
            );
            targets.push(class);
        }

        debug!(class, synthesized = need, k, "Oversampled class");
    }

    let features = Array2::from_shape_vec((targets.len(), x.ncols()), rows)?;
    Ok((features, Array1::from(targets)))
}

/// For each member, the indices of its `k` nearest other members
fn nearest_neighbours(x: &Array2<f64>, members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .iter()
        .map(|&i| {
            let mut distances: Vec<(f64, usize)> = members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| (squared_distance(x.row(i), x.row(j)), j))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn imbalanced() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_vec(
            (7, 2),
            vec![
                0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.5, 0.5, // class 0
                10.0, 10.0, 12.0, 12.0, // class 1
            ],
        )
        .unwrap();
        let y = Array1::from(vec![0, 0, 0, 0, 0, 1, 1]);
        (x, y)
    }

    #[test]
    fn test_classes_are_balanced() {
        let (x, y) = imbalanced();
        let (xr, yr) = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(xr.nrows(), 10);
        assert_eq!(yr.iter().filter(|&&c| c == 0).count(), 5);
        assert_eq!(yr.iter().filter(|&&c| c == 1).count(), 5);
    }

    #[test]
    fn test_original_rows_come_first() {
        let (x, y) = imbalanced();
        let (xr, yr) = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(xr.slice(ndarray::s![..7, ..]), x);
        assert_eq!(yr.slice(ndarray::s![..7]), y);
    }

    #[test]
    fn test_synthetic_points_lie_between_neighbours() {
        let (x, y) = imbalanced();
        let (xr, _) = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(3)).unwrap();

        // Class 1 members are (10,10) and (12,12); every synthetic point is on that segment
        for row in xr.slice(ndarray::s![7.., ..]).rows() {
            assert!((10.0..=12.0).contains(&row[0]));
            assert!((row[0] - row[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let (x, y) = imbalanced();
        let a = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_singleton_class_is_replicated() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 9.0]).unwrap();
        let y = Array1::from(vec![0, 0, 0, 1]);
        let (xr, yr) = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(yr.iter().filter(|&&c| c == 1).count(), 3);
        assert!(xr.slice(ndarray::s![4.., 0]).iter().all(|&v| v == 9.0));
    }

    #[test]
    fn test_balanced_input_is_unchanged() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 5.0, 6.0]).unwrap();
        let y = Array1::from(vec![0, 0, 1, 1]);
        let (xr, yr) = oversample(&x, &y, 2, 5, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!((xr, yr), (x, y));
    }
}
