//! Stratified train / held-out split

use super::TrainError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices of each side of the split, in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so every class keeps its share on both sides.
///
/// Each class holds out `round(count * test_size)` members, at least one
/// and never all of them.
pub fn stratified_split(
    targets: &[usize],
    classes: &[String],
    test_size: f64,
    rng: &mut StdRng,
) -> Result<Split, TrainError> {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (class, name) in classes.iter().enumerate() {
        let mut members: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t == class)
            .map(|(i, _)| i)
            .collect();

        if members.len() < 2 {
            return Err(TrainError::ClassTooSmall {
                class: name.clone(),
                count: members.len(),
            });
        }

        members.shuffle(rng);
        let held_out = ((members.len() as f64 * test_size).round() as usize)
            .clamp(1, members.len() - 1);

        test.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}
