//! Seeded, stratified train/test split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Indices of the training and held-out rows, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows so each class contributes `test_fraction` of its rows (rounded)
/// to the test side, keeping at least one row of every class for training.
pub fn stratified_split(
    labels: &[usize],
    n_classes: usize,
    test_fraction: f32,
    seed: u64,
) -> SplitIndices {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &label) in labels.iter().enumerate() {
        if let Some(rows) = by_class.get_mut(label) {
            rows.push(row);
        }
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for mut rows in by_class {
        if rows.is_empty() {
            continue;
        }
        rows.shuffle(&mut rng);
        let wanted = (rows.len() as f32 * fraction).round() as usize;
        let n_test = wanted.min(rows.len() - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}
