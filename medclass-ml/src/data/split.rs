//! Reproducible train/test partitioning.

use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Row indices of the two partitions, each in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n` with `seed` and hold out `ceil(n * test_ratio)` rows.
    ///
    /// The held-out count is clamped to `[1, n - 1]` so both partitions are
    /// non-empty, which requires at least two rows.
    pub fn new(n: usize, test_ratio: f64, seed: u64) -> Result<Self, MlError> {
        if n < 2 {
            return Err(MlError::dataset(format!(
                "At least 2 documents are needed for a train/test split, got {n}"
            )));
        }
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(MlError::config(format!(
                "test_ratio must be in (0, 1), got {test_ratio}"
            )));
        }

        let test_len = ((n as f64 * test_ratio).ceil() as usize).clamp(1, n - 1);
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let mut test = order[..test_len].to_vec();
        let mut train = order[test_len..].to_vec();
        test.sort_unstable();
        train.sort_unstable();
        Ok(Self { train, test })
    }

    /// Clone the elements of `items` selected by `indices`.
    pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
        indices.iter().map(|&i| items[i].clone()).collect()
    }
}
