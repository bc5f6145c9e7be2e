//! Train/test split of the accepted samples.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Upper bound on the smoke-test subset taken in 100%-train mode.
pub const SMOKE_TEST_MAX: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
    /// `true` when every sample is trained on and `test` is a subset of `train`.
    pub full_train: bool,
}

/// Size of the held-in test subset in 100%-train mode:
/// `min(max(1, n / 20), 10)`.
pub fn smoke_test_size(n: usize) -> usize {
    (n / 20).max(1).min(SMOKE_TEST_MAX)
}

/// Number of training samples for `train_percent < 100`, clamped so that at
/// least one sample is left for testing.
pub fn split_index(n: usize, train_percent: f64) -> usize {
    let split = ((n as f64) * train_percent / 100.0).floor() as usize;
    if split >= n { n.saturating_sub(1) } else { split }
}

/// Shuffles `items` uniformly and splits them by `train_percent`.
pub fn partition<T: Clone, R: Rng + ?Sized>(mut items: Vec<T>, train_percent: f64, rng: &mut R) -> Result<Partition<T>> {
    if items.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    items.shuffle(rng);
    let n = items.len();

    if train_percent >= 100.0 {
        let test = items[..smoke_test_size(n)].to_vec();
        info!(train = n, test = test.len(), "100% train mode, test samples are also trained on");
        return Ok(Partition { train: items, test, full_train: true });
    }

    let split = split_index(n, train_percent);
    let test = items.split_off(split);
    info!(train = items.len(), test = test.len(), "dataset split");
    Ok(Partition { train: items, test, full_train: false })
}

/// Same as [`partition`] with a ChaCha generator seeded from `seed`.
pub fn partition_seeded<T: Clone>(items: Vec<T>, train_percent: f64, seed: u64) -> Result<Partition<T>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    partition(items, train_percent, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_train_mode_uses_subset_as_test() {
        let items: Vec<u32> = (0..40).collect();
        let part = partition_seeded(items, 100.0, 1).unwrap();
        assert!(part.full_train);
        assert_eq!(part.train.len(), 40);
        assert_eq!(part.test.len(), 2);
        assert!(part.test.iter().all(|t| part.train.contains(t)));
        assert_eq!(part.test[..], part.train[..2]);
    }

    #[test]
    fn smoke_test_size_bounds() {
        assert_eq!(smoke_test_size(1), 1);
        assert_eq!(smoke_test_size(19), 1);
        assert_eq!(smoke_test_size(40), 2);
        assert_eq!(smoke_test_size(199), 9);
        assert_eq!(smoke_test_size(1000), 10);
    }

    #[test]
    fn ninety_percent_of_twenty() {
        let part = partition_seeded((0..20).collect::<Vec<u32>>(), 90.0, 3).unwrap();
        assert_eq!(part.train.len(), 18);
        assert_eq!(part.test.len(), 2);
        assert!(!part.full_train);

        let mut all: Vec<u32> = part.train.iter().chain(part.test.iter()).copied().collect();
        all.sort();
        assert_eq!(all, (0..20).collect::<Vec<u32>>());
    }

    #[test]
    fn single_sample_goes_to_test() {
        let part = partition_seeded(vec!["only"], 90.0, 0).unwrap();
        assert!(part.train.is_empty());
        assert_eq!(part.test, vec!["only"]);
    }

    #[test]
    fn split_is_clamped_below_n() {
        assert_eq!(split_index(20, 90.0), 18);
        assert_eq!(split_index(12, 83.34), 10);
        assert_eq!(split_index(10, 99.99), 9);
        assert_eq!(split_index(1, 90.0), 0);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = partition_seeded(Vec::<u32>::new(), 90.0, 0).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn same_seed_same_split() {
        let items: Vec<u32> = (0..50).collect();
        let a = partition_seeded(items.clone(), 80.0, 42).unwrap();
        let b = partition_seeded(items.clone(), 80.0, 42).unwrap();
        assert_eq!(a, b);
        let c = partition_seeded(items, 80.0, 43).unwrap();
        assert_ne!(a.train, c.train);
    }
}
