/// Cumulative iteration thresholds, one per epoch.
///
/// Entry `e` (0-based) is `floor((e + 1) * dataset_size / batch_size)`: the
/// total number of batches that must have been consumed when epoch `e + 1`
/// ends. Built once and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochSchedule {
    thresholds: Vec<usize>,
}

impl EpochSchedule {
    /// # Panics
    /// Panics if `batch_size == 0`.
    pub fn new(num_epochs: usize, dataset_size: usize, batch_size: usize) -> EpochSchedule {
        EpochSchedule { thresholds: epoch_iters(num_epochs, dataset_size, batch_size) }
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Cumulative threshold for 0-based `epoch`.
    pub fn threshold(&self, epoch: usize) -> usize {
        self.thresholds[epoch]
    }

    /// Batches belonging to 0-based `epoch` alone.
    pub fn segment_len(&self, epoch: usize) -> usize {
        let prev = if epoch == 0 { 0 } else { self.thresholds[epoch - 1] };
        self.thresholds[epoch] - prev
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.thresholds
    }
}

/// `floor(i * dataset_size / batch_size)` for `i = 1..=num_epochs`, computed
/// in integer arithmetic so the floor is exact.
pub fn epoch_iters(num_epochs: usize, dataset_size: usize, batch_size: usize) -> Vec<usize> {
    assert!(batch_size > 0, "batch_size must be at least 1");
    (1..=num_epochs)
        .map(|i| (i as u128 * dataset_size as u128 / batch_size as u128) as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn evenly_divisible_split() {
        assert_eq!(epoch_iters(3, 100, 10), vec![10, 20, 30]);
        assert_eq!(epoch_iters(3, 300, 10), vec![30, 60, 90]);
    }

    #[test]
    fn fractional_batches_per_epoch_floor() {
        // 2.5 batches per epoch.
        assert_eq!(epoch_iters(4, 25, 10), vec![2, 5, 7, 10]);
        let s = EpochSchedule::new(4, 25, 10);
        assert_eq!(s.segment_len(0), 2);
        assert_eq!(s.segment_len(1), 3);
        assert_eq!(s.segment_len(2), 2);
    }

    #[test]
    fn dataset_smaller_than_batch_gives_zero_length_epochs() {
        assert_eq!(epoch_iters(5, 5, 10), vec![0, 1, 1, 2, 2]);
        let s = EpochSchedule::new(5, 5, 10);
        assert_eq!(s.segment_len(0), 0);
        assert_eq!(s.segment_len(2), 0);
    }

    #[test]
    fn zero_epochs_is_empty() {
        assert!(EpochSchedule::new(0, 100, 10).is_empty());
    }

    proptest! {
        #[test]
        fn prop_strictly_increasing_when_batch_fits(
            num_epochs in 1usize..50,
            batch_size in 1usize..64,
            extra in 0usize..5000,
        ) {
            let dataset_size = batch_size + extra;
            let iters = epoch_iters(num_epochs, dataset_size, batch_size);
            prop_assert_eq!(iters.len(), num_epochs);
            for (i, &t) in iters.iter().enumerate() {
                prop_assert_eq!(t, (i + 1) * dataset_size / batch_size);
            }
            for w in iters.windows(2) {
                prop_assert!(w[0] < w[1]);
            }
        }

        #[test]
        fn prop_non_decreasing_for_any_size(
            num_epochs in 1usize..50,
            batch_size in 1usize..64,
            dataset_size in 0usize..200,
        ) {
            let iters = epoch_iters(num_epochs, dataset_size, batch_size);
            for w in iters.windows(2) {
                prop_assert!(w[0] <= w[1]);
            }
        }
    }
}
