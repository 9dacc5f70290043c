//! Labeled / Unlabeled Sample Pools
//!
//! Owns the two disjoint index sets at the heart of the active-learning loop.
//! The pools are created once per trial from a seeded shuffle of the training
//! index universe, then mutated only by `promote`: the labeled set grows, the
//! unlabeled pool shrinks, and their union stays constant.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::cifar::CifarDataset;
use crate::utils::error::{ExperimentError, Result};

/// The labeled/unlabeled split over a training set's index universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplePool {
    labeled: Vec<usize>,
    unlabeled: Vec<usize>,
    universe: usize,
}

impl SamplePool {
    /// Random split: shuffle `0..universe` and take the first `initial_labeled`
    /// indices as the seed labeled set.
    pub fn split(universe: usize, initial_labeled: usize, rng: &mut ChaCha8Rng) -> Result<Self> {
        if initial_labeled == 0 || initial_labeled > universe {
            return Err(ExperimentError::Config(format!(
                "initial labeled count {} must be in 1..={}",
                initial_labeled, universe
            )));
        }

        let mut indices: Vec<usize> = (0..universe).collect();
        indices.shuffle(rng);

        let unlabeled = indices.split_off(initial_labeled);
        Ok(Self {
            labeled: indices,
            unlabeled,
            universe,
        })
    }

    pub fn labeled(&self) -> &[usize] {
        &self.labeled
    }

    pub fn unlabeled(&self) -> &[usize] {
        &self.unlabeled
    }

    /// Size of the full index universe (labeled + unlabeled, constant)
    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Move the selected indices from the unlabeled pool into the labeled set.
    ///
    /// Fails without mutating anything if the selection contains duplicates or
    /// indices that are not currently unlabeled, or exceeds the pool size.
    pub fn promote(&mut self, selected: &[usize]) -> Result<()> {
        if selected.len() > self.unlabeled.len() {
            return Err(ExperimentError::ResourceExhausted(format!(
                "cannot promote {} samples from a pool of {}",
                selected.len(),
                self.unlabeled.len()
            )));
        }

        let requested: HashSet<usize> = selected.iter().copied().collect();
        if requested.len() != selected.len() {
            return Err(ExperimentError::Pool(
                "selection contains duplicate indices".to_string(),
            ));
        }

        let pool: HashSet<usize> = self.unlabeled.iter().copied().collect();
        if let Some(&missing) = selected.iter().find(|idx| !pool.contains(idx)) {
            return Err(ExperimentError::Pool(format!(
                "selected index {} is not in the unlabeled pool",
                missing
            )));
        }

        self.unlabeled.retain(|idx| !requested.contains(idx));
        self.labeled.extend(selected.iter().copied());

        debug_assert_eq!(self.labeled.len() + self.unlabeled.len(), self.universe);
        Ok(())
    }

    /// Per-class counts of the current labeled set's true labels.
    pub fn label_counts(&self, dataset: &CifarDataset) -> Vec<usize> {
        let mut counts = vec![0usize; dataset.num_classes()];
        for &idx in &self.labeled {
            if let Some(label) = dataset.label_of(idx) {
                counts[label] += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pool(universe: usize, labeled: usize, seed: u64) -> SamplePool {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        SamplePool::split(universe, labeled, &mut rng).unwrap()
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let pool = pool(100, 20, 7);
        assert_eq!(pool.labeled().len(), 20);
        assert_eq!(pool.unlabeled().len(), 80);

        let labeled: HashSet<usize> = pool.labeled().iter().copied().collect();
        let unlabeled: HashSet<usize> = pool.unlabeled().iter().copied().collect();
        assert!(labeled.is_disjoint(&unlabeled));
        assert_eq!(labeled.len() + unlabeled.len(), 100);
    }

    #[test]
    fn test_split_is_seed_deterministic() {
        let a = pool(50, 10, 42);
        let b = pool(50, 10, 42);
        assert_eq!(a.labeled(), b.labeled());
        assert_eq!(a.unlabeled(), b.unlabeled());
    }

    #[test]
    fn test_promote_moves_indices() {
        let mut pool = pool(30, 5, 1);
        let picked: Vec<usize> = pool.unlabeled()[..3].to_vec();

        pool.promote(&picked).unwrap();

        assert_eq!(pool.labeled().len(), 8);
        assert_eq!(pool.unlabeled().len(), 22);
        for idx in &picked {
            assert!(pool.labeled().contains(idx));
            assert!(!pool.unlabeled().contains(idx));
        }
    }

    #[test]
    fn test_promote_rejects_labeled_index() {
        let mut pool = pool(30, 5, 1);
        let already_labeled = pool.labeled()[0];
        let before = pool.clone();

        let err = pool.promote(&[already_labeled]).unwrap_err();
        assert!(matches!(err, ExperimentError::Pool(_)));
        // Failed promote leaves both sets untouched.
        assert_eq!(pool.labeled(), before.labeled());
        assert_eq!(pool.unlabeled(), before.unlabeled());
    }

    #[test]
    fn test_promote_rejects_duplicates() {
        let mut pool = pool(30, 5, 1);
        let idx = pool.unlabeled()[0];
        assert!(pool.promote(&[idx, idx]).is_err());
    }

    #[test]
    fn test_promote_rejects_oversized_selection() {
        let mut pool = pool(10, 8, 1);
        let selection: Vec<usize> = (0..10).collect();
        let err = pool.promote(&selection).unwrap_err();
        assert!(matches!(err, ExperimentError::ResourceExhausted(_)));
    }

    #[test]
    fn test_zero_initial_labeled_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(SamplePool::split(10, 0, &mut rng).is_err());
        assert!(SamplePool::split(10, 11, &mut rng).is_err());
    }
}
