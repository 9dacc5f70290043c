//! Pairwise Ranking Loss
//!
//! The loss-prediction module is not trained to regress the exact loss value;
//! it only has to get the ordering right. Samples in a batch are paired first
//! with last, second with second-to-last, and so on, and each pair contributes
//! a margin hinge penalty whenever the predicted ordering disagrees with the
//! ordering of the true losses.

use burn::prelude::*;

use crate::utils::{ExperimentError, Result};

/// Default hinge margin
pub const DEFAULT_MARGIN: f32 = 1.0;

/// How the per-pair penalties are reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingReduction {
    /// Average over the pairs, yielding a scalar tensor
    Mean,
    /// Keep one penalty per pair
    Elementwise,
}

/// Margin-based pairwise ranking loss over a batch of loss predictions
#[derive(Debug, Clone)]
pub struct RankingLoss {
    pub margin: f32,
}

impl Default for RankingLoss {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN)
    }
}

impl RankingLoss {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    /// Compute the ranking loss between predicted and true per-sample losses.
    ///
    /// Both tensors must share the same even length `N`; sample `i` is paired
    /// with sample `N - 1 - i`, giving `N / 2` pairs. With `Mean` the result
    /// is a single-element tensor, with `Elementwise` one element per pair.
    ///
    /// The true losses are detached so the ranking objective only drives the
    /// loss-prediction module, never the backbone.
    pub fn forward<B: Backend>(
        &self,
        predicted: Tensor<B, 1>,
        target: Tensor<B, 1>,
        reduction: RankingReduction,
    ) -> Result<Tensor<B, 1>> {
        let n = predicted.dims()[0];
        if n != target.dims()[0] {
            return Err(ExperimentError::InvalidInput(format!(
                "predicted and target lengths differ: {} vs {}",
                n,
                target.dims()[0]
            )));
        }
        if n == 0 || n % 2 != 0 {
            return Err(ExperimentError::InvalidInput(format!(
                "ranking loss needs a non-empty even batch, got {n}"
            )));
        }

        let half = n / 2;
        let device = predicted.device();
        let target = target.detach();

        let reversed_idx: Vec<i64> = (0..n as i64).rev().collect();
        let reversed_idx = Tensor::<B, 1, Int>::from_data(TensorData::new(reversed_idx, [n]), &device);

        let predicted_rev = predicted.clone().select(0, reversed_idx.clone());
        let target_rev = target.clone().select(0, reversed_idx);

        let delta_predicted =
            predicted.slice([0..half]) - predicted_rev.slice([0..half]);
        let delta_target = target.slice([0..half]) - target_rev.slice([0..half]);

        // +1 where the first of the pair has the larger (or equal) true loss,
        // -1 otherwise
        let sign = delta_target
            .greater_equal_elem(0.0)
            .float()
            .mul_scalar(2.0)
            .sub_scalar(1.0);

        let per_pair = (delta_predicted * sign)
            .neg()
            .add_scalar(self.margin)
            .clamp_min(0.0);

        Ok(match reduction {
            RankingReduction::Mean => per_pair.mean(),
            // The select/slice chain leaves a strided view; force a
            // contiguous buffer so callers can read the per-pair values.
            // A scalar identity op is not enough: ndarray applies it in
            // place on the oversized slice buffer. Cat always reallocates.
            RankingReduction::Elementwise => Tensor::cat(vec![per_pair], 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tensor(values: Vec<f32>) -> Tensor<TestBackend, 1> {
        let n = values.len();
        Tensor::from_data(TensorData::new(values, [n]), &Default::default())
    }

    #[test]
    fn test_rejects_odd_batch() {
        let loss = RankingLoss::default();
        let result = loss.forward(
            tensor(vec![1.0, 2.0, 3.0]),
            tensor(vec![0.1, 0.2, 0.3]),
            RankingReduction::Mean,
        );
        assert!(matches!(result, Err(ExperimentError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let loss = RankingLoss::default();
        let result = loss.forward(tensor(vec![]), tensor(vec![]), RankingReduction::Mean);
        assert!(matches!(result, Err(ExperimentError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let loss = RankingLoss::default();
        let result = loss.forward(
            tensor(vec![1.0, 2.0]),
            tensor(vec![0.1, 0.2, 0.3, 0.4]),
            RankingReduction::Mean,
        );
        assert!(matches!(result, Err(ExperimentError::InvalidInput(_))));
    }

    #[test]
    fn test_known_values() {
        // Pairs (0,3) and (1,2):
        //   pair 0: true 0.5 vs 0.1 -> s=+1, predicted 1.0 vs 3.0,
        //           max(0, 1 - (1.0 - 3.0)) = 3.0
        //   pair 1: true 0.2 vs 0.9 -> s=-1, predicted 2.0 vs 0.5,
        //           max(0, 1 + (2.0 - 0.5)) = 2.5
        let loss = RankingLoss::default();
        let predicted = tensor(vec![1.0, 2.0, 0.5, 3.0]);
        let target = tensor(vec![0.5, 0.2, 0.9, 0.1]);

        let per_pair = loss
            .forward(
                predicted.clone(),
                target.clone(),
                RankingReduction::Elementwise,
            )
            .unwrap();
        let values: Vec<f32> = per_pair.into_data().to_vec().unwrap();
        assert_eq!(values.len(), 2);
        assert!((values[0] - 3.0).abs() < 1e-5);
        assert!((values[1] - 2.5).abs() < 1e-5);

        let mean = loss
            .forward(predicted, target, RankingReduction::Mean)
            .unwrap();
        let mean: Vec<f32> = mean.into_data().to_vec().unwrap();
        assert!((mean[0] - 2.75).abs() < 1e-5);
    }

    #[test]
    fn test_penalties_never_negative() {
        let loss = RankingLoss::new(0.5);
        let per_pair = loss
            .forward(
                tensor(vec![10.0, -4.0, 3.5, 0.0, -2.0, 7.0]),
                tensor(vec![0.1, 0.9, 0.5, 0.4, 0.2, 0.8]),
                RankingReduction::Elementwise,
            )
            .unwrap();
        let values: Vec<f32> = per_pair.into_data().to_vec().unwrap();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_elementwise_values_readable() {
        // Pairs (0,5), (1,4), (2,3):
        //   pair 0: s=+1, gap -2.5 -> 3.5
        //   pair 1: s=-1, gap  1.5 -> 2.5
        //   pair 2: s=+1, gap  3.0 -> 0.0
        let loss = RankingLoss::default();
        let per_pair = loss
            .forward(
                tensor(vec![1.0, 2.0, 3.0, 0.0, 0.5, 3.5]),
                tensor(vec![0.9, 0.1, 0.5, 0.5, 0.2, 0.3]),
                RankingReduction::Elementwise,
            )
            .unwrap();

        assert_eq!(per_pair.dims(), [3]);
        let values: Vec<f32> = per_pair.into_data().to_vec().unwrap();
        assert!((values[0] - 3.5).abs() < 1e-5);
        assert!((values[1] - 2.5).abs() < 1e-5);
        assert!(values[2].abs() < 1e-5);
    }

    #[test]
    fn test_tied_targets_count_as_positive_sign() {
        // Equal true losses take the +1 branch, so the hinge rewards the
        // first element of the pair being predicted at least margin higher.
        let loss = RankingLoss::default();

        let satisfied = loss
            .forward(
                tensor(vec![2.0, 1.0]),
                tensor(vec![0.3, 0.3]),
                RankingReduction::Mean,
            )
            .unwrap();
        let satisfied: Vec<f32> = satisfied.into_data().to_vec().unwrap();
        assert!(satisfied[0].abs() < 1e-5);

        let violated = loss
            .forward(
                tensor(vec![1.0, 2.0]),
                tensor(vec![0.3, 0.3]),
                RankingReduction::Mean,
            )
            .unwrap();
        let violated: Vec<f32> = violated.into_data().to_vec().unwrap();
        assert!((violated[0] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_correct_confident_ordering_costs_nothing() {
        // Pairs (0,3) and (1,2) both predict the harder sample higher by
        // more than the margin, so neither pair is penalized.
        let loss = RankingLoss::default();
        let mean = loss
            .forward(
                tensor(vec![5.0, 5.0, 0.0, 0.0]),
                tensor(vec![0.9, 0.9, 0.1, 0.1]),
                RankingReduction::Mean,
            )
            .unwrap();
        let mean: Vec<f32> = mean.into_data().to_vec().unwrap();
        assert!(mean[0].abs() < 1e-5);
    }
}
