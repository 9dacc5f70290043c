//! Pool Uncertainty Scoring
//!
//! Ranks unlabeled samples by how informative they are expected to be. The
//! standard variant scores each sample with the loss net's predicted loss; the
//! oracle variant peeks at the true label and scores with the actual
//! classification loss, which exists purely to measure how biased the
//! predicted ranking is.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::batcher::{CifarBatch, CifarBatcher};
use crate::dataset::cifar::{CifarDataset, CifarItem};
use crate::model::{Backbone, LossNet};
use crate::training::epoch::per_sample_cross_entropy;
use crate::utils::{ExperimentError, Result};

/// What a sample's uncertainty score is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreVariant {
    /// The loss net's predicted loss (the deployable scorer)
    PredictedLoss,
    /// The true classification loss (oracle, bias analysis only)
    TrueLoss,
}

/// One scored pool sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRecord {
    /// Index of the sample in the full training split
    pub index: usize,
    /// Higher means more informative
    pub score: f32,
    /// True class label, consulted only by class-aware selection
    pub label: usize,
}

/// Scores a set of pool samples without touching model or pool state
#[derive(Debug, Clone)]
pub struct UncertaintyScorer {
    batch_size: usize,
    batcher: CifarBatcher,
}

impl UncertaintyScorer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            batcher: CifarBatcher::new(),
        }
    }

    /// Score the samples at `indices`, returning one record per index in the
    /// same order. Scoring is read-only; calling it twice on the same models
    /// yields the same records.
    pub fn score<B: Backend>(
        &self,
        backbone: &Backbone<B>,
        loss_net: &LossNet<B>,
        dataset: &CifarDataset,
        indices: &[usize],
        variant: ScoreVariant,
        device: &B::Device,
    ) -> Result<Vec<UncertaintyRecord>> {
        let mut records = Vec::with_capacity(indices.len());

        for index_chunk in indices.chunks(self.batch_size) {
            let mut items = Vec::with_capacity(index_chunk.len());
            for &index in index_chunk {
                let item = dataset.get(index).ok_or_else(|| {
                    ExperimentError::InvalidInput(format!(
                        "sample index {index} is outside the dataset"
                    ))
                })?;
                items.push(item);
            }

            let scores = self.score_batch(backbone, loss_net, items, variant, device);
            let scores: Vec<f32> = scores.into_data().to_vec().map_err(|e| {
                ExperimentError::Training(format!("failed to read scores: {e:?}"))
            })?;

            for (&index, score) in index_chunk.iter().zip(scores) {
                let label = dataset.label_of(index).ok_or_else(|| {
                    ExperimentError::InvalidInput(format!(
                        "sample index {index} is outside the dataset"
                    ))
                })?;
                records.push(UncertaintyRecord {
                    index,
                    score,
                    label,
                });
            }
        }

        Ok(records)
    }

    fn score_batch<B: Backend>(
        &self,
        backbone: &Backbone<B>,
        loss_net: &LossNet<B>,
        items: Vec<CifarItem>,
        variant: ScoreVariant,
        device: &B::Device,
    ) -> Tensor<B, 1> {
        let batch: CifarBatch<B> = self.batcher.batch(items, device);
        let (logits, features) = backbone.forward(batch.images);

        match variant {
            ScoreVariant::PredictedLoss => loss_net.forward(features),
            ScoreVariant::TrueLoss => per_sample_cross_entropy(logits, batch.targets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::cifar::{DatasetKind, IMAGE_BYTES};
    use crate::model::{BackboneConfig, LossNetConfig};

    type TestBackend = burn::backend::NdArray;

    fn models(device: &<TestBackend as Backend>::Device) -> (Backbone<TestBackend>, LossNet<TestBackend>) {
        let config = BackboneConfig::new(10).with_base_filters(4);
        let backbone = Backbone::new(&config, device);
        let loss_net = LossNet::new(
            &LossNetConfig::new(config.stage_dims().to_vec()).with_interm_dim(8),
            device,
        );
        (backbone, loss_net)
    }

    fn dataset(n: usize) -> CifarDataset {
        let items = (0..n)
            .map(|i| CifarItem {
                image: vec![(i * 17 % 256) as u8; IMAGE_BYTES],
                label: i % 10,
            })
            .collect();
        CifarDataset::from_items(DatasetKind::Cifar10, items)
    }

    #[test]
    fn test_records_align_with_input_order() {
        let device = Default::default();
        let (backbone, loss_net) = models(&device);
        let dataset = dataset(12);
        let scorer = UncertaintyScorer::new(5);

        let indices = vec![7, 2, 11, 0, 3];
        let records = scorer
            .score(
                &backbone,
                &loss_net,
                &dataset,
                &indices,
                ScoreVariant::PredictedLoss,
                &device,
            )
            .unwrap();

        assert_eq!(records.len(), indices.len());
        for (record, &index) in records.iter().zip(&indices) {
            assert_eq!(record.index, index);
            assert_eq!(record.label, index % 10);
        }
    }

    #[test]
    fn test_scoring_is_repeatable() {
        let device = Default::default();
        let (backbone, loss_net) = models(&device);
        let dataset = dataset(8);
        let scorer = UncertaintyScorer::new(4);
        let indices: Vec<usize> = (0..8).collect();

        let first = scorer
            .score(
                &backbone,
                &loss_net,
                &dataset,
                &indices,
                ScoreVariant::PredictedLoss,
                &device,
            )
            .unwrap();
        let second = scorer
            .score(
                &backbone,
                &loss_net,
                &dataset,
                &indices,
                ScoreVariant::PredictedLoss,
                &device,
            )
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_true_loss_variant_is_positive() {
        let device = Default::default();
        let (backbone, loss_net) = models(&device);
        let dataset = dataset(6);
        let scorer = UncertaintyScorer::new(6);

        let records = scorer
            .score(
                &backbone,
                &loss_net,
                &dataset,
                &[0, 1, 2, 3, 4, 5],
                ScoreVariant::TrueLoss,
                &device,
            )
            .unwrap();

        assert!(records.iter().all(|r| r.score > 0.0));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let device = Default::default();
        let (backbone, loss_net) = models(&device);
        let dataset = dataset(4);
        let scorer = UncertaintyScorer::new(4);

        let result = scorer.score(
            &backbone,
            &loss_net,
            &dataset,
            &[99],
            ScoreVariant::PredictedLoss,
            &device,
        );
        assert!(matches!(result, Err(ExperimentError::InvalidInput(_))));
    }
}
