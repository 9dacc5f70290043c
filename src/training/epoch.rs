//! Joint Epoch Trainer
//!
//! Runs one training epoch over the labeled items: a single forward pass
//! through the backbone feeds both the classification objective and the
//! loss-prediction module, and a single backward pass is split into per-model
//! gradients so each optimizer steps its own parameters.

use burn::data::dataloader::batcher::Batcher;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use tracing::trace;

use crate::dataset::batcher::{CifarBatch, CifarBatcher};
use crate::dataset::cifar::CifarItem;
use crate::model::{Backbone, LossNet, ModelPair, OptimizerPair};
use crate::training::ranking::{RankingLoss, RankingReduction};
use crate::utils::Result;

/// Hyperparameters of the joint training step
#[derive(Debug, Clone)]
pub struct EpochSettings {
    /// Mini-batch size
    pub batch_size: usize,
    /// Hinge margin of the ranking loss
    pub ranking_margin: f32,
    /// Weight of the ranking term in the combined objective
    pub ranking_weight: f32,
    /// After this epoch the loss net trains on detached features, so the
    /// ranking gradient no longer reaches the backbone
    pub detach_after_epoch: usize,
}

impl Default for EpochSettings {
    fn default() -> Self {
        Self {
            batch_size: 128,
            ranking_margin: 1.0,
            ranking_weight: 1.0,
            detach_after_epoch: 120,
        }
    }
}

/// Averaged losses observed over one epoch
#[derive(Debug, Clone, Default)]
pub struct EpochStats {
    pub batches: usize,
    pub total_loss: f32,
    pub classification_loss: f32,
    pub ranking_loss: f32,
}

/// Trains the backbone and loss net jointly, one epoch at a time
#[derive(Debug, Clone)]
pub struct EpochTrainer {
    settings: EpochSettings,
    ranking: RankingLoss,
    batcher: CifarBatcher,
}

impl EpochTrainer {
    pub fn new(settings: EpochSettings) -> Self {
        let ranking = RankingLoss::new(settings.ranking_margin);
        Self {
            settings,
            ranking,
            batcher: CifarBatcher::new(),
        }
    }

    /// Run one epoch over `items`, consuming and returning the model pair.
    ///
    /// Items should already be shuffled and augmented by the caller. A
    /// trailing odd-sized batch loses its last item, since the pairwise
    /// ranking loss needs an even batch.
    pub fn train_epoch<B, OB, OL>(
        &self,
        mut pair: ModelPair<B>,
        optimizers: &mut OptimizerPair<B, OB, OL>,
        items: &[CifarItem],
        epoch: usize,
        lr: f64,
        device: &B::Device,
    ) -> Result<(ModelPair<B>, EpochStats)>
    where
        B: AutodiffBackend,
        OB: Optimizer<Backbone<B>, B>,
        OL: Optimizer<LossNet<B>, B>,
    {
        let mut stats = EpochStats::default();
        let detach_features = epoch > self.settings.detach_after_epoch;

        for chunk in items.chunks(self.settings.batch_size) {
            let chunk = if chunk.len() % 2 == 1 {
                &chunk[..chunk.len() - 1]
            } else {
                chunk
            };
            if chunk.is_empty() {
                continue;
            }

            let batch: CifarBatch<B> = self.batcher.batch(chunk.to_vec(), device);

            let (logits, features) = pair.backbone.forward(batch.images);
            let ce = per_sample_cross_entropy(logits, batch.targets);

            let features = if detach_features {
                features.into_iter().map(Tensor::detach).collect()
            } else {
                features
            };
            let predicted = pair.loss_net.forward(features);

            let ranking =
                self.ranking
                    .forward(predicted, ce.clone(), RankingReduction::Mean)?;
            let classification = ce.mean();
            let total = classification.clone()
                + ranking.clone().mul_scalar(self.settings.ranking_weight);

            let mut grads = total.backward();
            let backbone_grads = GradientsParams::from_module(&mut grads, &pair.backbone);
            let lossnet_grads = GradientsParams::from_module(&mut grads, &pair.loss_net);

            pair.backbone = optimizers.backbone.step(lr, pair.backbone, backbone_grads);
            pair.loss_net = optimizers.loss_net.step(lr, pair.loss_net, lossnet_grads);

            stats.batches += 1;
            stats.total_loss += total.into_scalar().elem::<f32>();
            stats.classification_loss += classification.into_scalar().elem::<f32>();
            stats.ranking_loss += ranking.into_scalar().elem::<f32>();
        }

        if stats.batches > 0 {
            let n = stats.batches as f32;
            stats.total_loss /= n;
            stats.classification_loss /= n;
            stats.ranking_loss /= n;
        }

        trace!(
            epoch,
            batches = stats.batches,
            total = stats.total_loss,
            classification = stats.classification_loss,
            ranking = stats.ranking_loss,
            "epoch finished"
        );

        Ok((pair, stats))
    }
}

/// Cross entropy without reduction, one loss value per sample.
pub fn per_sample_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    let log_probs = log_softmax(logits, 1);
    let picked = log_probs.gather(1, targets.reshape([batch, 1]));
    picked.reshape([batch]).neg()
}
