//! Model and Optimizer Pairs
//!
//! Strongly-typed bundles of the jointly-trained backbone and loss-prediction
//! module, together with their independently stepped SGD optimizers. Each
//! model owns its parameters; the loop reconstructs both (and their
//! optimizers) at cycle start unless warm starting is enabled.

use std::marker::PhantomData;

use burn::optim::momentum::MomentumConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::model::backbone::{Backbone, BackboneConfig};
use crate::model::lossnet::{LossNet, LossNetConfig};

/// The two jointly-trained models
#[derive(Debug)]
pub struct ModelPair<B: AutodiffBackend> {
    pub backbone: Backbone<B>,
    pub loss_net: LossNet<B>,
}

impl<B: AutodiffBackend> ModelPair<B> {
    /// Construct a fresh pair with randomly initialized parameters. The loss
    /// net's input dimensions are derived from the backbone's stage widths.
    pub fn new(backbone_config: &BackboneConfig, interm_dim: usize, device: &B::Device) -> Self {
        let backbone = Backbone::new(backbone_config, device);
        let lossnet_config = LossNetConfig::new(backbone_config.stage_dims().to_vec())
            .with_interm_dim(interm_dim);
        let loss_net = LossNet::new(&lossnet_config, device);

        Self { backbone, loss_net }
    }
}

/// SGD hyperparameters shared by both optimizers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdSettings {
    pub momentum: f64,
    pub weight_decay: f64,
}

impl Default for SgdSettings {
    fn default() -> Self {
        Self {
            momentum: 0.9,
            weight_decay: 5e-4,
        }
    }
}

/// One optimizer per model, stepped independently from a single backward pass
pub struct OptimizerPair<B, OB, OL>
where
    B: AutodiffBackend,
    OB: Optimizer<Backbone<B>, B>,
    OL: Optimizer<LossNet<B>, B>,
{
    pub backbone: OB,
    pub loss_net: OL,
    _backend: PhantomData<B>,
}

/// Fresh SGD optimizers for a fresh model pair.
pub fn sgd_pair<B: AutodiffBackend>(
    settings: &SgdSettings,
) -> OptimizerPair<B, impl Optimizer<Backbone<B>, B>, impl Optimizer<LossNet<B>, B>> {
    let config = SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new().with_momentum(settings.momentum),
        ))
        .with_weight_decay(Some(WeightDecayConfig::new(settings.weight_decay as f32)));

    OptimizerPair {
        backbone: config.init(),
        loss_net: config.init(),
        _backend: PhantomData,
    }
}
