//! Loss-Prediction Module
//!
//! Maps the backbone's per-stage feature vectors to a single scalar predicted
//! loss per sample. Trained jointly with the backbone through the pairwise
//! ranking objective; its output ranks the unlabeled pool at selection time.

use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig, Relu},
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the loss-prediction module
#[derive(Config, Debug)]
pub struct LossNetConfig {
    /// Channel width of each backbone stage tap, shallow to deep
    pub feature_dims: Vec<usize>,

    /// Width each tap is projected to before concatenation
    #[config(default = "128")]
    pub interm_dim: usize,
}

/// Predicts one scalar loss per sample from a list of stage features
#[derive(Module, Debug)]
pub struct LossNet<B: Backend> {
    projections: Vec<Linear<B>>,
    relu: Relu,
    combine: Linear<B>,
}

impl<B: Backend> LossNet<B> {
    pub fn new(config: &LossNetConfig, device: &B::Device) -> Self {
        let projections = config
            .feature_dims
            .iter()
            .map(|&dim| LinearConfig::new(dim, config.interm_dim).init(device))
            .collect::<Vec<_>>();

        let combine =
            LinearConfig::new(config.interm_dim * config.feature_dims.len(), 1).init(device);

        Self {
            projections,
            relu: Relu::new(),
            combine,
        }
    }

    /// Forward pass: features `[batch, dim_i]` per stage -> predicted loss `[batch]`.
    ///
    /// The feature list must match the configured stage count and order.
    pub fn forward(&self, features: Vec<Tensor<B, 2>>) -> Tensor<B, 1> {
        debug_assert_eq!(features.len(), self.projections.len());

        let projected: Vec<Tensor<B, 2>> = features
            .into_iter()
            .zip(self.projections.iter())
            .map(|(feature, projection)| self.relu.forward(projection.forward(feature)))
            .collect();

        let combined = Tensor::cat(projected, 1);
        let out = self.combine.forward(combined);

        let [batch, _] = out.dims();
        out.reshape([batch])
    }
}
