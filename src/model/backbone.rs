//! Backbone Classifier
//!
//! A compact convolutional classifier for 32x32 CIFAR images. Besides the
//! class logits, the forward pass exposes one pooled feature vector per
//! convolutional stage; the loss-prediction module consumes that feature list
//! to estimate the per-sample classification loss.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the backbone classifier
#[derive(Config, Debug)]
pub struct BackboneConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Number of filters in the first stage; later stages double it
    #[config(default = "32")]
    pub base_filters: usize,
}

impl BackboneConfig {
    /// Channel widths of the four stages, in forward order. The loss net's
    /// input dimensions must match these.
    pub fn stage_dims(&self) -> [usize; 4] {
        let base = self.base_filters;
        [base, base * 2, base * 4, base * 8]
    }
}

/// A convolutional block: Conv2d -> BatchNorm -> ReLU -> MaxPool(2x2)
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Four-stage convolutional backbone with per-stage feature taps
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    stage1: ConvBlock<B>,
    stage2: ConvBlock<B>,
    stage3: ConvBlock<B>,
    stage4: ConvBlock<B>,
    global_pool: AdaptiveAvgPool2d,
    classifier: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> Backbone<B> {
    pub fn new(config: &BackboneConfig, device: &B::Device) -> Self {
        let [d1, d2, d3, d4] = config.stage_dims();

        let stage1 = ConvBlock::new(config.in_channels, d1, device);
        let stage2 = ConvBlock::new(d1, d2, device);
        let stage3 = ConvBlock::new(d2, d3, device);
        let stage4 = ConvBlock::new(d3, d4, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let classifier = LinearConfig::new(d4, config.num_classes).init(device);

        Self {
            stage1,
            stage2,
            stage3,
            stage4,
            global_pool,
            classifier,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass.
    ///
    /// Returns the class logits `[batch, num_classes]` and one globally pooled
    /// feature vector per stage, shallow to deep, each `[batch, channels]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> (Tensor<B, 2>, Vec<Tensor<B, 2>>) {
        let x1 = self.stage1.forward(x);
        let x2 = self.stage2.forward(x1.clone());
        let x3 = self.stage3.forward(x2.clone());
        let x4 = self.stage4.forward(x3.clone());

        let features = vec![
            self.pool_features(x1),
            self.pool_features(x2),
            self.pool_features(x3),
            self.pool_features(x4.clone()),
        ];

        let pooled = self.pool_features(x4);
        let logits = self.classifier.forward(pooled);

        (logits, features)
    }

    fn pool_features(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.global_pool.forward(x);
        let [batch, channels, _, _] = x.dims();
        x.reshape([batch, channels])
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let config = BackboneConfig::new(10).with_base_filters(8);
        let model = Backbone::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let (logits, features) = model.forward(input);

        assert_eq!(logits.dims(), [2, 10]);
        assert_eq!(features.len(), 4);
        for (feature, dim) in features.iter().zip(config.stage_dims()) {
            assert_eq!(feature.dims(), [2, dim]);
        }
    }
}
