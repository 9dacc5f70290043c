//! Variational Autoencoder Pretraining
//!
//! The representation-learning variant: a convolutional VAE trained on the
//! full unlabeled training split. The best-reconstruction snapshot is kept in
//! the checkpoint store so later experiments can start from pretrained
//! features instead of random initialization.

use burn::data::dataloader::batcher::Batcher;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Distribution, ElementConversion};
use burn::nn::{
    conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
    Linear, LinearConfig, PaddingConfig2d, Relu,
};
use tracing::{debug, info};

use crate::dataset::batcher::{CifarBatch, CifarBatcher};
use crate::dataset::cifar::{CifarDataset, CifarItem};
use crate::training::scheduler::PlateauSchedule;
// The crate Result alias stays out of scope here: the `Config` derives below
// expand to code that needs the two-parameter std Result.
use crate::utils::{CheckpointStore, ExperimentError};

/// Checkpoint artifact name for the pretrained autoencoder
pub const VAE_ARTIFACT: &str = "vae";

/// Configuration for the convolutional VAE
#[derive(Config, Debug)]
pub struct VaeConfig {
    /// Size of the latent embedding
    #[config(default = "64")]
    pub embedding_dim: usize,

    /// Filters in the first encoder stage; later stages double it
    #[config(default = "32")]
    pub base_filters: usize,
}

/// Encoder/decoder output bundle
#[derive(Debug, Clone)]
pub struct VaeOutput<B: Backend> {
    /// Reconstruction in normalized image space, same shape as the input
    pub reconstruction: Tensor<B, 4>,
    /// Latent sample fed to the decoder
    pub latent: Tensor<B, 2>,
    pub mu: Tensor<B, 2>,
    pub logvar: Tensor<B, 2>,
}

/// Convolutional VAE over 32x32 RGB images
#[derive(Module, Debug)]
pub struct Vae<B: Backend> {
    enc1: Conv2d<B>,
    enc2: Conv2d<B>,
    enc3: Conv2d<B>,
    mu_head: Linear<B>,
    logvar_head: Linear<B>,
    expand: Linear<B>,
    dec1: ConvTranspose2d<B>,
    dec2: ConvTranspose2d<B>,
    dec3: ConvTranspose2d<B>,
    relu: Relu,
    bottleneck_channels: usize,
}

impl<B: Backend> Vae<B> {
    pub fn new(config: &VaeConfig, device: &B::Device) -> Self {
        let base = config.base_filters;
        // Three stride-2 stages: 32x32 -> 16 -> 8 -> 4.
        let bottleneck_channels = base * 4;
        let flat = bottleneck_channels * 4 * 4;

        let stride2 = |input: usize, output: usize| {
            Conv2dConfig::new([input, output], [3, 3])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        let up2 = |input: usize, output: usize| {
            ConvTranspose2dConfig::new([input, output], [3, 3])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_padding_out([1, 1])
                .init(device)
        };

        Self {
            enc1: stride2(3, base),
            enc2: stride2(base, base * 2),
            enc3: stride2(base * 2, bottleneck_channels),
            mu_head: LinearConfig::new(flat, config.embedding_dim).init(device),
            logvar_head: LinearConfig::new(flat, config.embedding_dim).init(device),
            expand: LinearConfig::new(config.embedding_dim, flat).init(device),
            dec1: up2(bottleneck_channels, base * 2),
            dec2: up2(base * 2, base),
            dec3: up2(base, 3),
            relu: Relu::new(),
            bottleneck_channels,
        }
    }

    fn encode(&self, x: Tensor<B, 4>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let x = self.relu.forward(self.enc1.forward(x));
        let x = self.relu.forward(self.enc2.forward(x));
        let x = self.relu.forward(self.enc3.forward(x));

        let [batch, channels, height, width] = x.dims();
        let flat = x.reshape([batch, channels * height * width]);

        (self.mu_head.forward(flat.clone()), self.logvar_head.forward(flat))
    }

    fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch, _] = latent.dims();
        let x = self.relu.forward(self.expand.forward(latent));
        let x = x.reshape([batch, self.bottleneck_channels, 4, 4]);
        let x = self.relu.forward(self.dec1.forward(x));
        let x = self.relu.forward(self.dec2.forward(x));
        self.dec3.forward(x)
    }

    /// Full pass: encode, sample the latent, decode.
    pub fn forward(&self, x: Tensor<B, 4>) -> VaeOutput<B> {
        let (mu, logvar) = self.encode(x);

        let eps = Tensor::random(mu.shape(), Distribution::Normal(0.0, 1.0), &mu.device());
        let latent = mu.clone() + eps * logvar.clone().mul_scalar(0.5).exp();

        let reconstruction = self.decode(latent.clone());
        VaeOutput {
            reconstruction,
            latent,
            mu,
            logvar,
        }
    }
}

/// Summed reconstruction error plus KL divergence to the unit Gaussian.
pub fn vae_loss<B: Backend>(output: &VaeOutput<B>, input: Tensor<B, 4>) -> Tensor<B, 1> {
    let recon = (output.reconstruction.clone() - input)
        .powf_scalar(2.0)
        .sum();
    let kld = (output.logvar.clone().exp() + output.mu.clone().powf_scalar(2.0)
        - output.logvar.clone()
        - 1.0)
        .sum()
        .mul_scalar(0.5);
    recon + kld
}

/// Pretraining hyperparameters
#[derive(Config, Debug)]
pub struct VaePretrainConfig {
    #[config(default = "100")]
    pub epochs: usize,
    #[config(default = "128")]
    pub batch_size: usize,
    #[config(default = "1e-3")]
    pub lr: f64,
    /// Run the held-out evaluation every this many epochs
    #[config(default = "5")]
    pub eval_every: usize,
    pub vae: VaeConfig,
}

/// Train the VAE, checkpointing whenever the held-out reconstruction loss
/// improves. Returns the best loss seen.
pub fn pretrain<B: AutodiffBackend>(
    config: &VaePretrainConfig,
    train_set: &CifarDataset,
    test_set: &CifarDataset,
    store: &CheckpointStore,
    device: &B::Device,
) -> crate::utils::Result<f32> {
    if config.epochs == 0 || config.batch_size == 0 || config.eval_every == 0 {
        return Err(ExperimentError::Config(
            "pretraining needs positive epochs, batch size and eval interval".into(),
        ));
    }

    let batcher = CifarBatcher::new();
    let mut model = Vae::<B>::new(&config.vae, device);
    let mut optimizer = AdamConfig::new().init();
    let mut schedule = PlateauSchedule::new(config.lr, 0.8, 10, 4);

    let train_items = all_items(train_set);
    let test_items = all_items(test_set);
    let mut best_loss = f32::INFINITY;

    info!(
        epochs = config.epochs,
        train = train_items.len(),
        test = test_items.len(),
        "pretraining autoencoder"
    );

    for epoch in 0..config.epochs {
        let lr = schedule.lr();
        let mut epoch_loss = 0.0f32;
        let mut batches = 0usize;

        for chunk in train_items.chunks(config.batch_size) {
            let batch: CifarBatch<B> = batcher.batch(chunk.to_vec(), device);
            let output = model.forward(batch.images.clone());
            let loss = vae_loss(&output, batch.images);

            let mut grads = loss.backward();
            let grads = GradientsParams::from_module(&mut grads, &model);
            model = optimizer.step(lr, model, grads);

            epoch_loss += loss.into_scalar().elem::<f32>();
            batches += 1;
        }

        let mean_loss = epoch_loss / batches.max(1) as f32;
        schedule.observe(mean_loss as f64);
        debug!(epoch = epoch + 1, loss = mean_loss, lr, "pretrain epoch done");

        if epoch % config.eval_every == config.eval_every - 1 {
            let held_out = reconstruction_loss(&model.valid(), &test_items, &batcher, config.batch_size, device);
            if held_out < best_loss {
                best_loss = held_out;
                store.save(model.clone(), VAE_ARTIFACT, train_set.kind())?;
            }
            info!(
                epoch = epoch + 1,
                loss = held_out,
                best = best_loss,
                "held-out reconstruction"
            );
        }
    }

    Ok(best_loss)
}

fn all_items(dataset: &CifarDataset) -> Vec<CifarItem> {
    use burn::data::dataset::Dataset;
    (0..dataset.len()).filter_map(|i| dataset.get(i)).collect()
}

fn reconstruction_loss<B: Backend>(
    model: &Vae<B>,
    items: &[CifarItem],
    batcher: &CifarBatcher,
    batch_size: usize,
    device: &B::Device,
) -> f32 {
    let mut total = 0.0f32;
    for chunk in items.chunks(batch_size) {
        let batch: CifarBatch<B> = batcher.batch(chunk.to_vec(), device);
        let output = model.forward(batch.images.clone());
        let recon = (output.reconstruction - batch.images)
            .powf_scalar(2.0)
            .sum();
        total += recon.into_scalar().elem::<f32>();
    }
    total
}
