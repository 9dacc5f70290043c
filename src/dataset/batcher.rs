//! Burn Batcher for CIFAR
//!
//! Assembles raw CIFAR items into normalized image/target tensors. The same
//! batcher serves training, evaluation, and pool scoring; augmentation happens
//! on the raw items before batching.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::dataset::cifar::CifarItem;
use crate::{CHANNELS, IMAGE_SIZE};

/// Per-channel CIFAR pixel statistics used for normalization
pub const CIFAR_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];
pub const CIFAR_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

/// A batch of CIFAR images for training or inference
#[derive(Clone, Debug)]
pub struct CifarBatch<B: Backend> {
    /// Images with shape [batch_size, 3, 32, 32], channel-normalized
    pub images: Tensor<B, 4>,
    /// True labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher converting items to normalized tensors
#[derive(Clone, Debug, Default)]
pub struct CifarBatcher;

impl CifarBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, CifarItem, CifarBatch<B>> for CifarBatcher {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> CifarBatch<B> {
        let batch_size = items.len();

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().map(|&p| p as f32 / 255.0))
            .collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );

        // Broadcast (x - mean) / std per channel
        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(CIFAR_MEAN.to_vec(), [1, CHANNELS, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(CIFAR_STD.to_vec(), [1, CHANNELS, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets_data, [batch_size]),
            device,
        );

        CifarBatch { images, targets }
    }
}
