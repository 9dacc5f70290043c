//! Test-Set Evaluation
//!
//! Top-1 accuracy of the backbone over a held-out item list. Evaluation runs
//! on the non-autodiff backend; the loop hands in `backbone.valid()`.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use burn::tensor::ElementConversion;

use crate::dataset::batcher::{CifarBatch, CifarBatcher};
use crate::dataset::cifar::CifarItem;
use crate::model::Backbone;
use crate::utils::{ExperimentError, Result};

/// Computes classification accuracy over batched items
#[derive(Debug, Clone)]
pub struct Evaluator {
    batch_size: usize,
    batcher: CifarBatcher,
}

impl Evaluator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            batcher: CifarBatcher::new(),
        }
    }

    /// Top-1 accuracy in percent over `items`.
    pub fn accuracy<B: Backend>(
        &self,
        backbone: &Backbone<B>,
        items: &[CifarItem],
        device: &B::Device,
    ) -> Result<f32> {
        if items.is_empty() {
            return Err(ExperimentError::InvalidInput(
                "cannot evaluate on an empty item list".into(),
            ));
        }

        let mut correct = 0usize;
        for chunk in items.chunks(self.batch_size) {
            let batch: CifarBatch<B> = self.batcher.batch(chunk.to_vec(), device);
            let (logits, _) = backbone.forward(batch.images);

            let [n, _] = logits.dims();
            let predictions = logits.argmax(1).reshape([n]);
            let hits = predictions.equal(batch.targets).int().sum();
            correct += hits.into_scalar().elem::<i64>() as usize;
        }

        Ok(100.0 * correct as f32 / items.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::cifar::IMAGE_BYTES;
    use crate::model::BackboneConfig;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_rejects_empty_items() {
        let device = Default::default();
        let backbone =
            Backbone::<TestBackend>::new(&BackboneConfig::new(10).with_base_filters(4), &device);
        let evaluator = Evaluator::new(8);

        let result = evaluator.accuracy(&backbone, &[], &device);
        assert!(matches!(result, Err(ExperimentError::InvalidInput(_))));
    }

    #[test]
    fn test_accuracy_is_a_percentage() {
        let device = Default::default();
        let backbone =
            Backbone::<TestBackend>::new(&BackboneConfig::new(10).with_base_filters(4), &device);
        let evaluator = Evaluator::new(4);

        let items: Vec<CifarItem> = (0..10)
            .map(|i| CifarItem {
                image: vec![(i * 25) as u8; IMAGE_BYTES],
                label: i % 10,
            })
            .collect();

        let accuracy = evaluator.accuracy(&backbone, &items, &device).unwrap();
        assert!((0.0..=100.0).contains(&accuracy));
    }
}
