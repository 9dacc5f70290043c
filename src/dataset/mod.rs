//! Dataset module: CIFAR binary loading, batching, augmentation, and the
//! labeled/unlabeled sample pools driving active learning.

pub mod augmentation;
pub mod batcher;
pub mod cifar;
pub mod pool;

pub use batcher::{CifarBatch, CifarBatcher};
pub use cifar::{CifarDataset, CifarItem, DatasetKind};
pub use pool::SamplePool;
