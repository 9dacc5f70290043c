//! # CIFAR Active Learning
//!
//! A Rust implementation of loss-prediction active learning for CIFAR image
//! classification, built on the Burn framework.
//!
//! ## How it works
//!
//! A small loss-prediction module is trained jointly with the backbone
//! classifier through a pairwise ranking objective. Each cycle the remaining
//! unlabeled pool is ranked by predicted loss and the budget's worth of
//! hardest samples gets labeled, growing the training set where the model is
//! weakest.
//!
//! ## Modules
//!
//! - `dataset`: CIFAR binary loading, batching, augmentation, and the
//!   labeled/unlabeled pools
//! - `model`: the backbone classifier and the loss-prediction module
//! - `training`: the joint trainer, scoring, selection policies, and the
//!   active-learning loop
//! - `vae`: variational-autoencoder pretraining of image representations
//! - `utils`: logging, errors, checkpoints, and experiment records
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cifar_al::backend::TrainingBackend;
//! use cifar_al::dataset::{CifarDataset, DatasetKind};
//! use cifar_al::training::{ActiveLearningLoop, ExperimentConfig};
//!
//! let config = ExperimentConfig::default();
//! let train = CifarDataset::load(&config.data_dir, DatasetKind::Cifar10, true)?;
//! let test = CifarDataset::load(&config.data_dir, DatasetKind::Cifar10, false)?;
//!
//! let al = ActiveLearningLoop::<TrainingBackend>::new(config, train, test, Default::default())?;
//! let results = al.run()?;
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;
pub mod vae;

// Re-export commonly used items for convenience
pub use dataset::cifar::{CifarDataset, CifarItem, DatasetKind};
pub use dataset::pool::SamplePool;
pub use dataset::{CifarBatch, CifarBatcher};
pub use model::{Backbone, BackboneConfig, LossNet, LossNetConfig, ModelPair};
pub use training::{
    ActiveLearningLoop, EpochTrainer, Evaluator, ExperimentConfig, RankingLoss, SelectionPolicy,
    TrialResult, UncertaintyRecord, UncertaintyScorer,
};
pub use utils::error::{ExperimentError, Result};
pub use utils::{CheckpointStore, RecordSink};
pub use vae::{Vae, VaeConfig};

/// CIFAR images are 32x32 pixels
pub const IMAGE_SIZE: usize = 32;

/// RGB channels per image
pub const CHANNELS: usize = 3;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
