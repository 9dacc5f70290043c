//! Model module: the backbone classifier, the loss-prediction module, and the
//! typed model/optimizer pairs the active-learning loop trains jointly.

pub mod backbone;
pub mod lossnet;
pub mod pair;

pub use backbone::{Backbone, BackboneConfig, ConvBlock};
pub use lossnet::{LossNet, LossNetConfig};
pub use pair::{sgd_pair, ModelPair, OptimizerPair, SgdSettings};
