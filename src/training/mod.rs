//! Training module: the joint trainer, the ranking objective, pool scoring
//! and selection, and the active-learning loop tying them together.

pub mod cycle;
pub mod epoch;
pub mod evaluate;
pub mod ranking;
pub mod scheduler;
pub mod scoring;
pub mod selection;

pub use cycle::{ActiveLearningLoop, ExperimentConfig, TrialResult};
pub use epoch::{EpochSettings, EpochStats, EpochTrainer};
pub use evaluate::Evaluator;
pub use ranking::{RankingLoss, RankingReduction};
pub use scheduler::{LrSchedule, PlateauSchedule};
pub use scoring::{ScoreVariant, UncertaintyRecord, UncertaintyScorer};
pub use selection::SelectionPolicy;
