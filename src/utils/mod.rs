//! Utility modules: error taxonomy, logging, checkpointing, and record output.

pub mod checkpoint;
pub mod error;
pub mod logging;
pub mod records;

pub use checkpoint::CheckpointStore;
pub use error::{ExperimentError, Result};
pub use records::{RecordSink, RunSummary, SelectionDump};
