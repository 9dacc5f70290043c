//! Error Handling Module
//!
//! Defines custom error types for the active-learning experiment crate.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Main error type for active-learning operations
#[derive(Error, Debug)]
pub enum ExperimentError {
    /// Configuration error (bad dataset name, malformed budget/quota parameters).
    /// Fatal, raised before any cycle starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input reaching a component (odd ranking-loss batch, mismatched
    /// tensor lengths). Treated as an invariant violation, not recoverable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error loading or parsing dataset files
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Labeled/unlabeled index-set invariant violation
    #[error("Pool error: {0}")]
    Pool(String),

    /// A request exceeded what the remaining pool can provide
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Error during training or checkpointing
    #[error("Training error: {0}")]
    Training(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for active-learning operations
pub type Result<T> = std::result::Result<T, ExperimentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExperimentError::Config("budget must be positive".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: budget must be positive"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ExperimentError = io.into();
        assert!(matches!(err, ExperimentError::Io(_)));
    }
}
