use thiserror::Error;

use crate::config::ConfigError;
use crate::feedback::FeedbackError;
use crate::ml::MlError;
use crate::persistence::PersistenceError;
use crate::service::{FallbackError, SchemaError};

/// Errors surfaced by [`crate::IntentService`].
#[derive(Debug, Error)]
pub enum IntentError {
    /// Nothing usable to train on.
    #[error("Insufficient training data: {reason}")]
    InsufficientData { reason: String },
    #[error("Training failed: {0}")]
    Training(MlError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Fallback(#[from] FallbackError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(#[from] FeedbackError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The training thread has stopped or could not be reached.
    #[error("Training worker is not running")]
    WorkerUnavailable,
    #[error("Failed to start training worker: {0}")]
    WorkerSpawn(std::io::Error),
}

impl From<MlError> for IntentError {
    fn from(err: MlError) -> Self {
        match err {
            MlError::EmptyDataset | MlError::EmptyVocabulary => IntentError::InsufficientData {
                reason: err.to_string(),
            },
            other => IntentError::Training(other),
        }
    }
}
