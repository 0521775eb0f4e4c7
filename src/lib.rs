//! Intent classification for small-business chat assistants.
//!
//! Library exports for the CLI, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Confidence bands and the reply policy built on them.
pub mod calibration;
/// TOML service configuration.
pub mod config;
/// Category schemas and synthetic training corpora.
pub mod corpus;
/// Service-level error type.
pub mod error;
/// User corrections and the retrain trigger.
pub mod feedback;
/// Tracing setup.
pub mod logging;
/// Vectorizer, classifiers and the training pipeline.
pub mod ml;
/// Model artifacts and the stores that hold them.
pub mod persistence;
/// The intent service and its collaborators.
pub mod service;
/// Text normalization and feature extraction.
pub mod text;

pub use calibration::{ConfidenceBand, ResponseAction};
pub use config::ServiceConfig;
pub use corpus::{CategorySchema, CategorySpec, TrainingExample};
pub use error::IntentError;
pub use feedback::FeedbackOutcome;
pub use ml::{ClassifierKind, TrainingResult};
pub use service::{IntentService, ModelStatus, PredictionResult, Reply};
