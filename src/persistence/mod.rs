//! Durable state: the model artifact, training metrics, the feedback log and
//! the last schema used for training.
//!
//! Backends implement the byte-oriented [`PersistentStore`]; [`Repository`]
//! layers typed documents over it.

use std::path::PathBuf;

use thiserror::Error;

pub mod artifact;
pub(crate) mod fs_store;
mod memory_store;
mod repository;
mod sqlite_store;
mod store;

pub use artifact::{ARTIFACT_FORMAT_VERSION, ModelArtifact};
pub use fs_store::FsStore;
pub use memory_store::MemoryStore;
pub use repository::{ModelMetrics, Repository};
pub use sqlite_store::SqliteStore;
pub use store::{ARTIFACT_KEY, FEEDBACK_KEY, METRICS_KEY, PersistentStore, SCHEMA_KEY};

/// Errors raised while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Corrupt artifact: {0}")]
    Corrupt(String),
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
