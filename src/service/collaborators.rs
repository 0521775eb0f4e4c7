//! Interfaces to the systems around the classifier.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corpus::CategorySchema;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid schema {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FallbackError {
    #[error("Fallback service failed: {0}")]
    Failed(String),
    #[error("Fallback service returned an empty reply")]
    EmptyReply,
}

/// Supplies the current category schema.
pub trait KnowledgeSchemaProvider: Send + Sync {
    fn schema(&self) -> Result<CategorySchema, SchemaError>;
}

/// Reads the schema from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct JsonFileSchemaProvider {
    path: PathBuf,
}

impl JsonFileSchemaProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeSchemaProvider for JsonFileSchemaProvider {
    fn schema(&self) -> Result<CategorySchema, SchemaError> {
        let bytes = std::fs::read(&self.path).map_err(|source| SchemaError::Read {
            path: self.path.clone(),
            source,
        })?;
        CategorySchema::from_json_slice(&bytes).map_err(|source| SchemaError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One earlier message of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generates a free-text reply when the classifier is not confident.
pub trait GenerativeFallbackService: Send + Sync {
    fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        user_text: &str,
    ) -> Result<String, FallbackError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn json_provider_reads_and_reports_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowledge.json");
        let provider = JsonFileSchemaProvider::new(&path);
        assert!(matches!(provider.schema(), Err(SchemaError::Read { .. })));

        std::fs::write(&path, "{oops").unwrap();
        assert!(matches!(provider.schema(), Err(SchemaError::Parse { .. })));

        std::fs::write(&path, r#"{"pricing": {"keywords": ["price"], "responses": []}}"#).unwrap();
        let schema = provider.schema().unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(provider.path(), path.as_path());
    }
}
