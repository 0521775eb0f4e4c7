//! Versioned, checksummed model artifact format.
//!
//! On disk an artifact is a single-line JSON header followed by a newline and
//! the JSON payload:
//!
//! ```text
//! {"format":"intentwise-model","formatVersion":1,"sha256":"<hex>","payloadBytes":1234}
//! {"id":"...","version":"...","labels":[...],"pipeline":{...},...}
//! ```
//!
//! The header checksum covers the payload bytes exactly as written.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::PersistenceError;
use crate::ml::metrics::CategoryReport;
use crate::ml::{ClassifierKind, FittedPipeline, TrainingResult};

/// Format tag written into every header.
pub const ARTIFACT_FORMAT: &str = "intentwise-model";
/// Current layout version. Readers reject anything else.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactHeader {
    format: String,
    format_version: u32,
    sha256: String,
    payload_bytes: usize,
}

/// The complete trained state, replaced wholesale on every training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    pub id: Uuid,
    /// Version of the software that trained it.
    pub version: String,
    /// Distinct categories of the training corpus, sorted.
    pub labels: Vec<String>,
    /// Unix seconds.
    pub trained_at: i64,
    pub sample_count: usize,
    /// Held-out accuracy in `[0, 1]`.
    pub accuracy: f32,
    #[serde(default)]
    pub per_category: Vec<CategoryReport>,
    pub pipeline: FittedPipeline,
}

impl ModelArtifact {
    pub fn new(pipeline: FittedPipeline, result: &TrainingResult, trained_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            labels: pipeline.classes.clone(),
            trained_at,
            sample_count: result.sample_count,
            accuracy: result.accuracy,
            per_category: result.per_category.clone(),
            pipeline,
        }
    }

    pub fn classifier(&self) -> ClassifierKind {
        self.pipeline.kind()
    }

    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.labels != self.pipeline.classes {
            return Err(PersistenceError::Corrupt(
                "label set does not match the classifier".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.accuracy) {
            return Err(PersistenceError::Corrupt(format!(
                "accuracy {} out of range",
                self.accuracy
            )));
        }
        self.pipeline
            .validate()
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, PersistenceError> {
        let payload = serde_json::to_vec(self)?;
        let header = ArtifactHeader {
            format: ARTIFACT_FORMAT.to_string(),
            format_version: ARTIFACT_FORMAT_VERSION,
            sha256: sha256_hex(&payload),
            payload_bytes: payload.len(),
        };
        let mut out = serde_json::to_vec(&header)?;
        out.push(b'\n');
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Parse and verify an encoded artifact.
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let split = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| PersistenceError::Corrupt("missing artifact header".into()))?;
        let (header_bytes, rest) = bytes.split_at(split);
        let payload = &rest[1..];
        let header: ArtifactHeader = serde_json::from_slice(header_bytes)
            .map_err(|err| PersistenceError::Corrupt(format!("unreadable header: {err}")))?;
        if header.format != ARTIFACT_FORMAT {
            return Err(PersistenceError::Corrupt(format!(
                "unknown format '{}'",
                header.format
            )));
        }
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedFormat {
                found: header.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if payload.len() != header.payload_bytes {
            return Err(PersistenceError::Corrupt(format!(
                "payload is {} bytes, header says {}",
                payload.len(),
                header.payload_bytes
            )));
        }
        if sha256_hex(payload) != header.sha256.to_ascii_lowercase() {
            return Err(PersistenceError::Corrupt("checksum mismatch".into()));
        }
        let artifact: ModelArtifact = serde_json::from_slice(payload)?;
        artifact.validate()?;
        Ok(artifact)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
