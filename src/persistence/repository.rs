use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::artifact::ModelArtifact;
use super::store::{ARTIFACT_KEY, FEEDBACK_KEY, METRICS_KEY, PersistentStore, SCHEMA_KEY};
use super::PersistenceError;
use time::OffsetDateTime;

use crate::corpus::CategorySchema;
use crate::feedback::FeedbackLog;
use crate::ml::ClassifierKind;
use crate::ml::metrics::CategoryReport;

/// Metrics document written beside the artifact after each training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub accuracy: f32,
    /// Unix seconds.
    pub trained_at: i64,
    pub sample_count: usize,
    pub version: String,
    pub classifier: ClassifierKind,
    pub categories: Vec<String>,
    #[serde(default)]
    pub per_category: Vec<CategoryReport>,
}

impl ModelMetrics {
    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        Self {
            accuracy: artifact.accuracy,
            trained_at: artifact.trained_at,
            sample_count: artifact.sample_count,
            version: artifact.version.clone(),
            classifier: artifact.classifier(),
            categories: artifact.labels.clone(),
            per_category: artifact.per_category.clone(),
        }
    }
}

/// Key under which an unparseable feedback log is preserved.
pub(crate) fn corrupt_feedback_key(nanos: i128) -> String {
    format!("feedback/log.corrupt-{nanos}.json")
}

/// Typed documents over a [`PersistentStore`].
///
/// Model documents never fail to load: missing or unreadable ones are logged
/// and read as absent so the caller can start cold. The feedback log is the
/// exception, see [`Repository::load_feedback`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn PersistentStore>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store.describe())
            .finish()
    }
}

impl Repository {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    pub fn load_artifact(&self) -> Option<ModelArtifact> {
        let bytes = self.read(ARTIFACT_KEY)?;
        match ModelArtifact::decode(&bytes) {
            Ok(artifact) => {
                tracing::info!(
                    id = %artifact.id,
                    categories = artifact.labels.len(),
                    "Loaded model artifact from {}",
                    self.store.describe()
                );
                Some(artifact)
            }
            Err(err) => {
                tracing::warn!("Ignoring unreadable model artifact: {err}");
                None
            }
        }
    }

    pub fn save_artifact(&self, artifact: &ModelArtifact) -> Result<(), PersistenceError> {
        self.store.put(ARTIFACT_KEY, &artifact.encode()?)
    }

    pub fn load_metrics(&self) -> Option<ModelMetrics> {
        self.read_json(METRICS_KEY)
    }

    pub fn save_metrics(&self, metrics: &ModelMetrics) -> Result<(), PersistenceError> {
        self.write_json(METRICS_KEY, metrics)
    }

    /// Load the feedback log; a missing log is empty.
    ///
    /// An unparseable log is copied to a `feedback/log.corrupt-<nanos>.json`
    /// key and replaced by an empty one. Read failures, and corrupt logs that
    /// cannot be copied aside, are returned as errors with the stored bytes
    /// left untouched.
    pub fn load_feedback(&self) -> Result<FeedbackLog, PersistenceError> {
        let Some(bytes) = self.store.get(FEEDBACK_KEY)? else {
            return Ok(FeedbackLog::new());
        };
        match serde_json::from_slice::<FeedbackLog>(&bytes) {
            Ok(log) => Ok(log.repaired()),
            Err(err) => {
                let key = corrupt_feedback_key(OffsetDateTime::now_utc().unix_timestamp_nanos());
                self.store.put(&key, &bytes)?;
                tracing::warn!("Moved unreadable feedback log to {key}: {err}");
                let log = FeedbackLog::new();
                if let Err(err) = self.save_feedback(&log) {
                    tracing::warn!("Failed to reset feedback log after moving it aside: {err}");
                }
                Ok(log)
            }
        }
    }

    pub fn save_feedback(&self, log: &FeedbackLog) -> Result<(), PersistenceError> {
        self.write_json(FEEDBACK_KEY, log)
    }

    pub fn load_schema(&self) -> Option<CategorySchema> {
        self.read_json(SCHEMA_KEY)
    }

    pub fn save_schema(&self, schema: &CategorySchema) -> Result<(), PersistenceError> {
        self.write_json(SCHEMA_KEY, schema)
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.get(key) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("Failed to read {key} from {}: {err}", self.store.describe());
                None
            }
        }
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.read(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Ignoring unreadable {key}: {err}");
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.store.put(key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CategorySpec;
    use crate::feedback::FeedbackRecord;
    use crate::persistence::MemoryStore;

    fn repo() -> (Arc<MemoryStore>, Repository) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Repository::new(store))
    }

    #[test]
    fn absent_documents_read_as_defaults() {
        let (_, repo) = repo();
        assert!(repo.load_artifact().is_none());
        assert!(repo.load_metrics().is_none());
        assert!(repo.load_schema().is_none());
        assert!(repo.load_feedback().unwrap().is_empty());
    }

    #[test]
    fn garbage_artifact_reads_as_absent() {
        let (store, repo) = repo();
        store.put(ARTIFACT_KEY, b"{broken").unwrap();
        assert!(repo.load_artifact().is_none());
    }

    #[test]
    fn garbage_feedback_log_is_moved_aside() {
        let (store, repo) = repo();
        store.put(FEEDBACK_KEY, b"[[[").unwrap();
        assert!(repo.load_feedback().unwrap().is_empty());

        let moved: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with("feedback/log.corrupt-"))
            .collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(store.get(&moved[0]).unwrap().unwrap(), b"[[[");
        assert!(repo.load_feedback().unwrap().is_empty());
    }

    #[test]
    fn garbage_feedback_log_is_kept_when_it_cannot_be_moved() {
        let (store, repo) = repo();
        store.put(FEEDBACK_KEY, b"[[[").unwrap();
        store.set_reject_writes(true);
        assert!(repo.load_feedback().is_err());
        assert_eq!(store.get(FEEDBACK_KEY).unwrap().unwrap(), b"[[[");
        assert_eq!(store.keys(), vec![FEEDBACK_KEY]);
    }

    #[test]
    fn corrupt_keys_are_valid_store_keys() {
        let (store, _) = repo();
        store.put(&corrupt_feedback_key(1_700_000_000_123_456_789), b"x").unwrap();
    }

    #[test]
    fn feedback_and_schema_round_trip() {
        let (_, repo) = repo();
        let mut log = FeedbackLog::new();
        log.append(FeedbackRecord::new("how much", "pricing", None, 3).unwrap());
        log.mark_consumed();
        repo.save_feedback(&log).unwrap();
        assert_eq!(repo.load_feedback().unwrap(), log);

        let schema = CategorySchema::new().with_category(
            "pricing",
            CategorySpec {
                keywords: vec!["price".into()],
                ..CategorySpec::default()
            },
        );
        repo.save_schema(&schema).unwrap();
        assert_eq!(repo.load_schema(), Some(schema));
    }
}
