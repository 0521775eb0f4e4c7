//! The intent service: the single handle a host process owns.
//!
//! Lifecycle: [`IntentService::open`] loads the persisted artifact (or starts
//! untrained), the feedback log and the last training schema, and starts the
//! training thread. [`IntentService::shutdown`] saves state and stops the
//! thread. Predictions read an immutable snapshot of the live artifact and
//! never wait on training.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

mod collaborators;
mod worker;

pub use collaborators::{
    ChatRole, ChatTurn, FallbackError, GenerativeFallbackService, JsonFileSchemaProvider,
    KnowledgeSchemaProvider, SchemaError,
};

use crate::calibration::{ConfidenceBand, ResponseAction, response_action};
use crate::config::{ServiceConfig, StorageBackend};
use crate::corpus::{CategorySchema, CorpusBuilder, TrainingExample};
use crate::error::IntentError;
use crate::feedback::{FeedbackLog, FeedbackOutcome, FeedbackRecord};
use crate::ml::{ClassificationPipeline, ClassifierKind, TrainingResult};
use crate::persistence::{FsStore, ModelMetrics, PersistentStore, Repository, SqliteStore};
use crate::text::{FeatureSet, extract_features};
use worker::{ModelSlot, Trainer};

/// Category reported when there is no usable prediction.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Outcome of classifying one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub category: String,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub band: ConfidenceBand,
    pub features: FeatureSet,
}

impl PredictionResult {
    fn unknown(features: FeatureSet) -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            confidence: 0.0,
            band: ConfidenceBand::VeryLow,
            features,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY && self.confidence == 0.0
    }
}

/// User-facing reply with the prediction that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub text: String,
    pub follow_up: Option<String>,
    pub prediction: PredictionResult,
    pub fallback_used: bool,
    /// Set when the fallback was attempted and failed.
    pub fallback_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMetrics {
    pub accuracy: f32,
    /// RFC 3339, UTC.
    pub trained_at: String,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub is_trained: bool,
    pub metrics: Option<StatusMetrics>,
    pub categories: Vec<String>,
    pub pending_feedback_count: usize,
    /// Feedback records kept in the log.
    pub training_example_count: usize,
    pub version: Option<String>,
    pub classifier: Option<ClassifierKind>,
}

/// Build the store selected by the storage settings.
pub fn open_store(config: &ServiceConfig) -> Result<Arc<dyn PersistentStore>, IntentError> {
    let dir = config.storage.resolve_dir()?;
    Ok(match config.storage.backend {
        StorageBackend::Filesystem => Arc::new(FsStore::new(dir)),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(SqliteStore::default_path(&dir))?),
    })
}

struct FeedbackState {
    log: FeedbackLog,
    /// False when the stored log could not be read; it is never overwritten.
    writable: bool,
    /// Changes not yet in the store.
    dirty: bool,
}

/// Log counters readable without waiting on the feedback lock.
#[derive(Debug, Default)]
struct FeedbackCounts {
    pending: AtomicUsize,
    total: AtomicUsize,
}

impl FeedbackCounts {
    fn record(&self, log: &FeedbackLog) {
        self.pending.store(log.pending_count(), Ordering::Release);
        self.total.store(log.len(), Ordering::Release);
    }
}

pub struct IntentService {
    config: ServiceConfig,
    builder: CorpusBuilder,
    repository: Repository,
    slot: Arc<ModelSlot>,
    trainer: Trainer,
    /// Held across a triggered retrain so feedback submissions serialize.
    feedback: Mutex<FeedbackState>,
    counts: FeedbackCounts,
    last_schema: Mutex<Option<CategorySchema>>,
    fallback: Option<Arc<dyn GenerativeFallbackService>>,
}

impl std::fmt::Debug for IntentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentService")
            .field("store", &self.repository.describe())
            .field("trained", &self.slot.snapshot().is_some())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl IntentService {
    /// Load persisted state from `store` and start the training thread.
    /// A missing or unreadable artifact starts the service untrained. A
    /// feedback log that cannot be read is left as it is: new feedback then
    /// stays in memory for the session.
    pub fn open(config: ServiceConfig, store: Arc<dyn PersistentStore>) -> Result<Self, IntentError> {
        let repository = Repository::new(store);
        let artifact = repository.load_artifact();
        if artifact.is_none() {
            tracing::info!("No usable model artifact; starting untrained");
        }
        let (log, writable) = match repository.load_feedback() {
            Ok(log) => (log, true),
            Err(err) => {
                tracing::warn!("Feedback log unreadable; it will not be overwritten: {err}");
                (FeedbackLog::new(), false)
            }
        };
        let counts = FeedbackCounts::default();
        counts.record(&log);
        let last_schema = repository.load_schema();
        let slot = Arc::new(ModelSlot::new(artifact));
        let trainer = Trainer::spawn(
            ClassificationPipeline::new(config.pipeline_options()),
            repository.clone(),
            Arc::clone(&slot),
        )?;
        Ok(Self {
            builder: config.corpus_builder(),
            config,
            repository,
            slot,
            trainer,
            feedback: Mutex::new(FeedbackState {
                log,
                writable,
                dirty: false,
            }),
            counts,
            last_schema: Mutex::new(last_schema),
            fallback: None,
        })
    }

    /// Open with the store named by the configuration.
    pub fn open_configured(config: ServiceConfig) -> Result<Self, IntentError> {
        let store = open_store(&config)?;
        Self::open(config, store)
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn GenerativeFallbackService>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Train from a schema's synthetic corpus.
    pub fn train(&self, schema: &CategorySchema) -> Result<TrainingResult, IntentError> {
        self.train_with(schema, &[])
    }

    /// Train from a schema's synthetic corpus plus extra examples. Either may
    /// be empty, but not both. A non-empty schema is remembered for later
    /// feedback retrains.
    pub fn train_with(
        &self,
        schema: &CategorySchema,
        additional: &[TrainingExample],
    ) -> Result<TrainingResult, IntentError> {
        let mut corpus = self.builder.build(schema);
        corpus.extend_from_slice(additional);
        if corpus.is_empty() {
            return Err(IntentError::InsufficientData {
                reason: "schema and additional examples are both empty".to_string(),
            });
        }
        let report = self.trainer.train(corpus)?;
        if !schema.is_empty() {
            self.remember_schema(schema);
        }
        Ok(report.result)
    }

    fn remember_schema(&self, schema: &CategorySchema) {
        if let Err(err) = self.repository.save_schema(schema) {
            tracing::warn!("Failed to save training schema: {err}");
        }
        match self.last_schema.lock() {
            Ok(mut slot) => *slot = Some(schema.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(schema.clone()),
        }
    }

    /// Classify an utterance. Never fails: an untrained service or input
    /// with no content yields `("unknown", 0.0)`.
    pub fn predict(&self, text: &str) -> PredictionResult {
        let features = extract_features(text);
        let Some(artifact) = self.slot.snapshot() else {
            return PredictionResult::unknown(features);
        };
        let Some((category, confidence)) = artifact.pipeline.predict(text) else {
            return PredictionResult::unknown(features);
        };
        tracing::debug!(%category, confidence, "Predicted intent");
        PredictionResult {
            band: ConfidenceBand::from_confidence(confidence),
            category,
            confidence,
            features,
        }
    }

    /// Record a correction, retraining synchronously once more than the
    /// configured threshold of records are pending.
    pub fn submit_feedback(
        &self,
        text: &str,
        correct_category: &str,
        satisfaction: Option<f32>,
    ) -> Result<FeedbackOutcome, IntentError> {
        let record = FeedbackRecord::new(text, correct_category, satisfaction, now_unix())?;
        let mut state = self.lock_feedback();
        state.log.append(record);
        state.dirty = true;
        self.counts.record(&state.log);
        let mut persisted = self.flush_feedback(&mut state);

        let mut outcome = FeedbackOutcome {
            recorded: true,
            persisted,
            retrained: false,
            retrain_result: None,
            retrain_error: None,
            pending_count: state.log.pending_count(),
        };
        if !state.log.retrain_due(self.config.feedback.retrain_threshold) {
            return Ok(outcome);
        }

        tracing::info!(
            pending = state.log.pending_count(),
            "Feedback threshold exceeded; retraining"
        );
        let mut corpus = state.log.training_examples();
        if self.config.feedback.union_schema_on_retrain
            && let Some(schema) = self.last_schema()
        {
            corpus.extend(self.builder.build(&schema));
        }
        match self.trainer.train(corpus) {
            Ok(report) => {
                state.log.mark_consumed();
                state.dirty = true;
                self.counts.record(&state.log);
                persisted = self.flush_feedback(&mut state) && persisted;
                outcome.retrained = true;
                outcome.retrain_result = Some(report.result);
            }
            Err(err) => {
                tracing::warn!("Feedback retrain failed: {err}");
                outcome.retrain_error = Some(err.to_string());
            }
        }
        outcome.persisted = persisted;
        outcome.pending_count = state.log.pending_count();
        Ok(outcome)
    }

    fn lock_feedback(&self) -> MutexGuard<'_, FeedbackState> {
        match self.feedback.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn flush_feedback(&self, state: &mut FeedbackState) -> bool {
        if !state.writable {
            tracing::warn!("Feedback kept in memory only; the stored log could not be read");
            return false;
        }
        match self.repository.save_feedback(&state.log) {
            Ok(()) => {
                state.dirty = false;
                true
            }
            Err(err) => {
                tracing::warn!("Failed to save feedback log: {err}");
                false
            }
        }
    }

    fn last_schema(&self) -> Option<CategorySchema> {
        match self.last_schema.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn status(&self) -> ModelStatus {
        let artifact = self.slot.snapshot();
        let pending = self.counts.pending.load(Ordering::Acquire);
        let total = self.counts.total.load(Ordering::Acquire);
        ModelStatus {
            is_trained: artifact.is_some(),
            metrics: artifact.as_ref().map(|artifact| StatusMetrics {
                accuracy: artifact.accuracy,
                trained_at: format_timestamp(artifact.trained_at),
                sample_count: artifact.sample_count,
            }),
            categories: artifact
                .as_ref()
                .map(|artifact| artifact.labels.clone())
                .unwrap_or_default(),
            pending_feedback_count: pending,
            training_example_count: total,
            version: artifact.as_ref().map(|artifact| artifact.version.clone()),
            classifier: artifact.as_ref().map(|artifact| artifact.classifier()),
        }
    }

    /// The metrics document written by the last successful training run.
    pub fn last_metrics(&self) -> Option<ModelMetrics> {
        self.repository.load_metrics()
    }

    /// Compose a reply: the category's first canned response when the
    /// prediction clears the lookup bar, otherwise the default response, then
    /// the confidence-band policy (fallback or hedge).
    pub fn respond(&self, text: &str, schema: &CategorySchema, history: &[ChatTurn]) -> Reply {
        let prediction = self.predict(text);
        let settings = &self.config.responses;
        let matched = if prediction.confidence > settings.lookup_min_confidence {
            schema
                .get(&prediction.category)
                .and_then(|spec| spec.first_response().map(|r| (r, spec.first_follow_up())))
        } else {
            None
        };
        let (mut reply_text, follow_up) = match matched {
            Some((response, follow_up)) => (response.to_string(), follow_up.map(str::to_string)),
            None => (settings.default_response.clone(), None),
        };

        let mut fallback_used = false;
        let mut fallback_error = None;
        let hedge = |response: &str| format!("{} {}", settings.hedge_prefix, response.to_lowercase());
        match (
            response_action(prediction.band, self.fallback.is_some()),
            &self.fallback,
        ) {
            (ResponseAction::Fallback, Some(fallback)) => {
                match fallback
                    .complete(&settings.fallback_system_prompt, history, text)
                    .and_then(|reply| {
                        if reply.trim().is_empty() {
                            Err(FallbackError::EmptyReply)
                        } else {
                            Ok(reply)
                        }
                    }) {
                    Ok(reply) => {
                        reply_text = reply;
                        fallback_used = true;
                    }
                    Err(err) => {
                        tracing::warn!("Fallback service failed; using classifier reply: {err}");
                        fallback_error = Some(err.to_string());
                        if matched.is_some() {
                            reply_text = hedge(&reply_text);
                        }
                    }
                }
            }
            (ResponseAction::Hedge, _) if matched.is_some() => {
                reply_text = hedge(&reply_text);
            }
            _ => {}
        }

        Reply {
            text: reply_text,
            follow_up,
            prediction,
            fallback_used,
            fallback_error,
        }
    }

    /// Stop the training thread, then save the live artifact and any
    /// feedback not yet stored. Queued training jobs finish first.
    pub fn shutdown(&self) -> Result<(), IntentError> {
        self.trainer.stop();
        if let Some(artifact) = self.slot.snapshot() {
            self.repository.save_artifact(&artifact)?;
        }
        let mut state = self.lock_feedback();
        if state.dirty && state.writable {
            self.repository.save_feedback(&state.log)?;
            state.dirty = false;
        }
        tracing::info!("Intent service shut down");
        Ok(())
    }
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn format_timestamp(unix: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| unix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CategorySpec;
    use crate::persistence::MemoryStore;

    fn schema() -> CategorySchema {
        CategorySchema::new()
            .with_category(
                "pricing",
                CategorySpec {
                    keywords: vec!["price".into(), "cost".into()],
                    responses: vec!["Contact us for a quote.".into()],
                    follow_up: Some(vec!["Shall I send a quote form?".into()]),
                },
            )
            .with_category(
                "contact",
                CategorySpec {
                    keywords: vec!["email".into(), "phone".into()],
                    responses: vec!["Reach us at contact@example.com.".into()],
                    follow_up: None,
                },
            )
    }

    fn service() -> IntentService {
        IntentService::open(ServiceConfig::default(), Arc::new(MemoryStore::new())).unwrap()
    }

    struct Echo;

    impl GenerativeFallbackService for Echo {
        fn complete(&self, _: &str, _: &[ChatTurn], user_text: &str) -> Result<String, FallbackError> {
            Ok(format!("generated: {user_text}"))
        }
    }

    struct Broken;

    impl GenerativeFallbackService for Broken {
        fn complete(&self, _: &str, _: &[ChatTurn], _: &str) -> Result<String, FallbackError> {
            Err(FallbackError::Failed("offline".into()))
        }
    }

    #[test]
    fn timestamps_format_as_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn untrained_reply_uses_default_response() {
        let service = service();
        let reply = service.respond("what is the cost", &schema(), &[]);
        assert!(reply.prediction.is_unknown());
        assert_eq!(reply.text, service.config().responses.default_response);
        assert!(!reply.fallback_used);
    }

    #[test]
    fn confident_reply_uses_first_response_and_follow_up() {
        let service = service();
        service.train(&schema()).unwrap();
        let reply = service.respond("what is the cost", &schema(), &[]);
        assert_eq!(reply.prediction.category, "pricing");
        assert!(reply.text.to_lowercase().contains("contact us for a quote."));
        assert_eq!(reply.follow_up.as_deref(), Some("Shall I send a quote form?"));
    }

    #[test]
    fn fallback_only_below_low_band() {
        let service = service().with_fallback(Arc::new(Echo));
        service.train(&schema()).unwrap();
        let reply = service.respond("zzz qqq", &schema(), &[ChatTurn::user("hi")]);
        assert_eq!(reply.prediction.band, ConfidenceBand::Low);
        assert!(!reply.fallback_used);

        let mut forced = ServiceConfig::default();
        forced.responses.lookup_min_confidence = 0.0;
        let service = IntentService::open(forced, Arc::new(MemoryStore::new()))
            .unwrap()
            .with_fallback(Arc::new(Echo));
        assert_eq!(service.respond("anything", &schema(), &[]).text, "generated: anything");
    }

    #[test]
    fn fallback_failure_is_reported_not_raised() {
        let service = service().with_fallback(Arc::new(Broken));
        let reply = service.respond("anything", &schema(), &[]);
        assert!(!reply.fallback_used);
        assert_eq!(reply.fallback_error.as_deref(), Some("Fallback service failed: offline"));
        assert_eq!(reply.text, service.config().responses.default_response);
    }

    #[test]
    fn uncertain_match_is_hedged_without_fallback() {
        let mut config = ServiceConfig::default();
        config.responses.lookup_min_confidence = 0.0;
        let service = IntentService::open(config, Arc::new(MemoryStore::new())).unwrap();
        service.train(&schema()).unwrap();
        let reply = service.respond("zzz qqq", &schema(), &[]);
        assert_eq!(reply.prediction.band, ConfidenceBand::Low);
        let response = schema()
            .get(&reply.prediction.category)
            .and_then(|spec| spec.first_response().map(str::to_lowercase))
            .unwrap();
        assert_eq!(
            reply.text,
            format!("{} {}", service.config().responses.hedge_prefix, response)
        );
    }

    #[test]
    fn status_does_not_wait_on_feedback_lock() {
        let service = service();
        service.submit_feedback("how much", "pricing", None).unwrap();
        let _held = service.lock_feedback();
        let status = service.status();
        assert_eq!(status.pending_feedback_count, 1);
        assert_eq!(status.training_example_count, 1);
    }

    #[test]
    fn clean_shutdown_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let service = IntentService::open(ServiceConfig::default(), store.clone()).unwrap();
        service.status();
        service.shutdown().unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn shutdown_persists_feedback() {
        let store = Arc::new(MemoryStore::new());
        let service = IntentService::open(ServiceConfig::default(), store.clone()).unwrap();
        service.submit_feedback("how much", "pricing", Some(1.0)).unwrap();
        service.shutdown().unwrap();
        assert!(store.keys().contains(&"feedback/log.json".to_string()));
        assert!(matches!(
            service.train(&schema()),
            Err(IntentError::WorkerUnavailable)
        ));
    }
}
