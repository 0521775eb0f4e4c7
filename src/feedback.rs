//! Feedback records and the append-only log that schedules retraining.
//!
//! Every record stays in the log for audit. Records appended since the last
//! successful retrain are pending; once more than the threshold are pending a
//! retrain is due, after which they are marked consumed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corpus::{ExampleSource, TrainingExample};
use crate::ml::TrainingResult;

/// Pending records needed, exclusive, before a retrain runs.
pub const DEFAULT_RETRAIN_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedbackError {
    #[error("Feedback text is empty")]
    EmptyText,
    #[error("Feedback category is empty")]
    EmptyCategory,
    #[error("Satisfaction {0} is outside [0, 1]")]
    InvalidSatisfaction(f32),
}

/// One user correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub text: String,
    pub correct_category: String,
    #[serde(default)]
    pub satisfaction: Option<f32>,
    /// Unix seconds.
    pub timestamp: i64,
}

impl FeedbackRecord {
    pub fn new(
        text: &str,
        correct_category: &str,
        satisfaction: Option<f32>,
        timestamp: i64,
    ) -> Result<Self, FeedbackError> {
        let text = text.trim();
        let correct_category = correct_category.trim();
        if text.is_empty() {
            return Err(FeedbackError::EmptyText);
        }
        if correct_category.is_empty() {
            return Err(FeedbackError::EmptyCategory);
        }
        if let Some(score) = satisfaction
            && !(0.0..=1.0).contains(&score)
        {
            return Err(FeedbackError::InvalidSatisfaction(score));
        }
        Ok(Self {
            text: text.to_string(),
            correct_category: correct_category.to_string(),
            satisfaction,
            timestamp,
        })
    }

    pub fn to_example(&self) -> TrainingExample {
        TrainingExample {
            text: self.text.clone(),
            category: self.correct_category.clone(),
            annotation: self
                .satisfaction
                .map(|score| format!("satisfaction={score:.2}")),
            created_at: Some(self.timestamp),
            source: ExampleSource::Feedback,
        }
    }
}

/// Append-only feedback history with a consumption cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackLog {
    records: Vec<FeedbackRecord>,
    /// Records before this index were covered by a successful retrain.
    #[serde(default)]
    consumed: usize,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: FeedbackRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    pub fn pending_count(&self) -> usize {
        self.records.len().saturating_sub(self.consumed)
    }

    /// True once pending records exceed `threshold`.
    pub fn retrain_due(&self, threshold: usize) -> bool {
        self.pending_count() > threshold
    }

    pub fn mark_consumed(&mut self) {
        self.consumed = self.records.len();
    }

    /// Every feedback-derived example, consumed or not, oldest first.
    pub fn training_examples(&self) -> Vec<TrainingExample> {
        self.records.iter().map(FeedbackRecord::to_example).collect()
    }

    /// Clamp a cursor read from disk to the record count.
    pub(crate) fn repaired(mut self) -> Self {
        self.consumed = self.consumed.min(self.records.len());
        self
    }
}

/// What a feedback submission did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    /// The record was appended to the log.
    pub recorded: bool,
    /// The log reached durable storage.
    pub persisted: bool,
    pub retrained: bool,
    pub retrain_result: Option<TrainingResult>,
    /// Why a due retrain did not complete.
    pub retrain_error: Option<String>,
    /// Pending records after this call.
    pub pending_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> FeedbackRecord {
        FeedbackRecord::new(&format!("question {i}"), "pricing", Some(0.5), 100 + i as i64).unwrap()
    }

    #[test]
    fn retrain_is_due_only_above_threshold() {
        let mut log = FeedbackLog::new();
        for i in 0..10 {
            log.append(record(i));
        }
        assert_eq!(log.pending_count(), 10);
        assert!(!log.retrain_due(DEFAULT_RETRAIN_THRESHOLD));
        log.append(record(10));
        assert!(log.retrain_due(DEFAULT_RETRAIN_THRESHOLD));

        log.mark_consumed();
        assert_eq!(log.pending_count(), 0);
        assert_eq!(log.len(), 11);
        assert_eq!(log.training_examples().len(), 11);
    }

    #[test]
    fn records_are_validated_and_trimmed() {
        assert_eq!(
            FeedbackRecord::new("  ", "x", None, 0),
            Err(FeedbackError::EmptyText)
        );
        assert_eq!(
            FeedbackRecord::new("hi", " ", None, 0),
            Err(FeedbackError::EmptyCategory)
        );
        assert!(matches!(
            FeedbackRecord::new("hi", "x", Some(1.5), 0),
            Err(FeedbackError::InvalidSatisfaction(_))
        ));
        assert!(FeedbackRecord::new("hi", "x", Some(f32::NAN), 0).is_err());
        let ok = FeedbackRecord::new(" hi ", " x ", None, 7).unwrap();
        assert_eq!((ok.text.as_str(), ok.correct_category.as_str()), ("hi", "x"));
    }

    #[test]
    fn examples_carry_timestamps_and_source() {
        let example = record(1).to_example();
        assert_eq!(example.created_at, Some(101));
        assert_eq!(example.source, ExampleSource::Feedback);
        assert_eq!(example.annotation.as_deref(), Some("satisfaction=0.50"));
    }

    #[test]
    fn repaired_clamps_cursor() {
        let log: FeedbackLog =
            serde_json::from_str(r#"{"records":[],"consumed":5}"#).unwrap();
        assert_eq!(log.repaired().pending_count(), 0);
    }
}
