use serde::{Deserialize, Serialize};

/// Where a training example came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleSource {
    Keyword,
    Variation,
    Response,
    Feedback,
    Supplied,
}

/// One labelled utterance.
///
/// Synthetic examples carry no timestamp; feedback-derived ones do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub annotation: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    pub source: ExampleSource,
}

impl TrainingExample {
    pub fn synthetic(text: impl Into<String>, category: &str, source: ExampleSource) -> Self {
        Self {
            text: text.into(),
            category: category.to_string(),
            annotation: None,
            created_at: None,
            source,
        }
    }

    /// An externally supplied example, e.g. from an admin import.
    pub fn supplied(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            annotation: None,
            created_at: None,
            source: ExampleSource::Supplied,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}
