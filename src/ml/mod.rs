//! Vectorization, classifiers and the training pipeline.
//!
//! Every classifier family implements [`classifier::TrainableClassifier`] over
//! TF-IDF sparse vectors and is serialized with its fitted parameters, so a
//! trained pipeline can be persisted and reloaded without retraining.

pub mod classifier;
pub mod forest;
pub mod logreg;
pub mod metrics;
pub mod naive_bayes;
pub mod pipeline;
pub mod split;
pub mod vectorizer;

pub use classifier::{
    ClassifierKind, ClassifierModel, ClassifierOptions, TrainDataset, TrainableClassifier,
};
pub use pipeline::{ClassificationPipeline, FittedPipeline, PipelineOptions, TrainingResult};
pub use vectorizer::{SparseVector, TfidfVectorizer, VectorizerOptions};

/// Errors raised while fitting or validating a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MlError {
    #[error("Empty training set")]
    EmptyDataset,
    #[error("Mismatched training inputs ({inputs}) and labels ({labels})")]
    LengthMismatch { inputs: usize, labels: usize },
    #[error("No classes available for training")]
    NoClasses,
    #[error("Label {label} out of range for {classes} classes")]
    LabelOutOfRange { label: usize, classes: usize },
    #[error("No terms survived vectorizer bounds")]
    EmptyVocabulary,
    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

/// Compute a numerically-stable softmax for a set of logits.
pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut exps: Vec<f32> = raw.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / raw.len() as f32; raw.len()];
    }
    for v in &mut exps {
        *v /= sum;
    }
    exps
}

/// Index of the largest value; the first wins ties. Zero for empty input.
pub fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

pub(crate) fn validate_dataset(x_len: usize, y: &[usize], classes: usize) -> Result<(), MlError> {
    if x_len == 0 || y.is_empty() {
        return Err(MlError::EmptyDataset);
    }
    if x_len != y.len() {
        return Err(MlError::LengthMismatch {
            inputs: x_len,
            labels: y.len(),
        });
    }
    if classes == 0 {
        return Err(MlError::NoClasses);
    }
    if let Some(&label) = y.iter().find(|&&label| label >= classes) {
        return Err(MlError::LabelOutOfRange { label, classes });
    }
    Ok(())
}
