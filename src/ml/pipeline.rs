//! Normalize, vectorize and classify, with held-out evaluation.
//!
//! Training fits the vectorizer and classifier on the stratified training
//! split and reports metrics on the held-out split. A corpus with a single
//! category has nothing to evaluate against, so its metrics describe the fit
//! on the training rows themselves.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::classifier::{ClassifierKind, ClassifierModel, ClassifierOptions, TrainDataset};
use super::metrics::{CategoryReport, ConfusionMatrix, accuracy, category_reports};
use super::split::stratified_split;
use super::vectorizer::{SparseVector, TfidfVectorizer, VectorizerOptions};
use super::{MlError, argmax};
use crate::corpus::TrainingExample;
use crate::text::normalize;

/// Everything that shapes a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub classifier: ClassifierKind,
    pub seed: u64,
    /// Share of each category held out for evaluation.
    pub test_fraction: f32,
    pub vectorizer: VectorizerOptions,
    pub models: ClassifierOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::default(),
            seed: 42,
            test_fraction: 0.2,
            vectorizer: VectorizerOptions::default(),
            models: ClassifierOptions::default(),
        }
    }
}

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingResult {
    /// Held-out accuracy in `[0, 1]`.
    pub accuracy: f32,
    /// Usable examples after normalization.
    pub sample_count: usize,
    pub train_count: usize,
    pub test_count: usize,
    pub per_category: Vec<CategoryReport>,
    pub categories: Vec<String>,
}

/// A trained vectorizer and classifier with the label list they share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    /// Sorted category names; classifier outputs follow this order.
    pub classes: Vec<String>,
    pub vectorizer: TfidfVectorizer,
    pub classifier: ClassifierModel,
}

impl FittedPipeline {
    /// Class probabilities for raw text. Text without a single known term
    /// carries no evidence and gets the uniform distribution.
    pub fn predict_proba(&self, text: &str) -> Vec<f32> {
        self.predict_proba_normalized(&normalize(text))
    }

    fn predict_proba_normalized(&self, normalized: &str) -> Vec<f32> {
        let vector = self.vectorizer.transform(normalized);
        self.proba_for_vector(&vector)
    }

    fn proba_for_vector(&self, vector: &SparseVector) -> Vec<f32> {
        let n = self.classes.len();
        if vector.is_empty() {
            return vec![1.0 / n.max(1) as f32; n];
        }
        self.classifier.predict_proba(vector)
    }

    /// Best category and its probability, or `None` when the normalized text
    /// is empty.
    pub fn predict(&self, text: &str) -> Option<(String, f32)> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }
        let proba = self.predict_proba_normalized(&normalized);
        let best = argmax(&proba);
        let category = self.classes.get(best)?;
        Some((category.clone(), proba[best].clamp(0.0, 1.0)))
    }

    pub fn kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }

    /// Cross-check the vectorizer, classifier and label list.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.classes.is_empty() {
            return Err(MlError::NoClasses);
        }
        if self.classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MlError::InvalidModel("class list is not sorted and unique".into()));
        }
        self.vectorizer.validate()?;
        if self.classifier.n_classes() != self.classes.len() {
            return Err(MlError::InvalidModel(format!(
                "classifier has {} classes but the label list has {}",
                self.classifier.n_classes(),
                self.classes.len()
            )));
        }
        self.classifier.validate(self.vectorizer.dim())
    }
}

/// Trains [`FittedPipeline`]s.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPipeline {
    options: PipelineOptions,
}

impl ClassificationPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Fit on a corpus. Fails with [`MlError::EmptyDataset`] when no example
    /// survives normalization.
    pub fn train(
        &self,
        corpus: &[TrainingExample],
    ) -> Result<(FittedPipeline, TrainingResult), MlError> {
        let rows: Vec<(String, &str)> = corpus
            .iter()
            .filter_map(|example| {
                let category = example.category.trim();
                let text = normalize(&example.text);
                (!category.is_empty() && !text.is_empty()).then_some((text, category))
            })
            .collect();
        if rows.is_empty() {
            return Err(MlError::EmptyDataset);
        }

        let classes: Vec<String> = rows
            .iter()
            .map(|(_, category)| *category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let label_of: BTreeMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        let labels: Vec<usize> = rows.iter().map(|(_, category)| label_of[category]).collect();

        let (train_idx, test_idx) = if classes.len() >= 2 {
            let split = stratified_split(
                &labels,
                classes.len(),
                self.options.test_fraction,
                self.options.seed,
            );
            (split.train, split.test)
        } else {
            ((0..rows.len()).collect(), Vec::new())
        };

        let train_docs: Vec<&str> = train_idx.iter().map(|&i| rows[i].0.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(&train_docs, &self.options.vectorizer)?;
        let dataset = TrainDataset {
            classes: classes.clone(),
            dim: vectorizer.dim(),
            x: train_docs.iter().map(|doc| vectorizer.transform(doc)).collect(),
            y: train_idx.iter().map(|&i| labels[i]).collect(),
        };
        let models = self.options.models.clone().with_seed(self.options.seed);
        let classifier = ClassifierModel::fit(self.options.classifier, &dataset, &models)?;
        let fitted = FittedPipeline {
            classes: classes.clone(),
            vectorizer,
            classifier,
        };

        let eval_idx = if test_idx.is_empty() { &train_idx } else { &test_idx };
        let mut cm = ConfusionMatrix::new(classes.len());
        for &i in eval_idx {
            let proba = fitted.predict_proba_normalized(&rows[i].0);
            cm.add(labels[i], argmax(&proba));
        }
        let result = TrainingResult {
            accuracy: accuracy(&cm),
            sample_count: rows.len(),
            train_count: train_idx.len(),
            test_count: test_idx.len(),
            per_category: category_reports(&cm, &classes),
            categories: classes,
        };
        tracing::info!(
            classifier = %self.options.classifier,
            samples = result.sample_count,
            categories = result.categories.len(),
            accuracy = result.accuracy,
            "Trained classification pipeline"
        );
        Ok((fitted, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<TrainingExample> {
        let mut out = Vec::new();
        for text in ["price", "cost", "price plan", "cost quote", "pricing info"] {
            out.push(TrainingExample::supplied(text, "pricing"));
        }
        for text in ["email", "phone", "email address", "phone number", "call us"] {
            out.push(TrainingExample::supplied(text, "contact"));
        }
        out
    }

    #[test]
    fn empty_after_normalization_is_rejected() {
        let pipeline = ClassificationPipeline::default();
        assert_eq!(pipeline.train(&[]).unwrap_err(), MlError::EmptyDataset);
        let only_stop_words = vec![TrainingExample::supplied("what is the", "x")];
        assert_eq!(
            pipeline.train(&only_stop_words).unwrap_err(),
            MlError::EmptyDataset
        );
    }

    #[test]
    fn result_reports_split_sizes_and_sorted_categories() {
        let (fitted, result) = ClassificationPipeline::default().train(&corpus()).unwrap();
        fitted.validate().unwrap();
        assert_eq!(result.categories, vec!["contact", "pricing"]);
        assert_eq!(result.sample_count, 10);
        assert_eq!(result.test_count, 2);
        assert_eq!(result.train_count, 8);
        assert_eq!(result.per_category.len(), 2);
        assert!((0.0..=1.0).contains(&result.accuracy));
    }

    #[test]
    fn single_category_corpus_still_trains() {
        let corpus = vec![
            TrainingExample::supplied("price", "pricing"),
            TrainingExample::supplied("cost", "pricing"),
        ];
        let (fitted, result) = ClassificationPipeline::default().train(&corpus).unwrap();
        assert_eq!(result.accuracy, 1.0);
        assert_eq!(result.test_count, 0);
        assert_eq!(fitted.predict("cost"), Some(("pricing".to_string(), 1.0)));
    }

    #[test]
    fn unknown_terms_give_uniform_probabilities() {
        let (fitted, _) = ClassificationPipeline::default().train(&corpus()).unwrap();
        assert_eq!(fitted.predict_proba("zebra xylophone"), vec![0.5, 0.5]);
        assert_eq!(fitted.predict("the"), None);
    }

    #[test]
    fn every_classifier_family_trains_the_same_corpus() {
        for classifier in [
            ClassifierKind::RandomForest,
            ClassifierKind::LogisticRegression,
            ClassifierKind::NaiveBayes,
        ] {
            let pipeline = ClassificationPipeline::new(PipelineOptions {
                classifier,
                ..PipelineOptions::default()
            });
            let (fitted, _) = pipeline.train(&corpus()).unwrap();
            assert_eq!(fitted.kind(), classifier);
            let (category, confidence) = fitted.predict("email").unwrap();
            assert_eq!(category, "contact", "{classifier}");
            assert!(confidence > 0.5);
        }
    }

    #[test]
    fn training_is_deterministic() {
        let pipeline = ClassificationPipeline::default();
        let (a, ra) = pipeline.train(&corpus()).unwrap();
        let (b, rb) = pipeline.train(&corpus()).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a, b);
    }
}
