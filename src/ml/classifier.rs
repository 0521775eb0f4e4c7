//! Classifier capability trait and the concrete model families behind it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::forest::{ForestOptions, RandomForestModel};
use super::logreg::{LogRegModel, LogRegOptions};
use super::naive_bayes::{NaiveBayesModel, NaiveBayesOptions};
use super::vectorizer::SparseVector;
use super::{MlError, validate_dataset};

/// Vectorized training rows.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Ordered class identifiers; labels index into this list.
    pub classes: Vec<String>,
    /// Number of feature columns.
    pub dim: usize,
    pub x: Vec<SparseVector>,
    pub y: Vec<usize>,
}

impl TrainDataset {
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn validate(&self) -> Result<(), MlError> {
        validate_dataset(self.x.len(), &self.y, self.classes.len())?;
        if let Some(row) = self
            .x
            .iter()
            .find(|row| row.indices.last().is_some_and(|&idx| idx as usize >= self.dim))
        {
            return Err(MlError::InvalidModel(format!(
                "feature index {:?} out of range for dimension {}",
                row.indices.last(),
                self.dim
            )));
        }
        Ok(())
    }
}

/// A supervised model over sparse vectors producing class probabilities.
pub trait TrainableClassifier: Sized {
    type Options;

    /// Fit a fresh model. Implementations must be deterministic for a given
    /// dataset and options.
    fn fit(dataset: &TrainDataset, options: &Self::Options) -> Result<Self, MlError>;

    /// Probability per class, summing to one.
    fn predict_proba(&self, x: &SparseVector) -> Vec<f32>;

    fn n_classes(&self) -> usize;

    /// Check parameter shapes against the expected feature dimension.
    fn validate(&self, dim: usize) -> Result<(), MlError>;
}

/// Selects the classifier family at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    RandomForest,
    LogisticRegression,
    NaiveBayes,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::RandomForest => "random_forest",
            ClassifierKind::LogisticRegression => "logistic_regression",
            ClassifierKind::NaiveBayes => "naive_bayes",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "forest" | "rf" => Ok(ClassifierKind::RandomForest),
            "logistic_regression" | "logreg" => Ok(ClassifierKind::LogisticRegression),
            "naive_bayes" | "nb" => Ok(ClassifierKind::NaiveBayes),
            other => Err(format!("Unknown classifier '{other}'")),
        }
    }
}

/// Hyperparameters for every family; only the selected one is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    pub forest: ForestOptions,
    pub logreg: LogRegOptions,
    pub naive_bayes: NaiveBayesOptions,
}

impl ClassifierOptions {
    /// Apply one seed to every family that samples randomly.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.forest.seed = seed;
        self.logreg.seed = seed;
        self
    }
}

/// A fitted model of any family, serialized with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum ClassifierModel {
    RandomForest(RandomForestModel),
    LogisticRegression(LogRegModel),
    NaiveBayes(NaiveBayesModel),
}

impl ClassifierModel {
    pub fn fit(
        kind: ClassifierKind,
        dataset: &TrainDataset,
        options: &ClassifierOptions,
    ) -> Result<Self, MlError> {
        Ok(match kind {
            ClassifierKind::RandomForest => {
                ClassifierModel::RandomForest(RandomForestModel::fit(dataset, &options.forest)?)
            }
            ClassifierKind::LogisticRegression => {
                ClassifierModel::LogisticRegression(LogRegModel::fit(dataset, &options.logreg)?)
            }
            ClassifierKind::NaiveBayes => {
                ClassifierModel::NaiveBayes(NaiveBayesModel::fit(dataset, &options.naive_bayes)?)
            }
        })
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            ClassifierModel::RandomForest(_) => ClassifierKind::RandomForest,
            ClassifierModel::LogisticRegression(_) => ClassifierKind::LogisticRegression,
            ClassifierModel::NaiveBayes(_) => ClassifierKind::NaiveBayes,
        }
    }

    pub fn predict_proba(&self, x: &SparseVector) -> Vec<f32> {
        match self {
            ClassifierModel::RandomForest(model) => model.predict_proba(x),
            ClassifierModel::LogisticRegression(model) => model.predict_proba(x),
            ClassifierModel::NaiveBayes(model) => model.predict_proba(x),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            ClassifierModel::RandomForest(model) => model.n_classes(),
            ClassifierModel::LogisticRegression(model) => model.n_classes(),
            ClassifierModel::NaiveBayes(model) => model.n_classes(),
        }
    }

    pub fn validate(&self, dim: usize) -> Result<(), MlError> {
        match self {
            ClassifierModel::RandomForest(model) => model.validate(dim),
            ClassifierModel::LogisticRegression(model) => model.validate(dim),
            ClassifierModel::NaiveBayes(model) => model.validate(dim),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two separable classes over four columns: class 0 uses columns 0/1,
    /// class 1 uses columns 2/3.
    pub(crate) fn toy_dataset() -> TrainDataset {
        let rows = [
            (vec![(0, 1.0)], 0),
            (vec![(1, 1.0)], 0),
            (vec![(0, 0.7), (1, 0.7)], 0),
            (vec![(0, 0.9), (1, 0.4)], 0),
            (vec![(2, 1.0)], 1),
            (vec![(3, 1.0)], 1),
            (vec![(2, 0.7), (3, 0.7)], 1),
            (vec![(2, 0.4), (3, 0.9)], 1),
        ];
        TrainDataset {
            classes: vec!["a".into(), "b".into()],
            dim: 4,
            x: rows
                .iter()
                .map(|(pairs, _)| SparseVector::from_pairs(pairs.clone()))
                .collect(),
            y: rows.iter().map(|(_, label)| *label).collect(),
        }
    }

    #[test]
    fn kind_parses_aliases_and_round_trips() {
        for kind in [
            ClassifierKind::RandomForest,
            ClassifierKind::LogisticRegression,
            ClassifierKind::NaiveBayes,
        ] {
            assert_eq!(kind.as_str().parse::<ClassifierKind>(), Ok(kind));
        }
        assert_eq!("logreg".parse(), Ok(ClassifierKind::LogisticRegression));
        assert_eq!("Naive-Bayes".parse(), Ok(ClassifierKind::NaiveBayes));
        assert!("svm".parse::<ClassifierKind>().is_err());
    }

    #[test]
    fn every_family_separates_the_toy_data() {
        let dataset = toy_dataset();
        let options = ClassifierOptions::default().with_seed(3);
        for kind in [
            ClassifierKind::RandomForest,
            ClassifierKind::LogisticRegression,
            ClassifierKind::NaiveBayes,
        ] {
            let model = ClassifierModel::fit(kind, &dataset, &options).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.n_classes(), 2);
            model.validate(dataset.dim).unwrap();
            let a = model.predict_proba(&SparseVector::from_pairs(vec![(0, 1.0)]));
            let b = model.predict_proba(&SparseVector::from_pairs(vec![(3, 1.0)]));
            assert!((a.iter().sum::<f32>() - 1.0).abs() < 1e-4, "{kind}");
            assert!(a[0] > 0.5, "{kind}: {a:?}");
            assert!(b[1] > 0.5, "{kind}: {b:?}");
        }
    }

    #[test]
    fn serialized_model_keeps_its_kind() {
        let dataset = toy_dataset();
        let model =
            ClassifierModel::fit(ClassifierKind::NaiveBayes, &dataset, &ClassifierOptions::default())
                .unwrap();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"naive_bayes\""));
        let back: ClassifierModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ClassifierKind::NaiveBayes);
        let x = SparseVector::from_pairs(vec![(1, 0.5), (2, 0.5)]);
        for (p, q) in back.predict_proba(&x).iter().zip(model.predict_proba(&x)) {
            assert!((p - q).abs() < 1e-6);
        }
    }

    #[test]
    fn dataset_rejects_out_of_range_columns() {
        let mut dataset = toy_dataset();
        dataset.dim = 3;
        assert!(matches!(dataset.validate(), Err(MlError::InvalidModel(_))));
    }
}
