//! Multinomial naive Bayes with additive smoothing.

use serde::{Deserialize, Serialize};

use super::classifier::{TrainDataset, TrainableClassifier};
use super::vectorizer::SparseVector;
use super::{MlError, softmax};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NaiveBayesOptions {
    /// Additive (Laplace/Lidstone) smoothing.
    pub alpha: f32,
}

impl Default for NaiveBayesOptions {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    pub dim: usize,
    pub class_log_prior: Vec<f32>,
    /// Row-major `classes x dim`.
    pub feature_log_prob: Vec<f32>,
}

impl TrainableClassifier for NaiveBayesModel {
    type Options = NaiveBayesOptions;

    fn fit(dataset: &TrainDataset, options: &NaiveBayesOptions) -> Result<Self, MlError> {
        dataset.validate()?;
        if !options.alpha.is_finite() || options.alpha <= 0.0 {
            return Err(MlError::InvalidModel("alpha must be > 0".into()));
        }
        let classes = dataset.n_classes();
        let dim = dataset.dim;
        let mut class_counts = vec![0f32; classes];
        let mut feature_counts = vec![0f32; classes * dim];
        for (x, &y) in dataset.x.iter().zip(&dataset.y) {
            class_counts[y] += 1.0;
            for (i, v) in x.iter() {
                feature_counts[y * dim + i] += v;
            }
        }

        let n = dataset.y.len() as f32;
        // Classes absent from the data keep a vanishing prior.
        let class_log_prior = class_counts
            .iter()
            .map(|&count| (count.max(1e-9) / n).ln())
            .collect();
        let mut feature_log_prob = vec![0f32; classes * dim];
        for c in 0..classes {
            let row = &feature_counts[c * dim..(c + 1) * dim];
            let total: f32 = row.iter().sum::<f32>() + options.alpha * dim as f32;
            for (i, &count) in row.iter().enumerate() {
                feature_log_prob[c * dim + i] = ((count + options.alpha) / total).ln();
            }
        }
        Ok(Self {
            dim,
            class_log_prior,
            feature_log_prob,
        })
    }

    fn predict_proba(&self, x: &SparseVector) -> Vec<f32> {
        let joint: Vec<f32> = self
            .class_log_prior
            .iter()
            .enumerate()
            .map(|(c, prior)| {
                prior + x.dot(&self.feature_log_prob[c * self.dim..(c + 1) * self.dim])
            })
            .collect();
        softmax(&joint)
    }

    fn n_classes(&self) -> usize {
        self.class_log_prior.len()
    }

    fn validate(&self, dim: usize) -> Result<(), MlError> {
        if self.dim != dim {
            return Err(MlError::InvalidModel(format!(
                "naive Bayes dimension {} (expected {dim})",
                self.dim
            )));
        }
        if self.class_log_prior.is_empty() {
            return Err(MlError::NoClasses);
        }
        if self.feature_log_prob.len() != self.class_log_prior.len() * self.dim {
            return Err(MlError::InvalidModel("feature table length mismatch".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::classifier::tests::toy_dataset;

    #[test]
    fn smoothed_probabilities_are_normalized_per_class() {
        let model = NaiveBayesModel::fit(&toy_dataset(), &NaiveBayesOptions::default()).unwrap();
        for c in 0..2 {
            let row = &model.feature_log_prob[c * 4..(c + 1) * 4];
            let sum: f32 = row.iter().map(|lp| lp.exp()).sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
        assert!((model.class_log_prior[0] - 0.5f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn empty_input_falls_back_to_priors() {
        let model = NaiveBayesModel::fit(&toy_dataset(), &NaiveBayesOptions::default()).unwrap();
        let proba = model.predict_proba(&SparseVector::default());
        assert!((proba[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_positive_alpha() {
        let options = NaiveBayesOptions { alpha: 0.0 };
        assert!(NaiveBayesModel::fit(&toy_dataset(), &options).is_err());
    }
}
