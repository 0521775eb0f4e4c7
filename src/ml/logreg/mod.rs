//! Multinomial logistic regression over TF-IDF vectors.

use serde::{Deserialize, Serialize};

use super::classifier::{TrainDataset, TrainableClassifier};
use super::vectorizer::SparseVector;
use super::{MlError, softmax};

mod train;
pub use train::{LogRegOptions, train_logreg};

/// Fitted weights, row-major `classes x dim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub dim: usize,
    pub n_classes: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    pub temperature: f32,
}

impl LogRegModel {
    fn logits(&self, x: &SparseVector) -> Vec<f32> {
        let temp = self.temperature.max(1e-6);
        (0..self.n_classes)
            .map(|c| {
                let row = &self.weights[c * self.dim..(c + 1) * self.dim];
                (self.bias[c] + x.dot(row)) / temp
            })
            .collect()
    }
}

impl TrainableClassifier for LogRegModel {
    type Options = LogRegOptions;

    fn fit(dataset: &TrainDataset, options: &LogRegOptions) -> Result<Self, MlError> {
        train_logreg(dataset, options)
    }

    fn predict_proba(&self, x: &SparseVector) -> Vec<f32> {
        if self.n_classes == 0 || self.weights.len() != self.n_classes * self.dim {
            return Vec::new();
        }
        softmax(&self.logits(x))
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn validate(&self, dim: usize) -> Result<(), MlError> {
        if self.dim != dim {
            return Err(MlError::InvalidModel(format!(
                "logistic regression dimension {} (expected {dim})",
                self.dim
            )));
        }
        if self.n_classes == 0 {
            return Err(MlError::NoClasses);
        }
        if self.weights.len() != self.n_classes * self.dim {
            return Err(MlError::InvalidModel("weights length mismatch".into()));
        }
        if self.bias.len() != self.n_classes {
            return Err(MlError::InvalidModel("bias length mismatch".into()));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(MlError::InvalidModel("temperature must be > 0".into()));
        }
        Ok(())
    }
}
