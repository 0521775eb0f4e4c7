//! Bagged ensemble of CART trees with per-split feature subsampling.
//!
//! Probabilities are the mean of the leaf class distributions reached in
//! every tree.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::MlError;
use super::classifier::{TrainDataset, TrainableClassifier};
use super::vectorizer::SparseVector;

mod tree;
pub use tree::{DecisionTree, Node};
use tree::TreeLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestOptions {
    pub n_estimators: usize,
    /// Zero means unbounded.
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features inspected per split; `None` uses `sqrt(dim)`.
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample per tree instead of using every row.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 0,
            min_samples_split: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    pub n_classes: usize,
    pub dim: usize,
    pub trees: Vec<DecisionTree>,
}

impl TrainableClassifier for RandomForestModel {
    type Options = ForestOptions;

    fn fit(dataset: &TrainDataset, options: &ForestOptions) -> Result<Self, MlError> {
        dataset.validate()?;
        let n_trees = options.n_estimators.max(1);
        let n_rows = dataset.x.len();
        let max_features = options
            .max_features
            .unwrap_or_else(|| (dataset.dim as f32).sqrt().ceil() as usize)
            .max(1);
        let limits = TreeLimits {
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split,
            max_features,
        };

        let mut trees = Vec::with_capacity(n_trees);
        for tree_idx in 0..n_trees {
            let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(tree_idx as u64));
            let samples: Vec<usize> = if options.bootstrap {
                (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
            } else {
                (0..n_rows).collect()
            };
            trees.push(DecisionTree::grow(
                &dataset.x,
                &dataset.y,
                samples,
                dataset.n_classes(),
                limits,
                &mut rng,
            ));
        }
        tracing::debug!(
            trees = trees.len(),
            nodes = trees.iter().map(|t| t.nodes.len()).sum::<usize>(),
            "Fitted random forest"
        );
        Ok(Self {
            n_classes: dataset.n_classes(),
            dim: dataset.dim,
            trees,
        })
    }

    fn predict_proba(&self, x: &SparseVector) -> Vec<f32> {
        let mut sum = vec![0f32; self.n_classes];
        let mut voters = 0usize;
        for tree in &self.trees {
            if let Some(proba) = tree.leaf_proba(x) {
                for (acc, p) in sum.iter_mut().zip(proba) {
                    *acc += p;
                }
                voters += 1;
            }
        }
        if voters == 0 {
            return vec![1.0 / self.n_classes.max(1) as f32; self.n_classes];
        }
        for acc in &mut sum {
            *acc /= voters as f32;
        }
        sum
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn validate(&self, dim: usize) -> Result<(), MlError> {
        if self.dim != dim {
            return Err(MlError::InvalidModel(format!(
                "forest dimension {} (expected {dim})",
                self.dim
            )));
        }
        if self.n_classes == 0 {
            return Err(MlError::NoClasses);
        }
        if self.trees.is_empty() {
            return Err(MlError::InvalidModel("forest has no trees".into()));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_classes, dim)
                .map_err(|err| MlError::InvalidModel(format!("tree {idx}: {err}")))?;
        }
        Ok(())
    }
}
