use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::LogRegModel;
use crate::ml::classifier::{TrainDataset, TrainableClassifier};
use crate::ml::{MlError, softmax};

/// Mini-batch gradient descent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogRegOptions {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2: f32,
    pub batch_size: usize,
    pub seed: u64,
    pub balance_classes: bool,
}

impl Default for LogRegOptions {
    fn default() -> Self {
        Self {
            epochs: 60,
            learning_rate: 0.5,
            l2: 1e-4,
            batch_size: 16,
            seed: 42,
            balance_classes: true,
        }
    }
}

pub fn train_logreg(
    dataset: &TrainDataset,
    options: &LogRegOptions,
) -> Result<LogRegModel, MlError> {
    dataset.validate()?;
    let classes = dataset.n_classes();
    let dim = dataset.dim;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut weights = vec![0.0f32; classes * dim];
    let mut bias = vec![0.0f32; classes];
    for w in &mut weights {
        *w = (rng.random::<f32>() - 0.5) * 0.01;
    }

    let mut indices: Vec<usize> = (0..dataset.x.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);
    let class_weights = class_weights(&dataset.y, classes, options.balance_classes);

    for _epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = vec![0.0f32; weights.len()];
            let mut grad_b = vec![0.0f32; classes];
            let mut batch_weight = 0.0f32;
            for &idx in chunk {
                let x = &dataset.x[idx];
                let y = dataset.y[idx];
                let weight = class_weights[y];
                if weight == 0.0 {
                    continue;
                }
                let logits: Vec<f32> = (0..classes)
                    .map(|c| bias[c] + x.dot(&weights[c * dim..(c + 1) * dim]))
                    .collect();
                let probs = softmax(&logits);
                for c in 0..classes {
                    let diff = probs[c] - if c == y { 1.0 } else { 0.0 };
                    let base = c * dim;
                    for (i, v) in x.iter() {
                        grad_w[base + i] += diff * v * weight;
                    }
                    grad_b[c] += diff * weight;
                }
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * (g * inv + l2 * *w);
            }
            for (b, g) in bias.iter_mut().zip(&grad_b) {
                *b -= lr * g * inv;
            }
        }
    }

    let model = LogRegModel {
        dim,
        n_classes: classes,
        weights,
        bias,
        temperature: 1.0,
    };
    model.validate(dim)?;
    Ok(model)
}

fn class_weights(y: &[usize], classes: usize, balance: bool) -> Vec<f32> {
    if !balance {
        return vec![1.0; classes];
    }
    let mut counts = vec![0f32; classes];
    for &label in y {
        counts[label] += 1.0;
    }
    let total: f32 = counts.iter().sum();
    counts
        .into_iter()
        .map(|count| {
            if count == 0.0 {
                0.0
            } else {
                total / (classes as f32 * count)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_weights_favor_rare_classes() {
        let weights = class_weights(&[0, 0, 0, 1], 3, true);
        assert!((weights[0] - 4.0 / 9.0).abs() < 1e-6);
        assert!((weights[1] - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(weights[2], 0.0);
        assert_eq!(class_weights(&[0, 1], 2, false), vec![1.0, 1.0]);
    }
}
