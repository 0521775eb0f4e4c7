use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::ml::vectorizer::SparseVector;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub(super) struct TreeLimits {
    /// Zero means unbounded.
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Non-constant features inspected per split, at least.
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: u32,
        threshold: f32,
        left: u32,
        right: u32,
    },
    Leaf { proba: Vec<f32> },
}

/// CART classification tree over sparse rows, flattened into a node arena
/// with the root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: u32,
    threshold: f32,
    impurity: f32,
}

impl DecisionTree {
    pub(super) fn grow(
        x: &[SparseVector],
        y: &[usize],
        samples: Vec<usize>,
        n_classes: usize,
        limits: TreeLimits,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(x, y, samples, n_classes, 0, limits, rng);
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn grow_node(
        &mut self,
        x: &[SparseVector],
        y: &[usize],
        samples: Vec<usize>,
        n_classes: usize,
        depth: usize,
        limits: TreeLimits,
        rng: &mut StdRng,
    ) -> u32 {
        let id = self.nodes.len() as u32;
        let counts = class_counts(y, &samples, n_classes);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = limits.max_depth > 0 && depth >= limits.max_depth;
        if pure || depth_reached || samples.len() < limits.min_samples_split.max(2) {
            self.nodes.push(leaf(&counts));
            return id;
        }
        let Some(split) = best_split(x, y, &samples, n_classes, limits.max_features, rng) else {
            self.nodes.push(leaf(&counts));
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&row| x[row].get(split.feature) <= split.threshold);
        // Placeholder until both children exist.
        self.nodes.push(leaf(&counts));
        let left = self.grow_node(x, y, left_rows, n_classes, depth + 1, limits, rng);
        let right = self.grow_node(x, y, right_rows, n_classes, depth + 1, limits, rng);
        self.nodes[id as usize] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Class distribution of the leaf `x` falls into.
    pub fn leaf_proba(&self, x: &SparseVector) -> Option<&[f32]> {
        let mut idx = 0usize;
        // Bounded by node count so a malformed arena cannot loop forever.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx)? {
                Node::Leaf { proba } => return Some(proba),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x.get(*feature) <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
        None
    }

    pub fn validate(&self, n_classes: usize, dim: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { proba } if proba.len() != n_classes => {
                    return Err(format!("leaf {idx} has {} classes", proba.len()));
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature as usize >= dim {
                        return Err(format!("node {idx} splits on column {feature}"));
                    }
                    let n = self.nodes.len() as u32;
                    if *left >= n || *right >= n || *left as usize <= idx || *right as usize <= idx
                    {
                        return Err(format!("node {idx} has invalid children"));
                    }
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

fn class_counts(y: &[usize], samples: &[usize], n_classes: usize) -> Vec<u32> {
    let mut counts = vec![0u32; n_classes];
    for &row in samples {
        counts[y[row]] += 1;
    }
    counts
}

fn leaf(counts: &[u32]) -> Node {
    let total: u32 = counts.iter().sum();
    let proba = counts
        .iter()
        .map(|&c| if total == 0 { 0.0 } else { c as f32 / total as f32 })
        .collect();
    Node::Leaf { proba }
}

fn gini(counts: &[u32], total: u32) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / total;
            p * p
        })
        .sum::<f32>()
}

/// Search features in random order. Features constant within the node do not
/// count towards `max_features`, so a split is found whenever one exists.
fn best_split(
    x: &[SparseVector],
    y: &[usize],
    samples: &[usize],
    n_classes: usize,
    max_features: usize,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let active: BTreeSet<u32> = samples
        .iter()
        .flat_map(|&row| x[row].indices.iter().copied())
        .collect();
    let mut features: Vec<u32> = active.into_iter().collect();
    features.shuffle(rng);

    let mut best: Option<SplitCandidate> = None;
    let mut inspected = 0usize;
    for feature in features {
        if inspected >= max_features.max(1) && best.is_some() {
            break;
        }
        let Some(candidate) = best_threshold(x, y, samples, n_classes, feature) else {
            continue;
        };
        inspected += 1;
        if best
            .as_ref()
            .is_none_or(|current| candidate.impurity < current.impurity)
        {
            best = Some(candidate);
        }
    }
    best
}

/// Lowest weighted child impurity over midpoints between distinct values.
fn best_threshold(
    x: &[SparseVector],
    y: &[usize],
    samples: &[usize],
    n_classes: usize,
    feature: u32,
) -> Option<SplitCandidate> {
    let mut values: Vec<(f32, usize)> = samples
        .iter()
        .map(|&row| (x[row].get(feature), y[row]))
        .collect();
    values.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let first = values.first()?.0;
    let last = values.last()?.0;
    if first == last {
        return None;
    }

    let total = values.len() as u32;
    let mut right = vec![0u32; n_classes];
    for &(_, label) in &values {
        right[label] += 1;
    }
    let mut left = vec![0u32; n_classes];
    let mut best: Option<SplitCandidate> = None;
    for i in 0..values.len() - 1 {
        let (value, label) = values[i];
        left[label] += 1;
        right[label] -= 1;
        let next = values[i + 1].0;
        if value == next {
            continue;
        }
        let n_left = (i + 1) as u32;
        let n_right = total - n_left;
        let impurity = (n_left as f32 * gini(&left, n_left)
            + n_right as f32 * gini(&right, n_right))
            / total as f32;
        if best.as_ref().is_none_or(|b| impurity < b.impurity) {
            best = Some(SplitCandidate {
                feature,
                threshold: value + (next - value) / 2.0,
                impurity,
            });
        }
    }
    best
}
