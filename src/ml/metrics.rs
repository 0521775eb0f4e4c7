//! Evaluation metrics for classification models.

use serde::{Deserialize, Serialize};

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Record one prediction; out-of-range indices are ignored.
    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// Precision/recall/F1 for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: String,
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    pub f1: f32,
    /// Evaluation examples whose true label is this category.
    pub support: u32,
}

/// Per-class reports, in class-index order.
pub fn category_reports(cm: &ConfusionMatrix, classes: &[String]) -> Vec<CategoryReport> {
    let k = cm.n_classes;
    let mut reports = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
                fp += cm.get(j, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        reports.push(CategoryReport {
            category: classes.get(class_idx).cloned().unwrap_or_default(),
            precision,
            recall,
            f1,
            support,
        });
    }
    reports
}

/// Overall accuracy; zero for an empty matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..cm.n_classes).map(|i| cm.get(i, i) as u64).sum();
    correct as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["contact".into(), "pricing".into()]
    }

    #[test]
    fn reports_match_hand_computed_values() {
        let mut cm = ConfusionMatrix::new(2);
        // contact: 3 right, 1 called pricing. pricing: 2 right.
        for _ in 0..3 {
            cm.add(0, 0);
        }
        cm.add(0, 1);
        cm.add(1, 1);
        cm.add(1, 1);
        cm.add(5, 0);

        assert_eq!(cm.total(), 6);
        assert!((accuracy(&cm) - 5.0 / 6.0).abs() < 1e-6);
        let reports = category_reports(&cm, &classes());
        assert_eq!(reports[0].category, "contact");
        assert_eq!(reports[0].support, 4);
        assert!((reports[0].precision - 1.0).abs() < 1e-6);
        assert!((reports[0].recall - 0.75).abs() < 1e-6);
        assert!((reports[1].precision - 2.0 / 3.0).abs() < 1e-6);
        assert!((reports[1].f1 - 0.8).abs() < 1e-6);
    }

    #[test]
    fn empty_matrix_is_zero_everywhere() {
        let cm = ConfusionMatrix::new(2);
        assert_eq!(accuracy(&cm), 0.0);
        assert!(category_reports(&cm, &classes())
            .iter()
            .all(|r| r.f1 == 0.0 && r.support == 0));
    }
}
