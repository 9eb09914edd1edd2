use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Model evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Macro-averaged precision
    pub precision: f64,

    /// Macro-averaged recall
    pub recall: f64,

    /// Macro-averaged F1 score
    pub f1_score: f64,

    /// Per-class metrics, keyed by class label
    pub per_class_metrics: HashMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            per_class_metrics: HashMap::new(),
        }
    }

    /// Compute accuracy and macro-averaged precision/recall/F1
    pub fn calculate(y_true: &[i32], y_pred: &[i32], classes: &[i32]) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 || classes.is_empty() {
            return Self::new();
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        let accuracy = correct as f64 / n_samples as f64;

        let mut per_class = HashMap::new();

        for &class in classes {
            let tp = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(t, p)| **t == class && **p == class)
                .count();

            let fp = y_pred
                .iter()
                .zip(y_true.iter())
                .filter(|(p, t)| **p == class && **t != class)
                .count();

            let fn_count = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(t, p)| **t == class && **p != class)
                .count();

            let precision = if tp + fp > 0 {
                tp as f64 / (tp + fp) as f64
            } else {
                0.0
            };

            let recall = if tp + fn_count > 0 {
                tp as f64 / (tp + fn_count) as f64
            } else {
                0.0
            };

            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            let support = y_true.iter().filter(|&&t| t == class).count();

            per_class.insert(
                format!("class_{}", class),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1,
                    support,
                },
            );
        }

        let n_classes = classes.len() as f64;
        let avg_precision: f64 =
            per_class.values().map(|m| m.precision).sum::<f64>() / n_classes;
        let avg_recall: f64 = per_class.values().map(|m| m.recall).sum::<f64>() / n_classes;
        let avg_f1: f64 = per_class.values().map(|m| m.f1_score).sum::<f64>() / n_classes;

        Self {
            accuracy,
            precision: avg_precision,
            recall: avg_recall,
            f1_score: avg_f1,
            per_class_metrics: per_class,
        }
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = vec![0, 1, 1, 0];
        let metrics = ModelMetrics::calculate(&y, &y, &[0, 1]);

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1_score, 1.0);
    }

    #[test]
    fn test_partial_accuracy() {
        let y_true = vec![0, 0, 1, 1];
        let y_pred = vec![0, 1, 1, 1];
        let metrics = ModelMetrics::calculate(&y_true, &y_pred, &[0, 1]);

        assert_eq!(metrics.accuracy, 0.75);

        let class_one = &metrics.per_class_metrics["class_1"];
        assert_eq!(class_one.support, 2);
        assert_eq!(class_one.recall, 1.0);
        assert!((class_one.precision - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_inputs() {
        let metrics = ModelMetrics::calculate(&[], &[], &[0, 1]);
        assert_eq!(metrics.accuracy, 0.0);
        assert!(metrics.per_class_metrics.is_empty());
    }
}
