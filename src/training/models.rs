//! Evaluation metrics and the regressor seam

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Metrics for model evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy (classification)
    pub accuracy: Option<f64>,
    /// Precision of the positive class (classification)
    pub precision: Option<f64>,
    /// Recall of the positive class (classification)
    pub recall: Option<f64>,
    /// F1 score of the positive class (classification)
    pub f1_score: Option<f64>,
    /// Mean Squared Error (regression)
    pub mse: Option<f64>,
    /// Root Mean Squared Error (regression)
    pub rmse: Option<f64>,
    /// Mean Absolute Error (regression)
    pub mae: Option<f64>,
    /// R-squared (regression)
    pub r2: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of features
    pub n_features: usize,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self {
            accuracy: None,
            precision: None,
            recall: None,
            f1_score: None,
            mse: None,
            rmse: None,
            mae: None,
            r2: None,
            training_time_secs: 0.0,
            n_features: 0,
            n_samples: 0,
        }
    }

    /// Compute binary classification metrics, `true` being the positive class
    pub fn compute_classification(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();
        if y_true.is_empty() {
            return metrics;
        }

        let counts = ConfusionCounts::from_labels(y_true, y_pred);
        metrics.accuracy = Some((counts.tp + counts.tn) as f64 / y_true.len() as f64);

        // Zero-denominator ratios are reported as 0
        let precision = ratio(counts.tp, counts.tp + counts.fp);
        let recall = ratio(counts.tp, counts.tp + counts.fn_);
        metrics.precision = Some(precision);
        metrics.recall = Some(recall);
        metrics.f1_score = Some(if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        });

        metrics
    }

    /// Compute regression metrics
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();
        if y_true.is_empty() {
            return metrics;
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        metrics.mse = Some(mse);
        metrics.rmse = Some(mse.sqrt());
        metrics.mae = Some(errors.iter().map(|e| e.abs()).sum::<f64>() / n);

        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();

        // A constant target scores 1 when fitted exactly, 0 otherwise
        metrics.r2 = Some(if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        });

        metrics
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary confusion matrix counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t, p) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    /// Number of actual positives
    pub fn positives(&self) -> usize {
        self.tp + self.fn_
    }

    /// Number of actual negatives
    pub fn negatives(&self) -> usize {
        self.tn + self.fp
    }
}

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Actual members of the class
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(hits: usize, false_alarms: usize, misses: usize) -> Self {
        let precision = ratio(hits, hits + false_alarms);
        let recall = ratio(hits, hits + misses);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1_score,
            support: hits + misses,
        }
    }
}

/// Per-class metrics of a binary classifier with their averages
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// The positive class
    pub positive: ClassMetrics,
    /// The negative class
    pub negative: ClassMetrics,
    /// Unweighted mean over both classes
    pub macro_avg: ClassMetrics,
    /// Mean weighted by support
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn from_counts(counts: &ConfusionCounts) -> Self {
        let positive = ClassMetrics::from_counts(counts.tp, counts.fp, counts.fn_);
        let negative = ClassMetrics::from_counts(counts.tn, counts.fn_, counts.fp);
        let total = positive.support + negative.support;

        let macro_avg = ClassMetrics {
            precision: (positive.precision + negative.precision) / 2.0,
            recall: (positive.recall + negative.recall) / 2.0,
            f1_score: (positive.f1_score + negative.f1_score) / 2.0,
            support: total,
        };
        let weigh = |p: f64, n: f64| {
            if total > 0 {
                (p * positive.support as f64 + n * negative.support as f64) / total as f64
            } else {
                0.0
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weigh(positive.precision, negative.precision),
            recall: weigh(positive.recall, negative.recall),
            f1_score: weigh(positive.f1_score, negative.f1_score),
            support: total,
        };

        Self {
            positive,
            negative,
            macro_avg,
            weighted_avg,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Trait for regression models that map a feature matrix to one value per row
pub trait Regressor: Send + Sync {
    /// Short human-readable model name
    fn name(&self) -> &'static str;

    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Width of the feature rows the fitted model accepts
    fn n_features(&self) -> Option<usize>;

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}
