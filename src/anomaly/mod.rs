//! Anomaly detection module
//!
//! Provides the unsupervised detector behind fraud flagging:
//! - Isolation Forest with `auto` or ratio contamination
//! - Sentinel labels (`-1` anomalous, `1` normal) and their boolean mapping

mod isolation_forest;

pub use isolation_forest::{Contamination, IsolationForest, IsolationTree};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Label emitted for anomalous rows
pub const ANOMALOUS: i32 = -1;
/// Label emitted for normal rows
pub const NORMAL: i32 = 1;

/// Map a detector label to the fraud flag
#[inline]
pub fn is_anomalous(label: i32) -> bool {
    label == ANOMALOUS
}

/// Anomaly detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Anomaly scores (higher = more anomalous)
    pub scores: Array1<f64>,
    /// Binary labels (-1 = anomaly, 1 = normal)
    pub labels: Array1<i32>,
    /// Threshold used for classification
    pub threshold: f64,
    /// Number of anomalies detected
    pub n_anomalies: usize,
}

impl AnomalyResult {
    /// Labels as fraud flags
    pub fn flags(&self) -> Vec<bool> {
        self.labels.iter().map(|&l| is_anomalous(l)).collect()
    }
}

/// Trait for anomaly detectors
pub trait AnomalyDetector: Send + Sync {
    /// Fit the detector on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Compute anomaly scores for new data
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Predict labels (-1 = anomaly, 1 = normal)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>>;

    /// Fit and predict in one step
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Get detection results with scores and labels
    fn detect(&self, x: &Array2<f64>) -> Result<AnomalyResult> {
        let scores = self.score_samples(x)?;
        let threshold = self.threshold();
        let labels = scores.mapv(|s| if s > threshold { ANOMALOUS } else { NORMAL });
        let n_anomalies = labels.iter().filter(|&&l| is_anomalous(l)).count();

        Ok(AnomalyResult {
            scores,
            labels,
            threshold,
            n_anomalies,
        })
    }

    /// Get the decision threshold; rows scoring strictly above it are anomalous
    fn threshold(&self) -> f64;
}
