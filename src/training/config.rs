//! Training configuration

use crate::anomaly::Contamination;
use crate::error::{Result, SmartPriceError};
use serde::{Deserialize, Serialize};

/// Holdout split parameters shared by both trainers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed of the row shuffle
    pub random_seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            random_seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(SmartPriceError::ConfigError(format!(
                "split.test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Price model candidates and their hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTrainingConfig {
    /// Trees in the random forest candidate
    pub n_estimators: usize,
    /// Depth cap of each forest tree; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum rows required to split a forest node
    pub min_samples_split: usize,
    /// Minimum rows in a forest leaf
    pub min_samples_leaf: usize,
    /// Seed of the forest
    pub random_seed: u64,
}

impl Default for PriceTrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_seed: 42,
        }
    }
}

impl PriceTrainingConfig {
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(SmartPriceError::ConfigError(
                "price.n_estimators must be positive".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(SmartPriceError::ConfigError(format!(
                "price.min_samples_split must be >= 2 and price.min_samples_leaf >= 1, got {} and {}",
                self.min_samples_split, self.min_samples_leaf
            )));
        }
        Ok(())
    }
}

/// Weak-label heuristics and isolation forest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FraudTrainingConfig {
    /// Listings priced strictly above this are labelled fraud
    pub price_threshold: f64,
    /// Listings rated strictly below this are labelled fraud
    pub rating_threshold: f64,
    /// Trees in the isolation forest
    pub n_estimators: usize,
    /// Rows drawn per tree (capped at the training size)
    pub max_samples: usize,
    pub contamination: Contamination,
    pub random_seed: u64,
}

impl Default for FraudTrainingConfig {
    fn default() -> Self {
        Self {
            price_threshold: 5000.0,
            rating_threshold: 1.0,
            n_estimators: 100,
            max_samples: 256,
            contamination: Contamination::Auto,
            random_seed: 42,
        }
    }
}

impl FraudTrainingConfig {
    pub fn with_thresholds(mut self, price_threshold: f64, rating_threshold: f64) -> Self {
        self.price_threshold = price_threshold;
        self.rating_threshold = rating_threshold;
        self
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_contamination(mut self, contamination: Contamination) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 || self.max_samples == 0 {
            return Err(SmartPriceError::ConfigError(
                "fraud.n_estimators and fraud.max_samples must be positive".to_string(),
            ));
        }
        if let Contamination::Ratio(r) = self.contamination {
            if !(r > 0.0 && r <= 0.5) {
                return Err(SmartPriceError::ConfigError(format!(
                    "fraud.contamination must lie in (0, 0.5], got {}",
                    r
                )));
            }
        }
        Ok(())
    }
}
