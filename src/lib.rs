//! SmartPrice - price estimation and fraud flagging for product listings
//!
//! This crate trains two models over a table of product listings and serves
//! single-record predictions from the persisted artifacts:
//! - A price regressor, chosen between linear regression and a random forest
//! - A fraud detector, an isolation forest checked against weak labels
//!
//! # Modules
//!
//! ## Data
//! - [`utils`] - CSV loading and file inspection
//! - [`preprocessing`] - Cleaning, scaling and one-hot encoding
//!
//! ## Models
//! - [`training`] - Splitting, regressors, metrics and both trainers
//! - [`anomaly`] - Isolation Forest
//!
//! ## Serving
//! - [`export`] - Artifact store and load-once cache
//! - [`inference`] - Single-record predictor
//!
//! ## Services
//! - [`config`] - Pipeline configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod utils;
pub mod preprocessing;

// Models
pub mod training;
pub mod anomaly;

// Serving
pub mod export;
pub mod inference;

// Services
pub mod cli;

pub use error::{Result, SmartPriceError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SmartPriceError};

    // Configuration
    pub use crate::config::PipelineConfig;
    pub use crate::training::{FraudTrainingConfig, PriceTrainingConfig, SplitConfig};

    // Data
    pub use crate::preprocessing::{clean, FittedPreprocessor, Preprocessor, ProductSchema};
    pub use crate::utils::DataLoader;

    // Training
    pub use crate::training::{
        FraudTrainer, FraudTrainingReport, LinearRegression, PriceModel, PriceTrainer,
        PriceTrainingReport, RandomForest, Regressor,
    };

    // Anomaly detection
    pub use crate::anomaly::{AnomalyDetector, Contamination, IsolationForest};

    // Serving
    pub use crate::export::ModelStore;
    pub use crate::inference::{Prediction, Predictor, ProductRecord};
}
