//! Model training module
//!
//! Provides:
//! - Holdout splitting with a seeded shuffle
//! - Linear regression and random forest regressors
//! - Regression and classification metrics
//! - The price trainer (best-of-candidates selection) and the fraud trainer
//!   (weak labels plus an isolation forest)

mod config;
mod decision_tree;
mod fraud;
mod linear_models;
mod models;
mod price;
mod random_forest;
mod split;

pub use config::{FraudTrainingConfig, PriceTrainingConfig, SplitConfig};
pub use decision_tree::{DecisionTree, TreeNode};
pub use fraud::{derive_weak_labels, FraudFit, FraudTrainer, FraudTrainingReport, WeakLabels, FRAUD_LABEL};
pub use linear_models::LinearRegression;
pub use models::{ClassMetrics, ClassificationReport, ConfusionCounts, ModelMetrics, Regressor};
pub use price::{
    CandidateReport, PriceFit, PriceModel, PriceTrainer, PriceTrainingReport, PriceTrainingStage,
};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{split_frame, split_indices, train_test_split, HoldoutSplit};
