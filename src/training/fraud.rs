//! Fraud model training on heuristic weak labels

use crate::anomaly::{AnomalyDetector, IsolationForest};
use crate::error::{Result, SmartPriceError};
use crate::export::{Artifact, ModelStore, FRAUD_MODEL, FRAUD_PREPROCESSOR};
use crate::preprocessing::{clean, numeric_column, FittedPreprocessor, Preprocessor, ProductSchema, PRICE, RATING};
use crate::utils::DataLoader;
use super::config::{FraudTrainingConfig, SplitConfig};
use super::models::{ClassificationReport, ConfusionCounts, ModelMetrics};
use super::split::split_frame;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Name of the weak-label column added to the cleaned table
pub const FRAUD_LABEL: &str = "is_fraud";

/// Heuristic fraud labels for a cleaned table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakLabels {
    pub labels: Vec<bool>,
    /// The first row was forced positive because no row matched
    pub forced_first: bool,
}

impl WeakLabels {
    pub fn n_positive(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

/// Label a row fraudulent when `price > price_threshold` or
/// `rating < rating_threshold`.
///
/// When no row qualifies, the first row is labelled fraudulent so the
/// evaluation always has a positive class.
pub fn derive_weak_labels(df: &DataFrame, config: &FraudTrainingConfig) -> Result<WeakLabels> {
    let prices = numeric_column(df, PRICE)?;
    let ratings = numeric_column(df, RATING)?;

    let mut labels: Vec<bool> = prices
        .iter()
        .zip(ratings.iter())
        .map(|(&price, &rating)| price > config.price_threshold || rating < config.rating_threshold)
        .collect();

    let forced_first = !labels.is_empty() && !labels.iter().any(|&l| l);
    if forced_first {
        labels[0] = true;
        warn!(
            price_threshold = config.price_threshold,
            rating_threshold = config.rating_threshold,
            "No row matched the fraud heuristics; labelling the first row as fraud"
        );
    }

    Ok(WeakLabels {
        labels,
        forced_first,
    })
}

/// Outcome of a fraud training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudTrainingReport {
    /// Accuracy, precision, recall and F1 against the weak labels
    pub metrics: ModelMetrics,
    pub confusion: ConfusionCounts,
    /// Per-class precision, recall and F1 for fraud and normal rows
    pub classes: ClassificationReport,
    /// Test rows flagged anomalous
    pub n_flagged: usize,
    /// Weak positives over the whole cleaned table
    pub n_weak_positive: usize,
    pub forced_label: bool,
    pub threshold: f64,
    pub n_rows_clean: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub artifacts: Vec<PathBuf>,
}

/// A fitted fraud preprocessor/detector pair with its evaluation
#[derive(Debug, Clone)]
pub struct FraudFit {
    pub preprocessor: FittedPreprocessor,
    pub model: IsolationForest,
    pub report: FraudTrainingReport,
}

/// Trains and persists the fraud detector
#[derive(Debug, Clone)]
pub struct FraudTrainer {
    store: ModelStore,
    config: FraudTrainingConfig,
    split: SplitConfig,
    schema: ProductSchema,
    loader: DataLoader,
}

impl FraudTrainer {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            config: FraudTrainingConfig::default(),
            split: SplitConfig::default(),
            schema: ProductSchema::products(),
            loader: DataLoader::new(),
        }
    }

    pub fn with_config(mut self, config: FraudTrainingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_schema(mut self, schema: ProductSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Load the CSV at `path`, train, and persist both fraud artifacts
    pub fn train_from_path(&self, path: impl AsRef<Path>) -> Result<FraudTrainingReport> {
        let df = self
            .loader
            .load_products(path, &self.schema)
            .inspect_err(|e| error!(stage = "loading", error = %e, "Fraud training failed"))?;
        self.train(&df)
    }

    /// Train on `df` and persist `fraud_preprocessor` and `fraud_model`
    pub fn train(&self, df: &DataFrame) -> Result<FraudTrainingReport> {
        let result = self.fit(df).and_then(|fit| {
            let paths = self.store.commit(vec![
                Artifact::encode(FRAUD_PREPROCESSOR, &fit.preprocessor)?,
                Artifact::encode(FRAUD_MODEL, &fit.model)?,
            ])?;
            Ok(FraudTrainingReport {
                artifacts: paths,
                ..fit.report
            })
        });

        if let Err(e) = &result {
            error!(error = %e, "Fraud training failed");
        }
        result
    }

    /// Run the pipeline without persisting anything
    pub fn fit(&self, df: &DataFrame) -> Result<FraudFit> {
        let start = Instant::now();
        self.config.validate()?;
        self.split.validate()?;
        self.schema.validate(df)?;

        let mut cleaned = clean(df)?;
        if cleaned.height() == 0 {
            return Err(SmartPriceError::EmptyInput(
                "no complete rows left after cleaning".to_string(),
            ));
        }

        let weak = derive_weak_labels(&cleaned, &self.config)?;
        let label_column: Vec<bool> = weak.labels.clone();
        cleaned.with_column(Series::new(FRAUD_LABEL.into(), label_column))?;
        info!(
            rows = cleaned.height(),
            positives = weak.n_positive(),
            forced = weak.forced_first,
            "Weak fraud labels derived"
        );

        let (train, test) = split_frame(&cleaned, self.split.test_fraction, self.split.random_seed)?;

        // The label column is not part of the schema, so it never becomes a feature
        let preprocessor = Preprocessor::from_schema(&self.schema, &[]).fit(&train)?;
        let x_train = preprocessor.transform(&train)?;
        let x_test = preprocessor.transform(&test)?;

        let mut model = IsolationForest::new()
            .with_n_estimators(self.config.n_estimators)
            .with_max_samples(self.config.max_samples)
            .with_contamination(self.config.contamination)
            .with_seed(self.config.random_seed);
        model.fit(&x_train)?;

        let detection = model.detect(&x_test)?;
        let y_pred = detection.flags();
        let y_true = bool_column(&test, FRAUD_LABEL)?;

        let mut metrics = ModelMetrics::compute_classification(&y_true, &y_pred);
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = x_train.ncols();
        let confusion = ConfusionCounts::from_labels(&y_true, &y_pred);
        let classes = ClassificationReport::from_counts(&confusion);

        info!(
            accuracy = metrics.accuracy.unwrap_or(f64::NAN),
            precision = metrics.precision.unwrap_or(f64::NAN),
            recall = metrics.recall.unwrap_or(f64::NAN),
            f1 = metrics.f1_score.unwrap_or(f64::NAN),
            normal_precision = classes.negative.precision,
            normal_recall = classes.negative.recall,
            normal_f1 = classes.negative.f1_score,
            macro_f1 = classes.macro_avg.f1_score,
            weighted_f1 = classes.weighted_avg.f1_score,
            support_fraud = confusion.positives(),
            support_normal = confusion.negatives(),
            flagged = detection.n_anomalies,
            "Fraud detector evaluated against weak labels"
        );

        let report = FraudTrainingReport {
            metrics,
            confusion,
            classes,
            n_flagged: y_pred.iter().filter(|&&f| f).count(),
            n_weak_positive: weak.n_positive(),
            forced_label: weak.forced_first,
            threshold: detection.threshold,
            n_rows_clean: cleaned.height(),
            n_train: train.height(),
            n_test: test.height(),
            n_features: preprocessor.n_features(),
            artifacts: Vec::new(),
        };

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fraud detector fitted"
        );
        Ok(FraudFit {
            preprocessor,
            model,
            report,
        })
    }
}

fn bool_column(df: &DataFrame, name: &str) -> Result<Vec<bool>> {
    let column = df
        .column(name)
        .map_err(|_| SmartPriceError::FeatureNotFound(name.to_string()))?;
    Ok(column.bool()?.into_iter().map(|v| v.unwrap_or(false)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{BRAND, CATEGORY, MATERIAL, TRANSACTIONS};
    use tempfile::tempdir;

    fn products(prices: &[f64], ratings: &[f64]) -> DataFrame {
        let n = prices.len();
        let brand: Vec<String> = (0..n).map(|i| format!("brand{}", i % 4)).collect();
        let category: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "Shoes" } else { "Bags" }).collect();
        let material: Vec<&str> = (0..n).map(|_| "Leather").collect();
        let transactions: Vec<i64> = (0..n as i64).map(|i| 10 + i).collect();
        df!(
            BRAND => brand,
            CATEGORY => category,
            MATERIAL => material,
            RATING => ratings,
            TRANSACTIONS => transactions,
            PRICE => prices
        )
        .unwrap()
    }

    #[test]
    fn test_weak_labels_follow_heuristics() {
        let df = products(&[100.0, 6000.0, 200.0, 300.0], &[4.0, 4.0, 0.5, 1.0]);
        let weak = derive_weak_labels(&df, &FraudTrainingConfig::default()).unwrap();
        assert_eq!(weak.labels, vec![false, true, true, false]);
        assert!(!weak.forced_first);
    }

    #[test]
    fn test_weak_labels_force_first_row() {
        let df = products(&[100.0, 200.0, 300.0], &[4.0, 3.0, 2.0]);
        let weak = derive_weak_labels(&df, &FraudTrainingConfig::default()).unwrap();
        assert_eq!(weak.labels, vec![true, false, false]);
        assert!(weak.forced_first);
        assert_eq!(weak.n_positive(), 1);
    }

    #[test]
    fn test_train_persists_fraud_pair() {
        let prices: Vec<f64> = (0..40)
            .map(|i| if i == 7 { 9000.0 } else { 100.0 + i as f64 })
            .collect();
        let ratings: Vec<f64> = (0..40).map(|i| 2.0 + (i % 3) as f64).collect();
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path());

        let report = FraudTrainer::new(store.clone())
            .with_config(FraudTrainingConfig::default().with_n_estimators(25))
            .train(&products(&prices, &ratings))
            .unwrap();

        assert_eq!(report.n_train + report.n_test, 40);
        assert_eq!(report.n_weak_positive, 1);
        assert_eq!(report.n_features, 3 + 4 + 2 + 1);
        assert!(report.metrics.accuracy.is_some());
        assert_eq!(report.classes.positive.support, report.confusion.positives());
        assert_eq!(report.classes.negative.support, report.confusion.negatives());
        assert_eq!(report.classes.positive.f1_score, report.metrics.f1_score.unwrap());
        assert!(store.exists(FRAUD_MODEL));
        assert!(store.exists(FRAUD_PREPROCESSOR));

        let model: IsolationForest = store.load(FRAUD_MODEL).unwrap();
        assert_eq!(model.n_features(), Some(report.n_features));
    }
}
