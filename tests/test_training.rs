//! Integration test: splitting, regressors, isolation forest and both trainers

use ndarray::{array, Array1, Array2};
use polars::prelude::*;
use smartprice::anomaly::{AnomalyDetector, Contamination, IsolationForest};
use smartprice::error::SmartPriceError;
use smartprice::export::ModelStore;
use smartprice::training::{
    derive_weak_labels, split_frame, split_indices, FraudTrainer, FraudTrainingConfig,
    LinearRegression, PriceTrainer, PriceTrainingConfig, RandomForest, Regressor,
};
use tempfile::tempdir;

const BRANDS: [&str; 3] = ["Acme", "Globex", "Initech"];
const CATEGORIES: [&str; 2] = ["Shoes", "Bags"];
const MATERIALS: [&str; 3] = ["Leather", "Canvas", "Nylon"];

/// Listings whose price follows brand, category, rating and volume; every
/// 20th row is priced far above the rest.
fn create_products(n: usize) -> DataFrame {
    let mut brand = Vec::with_capacity(n);
    let mut category = Vec::with_capacity(n);
    let mut material = Vec::with_capacity(n);
    let mut rating = Vec::with_capacity(n);
    let mut transactions = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);

    for i in 0..n {
        let b = i % BRANDS.len();
        let c = (i / 3) % CATEGORIES.len();
        let m = (i / 2) % MATERIALS.len();
        let r = 1.0 + (i % 40) as f64 / 10.0;
        let t = 10 + ((i * 7) % 200) as i64;

        let mut p = 50.0 + 40.0 * b as f64 + 25.0 * c as f64 + 10.0 * m as f64 + 12.0 * r
            + 0.3 * t as f64;
        if i % 20 == 19 {
            p += 6000.0;
        }

        brand.push(BRANDS[b]);
        category.push(CATEGORIES[c]);
        material.push(MATERIALS[m]);
        rating.push(r);
        transactions.push(t);
        price.push(p);
    }

    df!(
        "brand" => &brand,
        "category" => &category,
        "material" => &material,
        "rating" => &rating,
        "transactions" => &transactions,
        "price" => &price
    )
    .unwrap()
}

fn small_price_config() -> PriceTrainingConfig {
    PriceTrainingConfig::default().with_n_estimators(20)
}

fn small_fraud_config() -> FraudTrainingConfig {
    FraudTrainingConfig::default().with_n_estimators(30)
}

// ─── Splitting ─────────────────────────────────────────────────────────────────

#[test]
fn test_split_is_deterministic_and_disjoint() {
    let a = split_indices(100, 0.2, 42).unwrap();
    let b = split_indices(100, 0.2, 42).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.n_test(), 20);
    assert_eq!(a.n_train(), 80);

    let mut all: Vec<usize> = a.train_indices.iter().chain(&a.test_indices).copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..100).collect::<Vec<_>>());

    let c = split_indices(100, 0.2, 7).unwrap();
    assert_ne!(a.test_indices, c.test_indices);
}

#[test]
fn test_split_rounds_test_side_up() {
    let split = split_indices(11, 0.2, 42).unwrap();
    assert_eq!(split.n_test(), 3);
    assert_eq!(split.n_train(), 8);
}

#[test]
fn test_split_rejects_degenerate_inputs() {
    assert!(split_indices(10, 0.0, 42).is_err());
    assert!(split_indices(10, 1.0, 42).is_err());
    assert!(split_indices(1, 0.2, 42).is_err());
}

#[test]
fn test_split_frame_preserves_rows() {
    let df = create_products(50);
    let (train, test) = split_frame(&df, 0.2, 42).unwrap();
    assert_eq!(train.height(), 40);
    assert_eq!(test.height(), 10);
    assert_eq!(train.width(), df.width());
}

// ─── Regressors ────────────────────────────────────────────────────────────────

#[test]
fn test_linear_regression_recovers_coefficients() {
    let x: Array2<f64> =
        Array2::from_shape_fn((30, 2), |(i, j)| (i * (j + 1)) as f64 + (j * (i % 3)) as f64);
    let y: Array1<f64> = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| -0.5 * v) + 3.0;

    let mut model = LinearRegression::new();
    model.fit(&x, &y).unwrap();
    let pred = model.predict(&x).unwrap();

    for (p, t) in pred.iter().zip(y.iter()) {
        assert!((p - t).abs() < 1e-6, "predicted {} expected {}", p, t);
    }
}

#[test]
fn test_random_forest_is_seed_deterministic() {
    let x = Array2::from_shape_fn((60, 3), |(i, j)| ((i * 13 + j * 7) % 17) as f64);
    let y = x.column(0).mapv(|v| v * 1.5) + x.column(2);

    let mut a = RandomForest::new_regressor(15).with_random_state(42);
    let mut b = RandomForest::new_regressor(15).with_random_state(42);
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();

    assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    assert_eq!(Regressor::n_features(&a), Some(3));
}

#[test]
fn test_regressor_rejects_wrong_width() {
    let mut model = LinearRegression::new();
    model
        .fit(&array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]], &array![1.0, 2.0, 3.0, 4.0])
        .unwrap();
    assert!(matches!(
        model.predict(&array![[1.0]]),
        Err(SmartPriceError::ShapeError { .. })
    ));
}

// ─── Isolation forest ──────────────────────────────────────────────────────────

#[test]
fn test_isolation_forest_flags_outlier() {
    let mut rows: Vec<f64> = (0..200)
        .flat_map(|i| [((i * 37) % 100) as f64 / 100.0, ((i * 61) % 100) as f64 / 100.0])
        .collect();
    rows.extend_from_slice(&[50.0, 50.0]);
    let x = Array2::from_shape_vec((201, 2), rows).unwrap();

    let mut forest = IsolationForest::new().with_n_estimators(100).with_seed(42);
    forest.fit(&x).unwrap();
    let scores = forest.score_samples(&x).unwrap();

    let outlier = scores[200];
    assert!(scores.iter().take(200).all(|&s| s < outlier));
    assert!(outlier > 0.5);
    assert_eq!(forest.predict(&x).unwrap()[200], -1);
}

#[test]
fn test_isolation_forest_ratio_contamination() {
    let x = Array2::from_shape_fn((100, 2), |(i, j)| ((i * [17, 29][j]) % 100) as f64);
    let mut forest = IsolationForest::new()
        .with_contamination(Contamination::Ratio(0.1))
        .with_seed(42);
    forest.fit(&x).unwrap();

    let result = forest.detect(&x).unwrap();
    // ten rows lie above the cut unless the 10th and 11th scores tie
    assert!((5..=10).contains(&result.n_anomalies));
}

// ─── Weak labels ───────────────────────────────────────────────────────────────

#[test]
fn test_weak_labels_follow_thresholds() {
    let df = df!(
        "price" => &[100.0, 6000.0, 200.0, 5000.0],
        "rating" => &[4.0, 4.0, 0.5, 1.0]
    )
    .unwrap();

    let weak = derive_weak_labels(&df, &FraudTrainingConfig::default()).unwrap();
    assert_eq!(weak.labels, vec![false, true, true, false]);
    assert!(!weak.forced_first);
}

#[test]
fn test_weak_labels_force_first_row() {
    let df = df!("price" => &[10.0, 20.0], "rating" => &[4.0, 5.0]).unwrap();
    let weak = derive_weak_labels(&df, &FraudTrainingConfig::default()).unwrap();
    assert_eq!(weak.labels, vec![true, false]);
    assert!(weak.forced_first);
    assert_eq!(weak.n_positive(), 1);
}

// ─── Trainers ──────────────────────────────────────────────────────────────────

#[test]
fn test_price_trainer_selects_best_candidate() {
    let dir = tempdir().unwrap();
    let trainer = PriceTrainer::new(ModelStore::new(dir.path())).with_config(small_price_config());

    let fit = trainer.fit(&create_products(120)).unwrap();
    let report = &fit.report;

    assert_eq!(report.candidates.len(), 2);
    assert_eq!(report.n_train + report.n_test, report.n_rows_clean);
    assert_eq!(report.n_test, 24);
    let best = report
        .candidates
        .iter()
        .map(|c| c.metrics.r2.unwrap())
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(report.best_r2, best);
    assert_eq!(fit.model.name(), report.selected);
    assert_eq!(fit.model.n_features(), Some(fit.preprocessor.n_features()));
    assert!(report.artifacts.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0, "fit must not persist");
}

#[test]
fn test_price_trainer_drops_duplicates_before_split() {
    let df = create_products(60);
    let doubled = df.vstack(&df).unwrap();

    let trainer = PriceTrainer::new(ModelStore::new("unused")).with_config(small_price_config());
    let report = trainer.fit(&doubled).unwrap().report;

    assert_eq!(report.n_rows_raw, 120);
    assert_eq!(report.n_rows_clean, 60);
}

fn with_nan_rating_row(df: &DataFrame) -> DataFrame {
    let bad = df!(
        "brand" => &["Acme"],
        "category" => &["Shoes"],
        "material" => &["Leather"],
        "rating" => &[f64::NAN],
        "transactions" => &[11i64],
        "price" => &[50.0]
    )
    .unwrap();
    df.vstack(&bad).unwrap()
}

#[test]
fn test_price_trainer_drops_nan_rows() {
    let df = with_nan_rating_row(&create_products(40));

    let trainer = PriceTrainer::new(ModelStore::new("unused")).with_config(small_price_config());
    let fit = trainer.fit(&df).unwrap();

    assert_eq!(fit.report.n_rows_raw, 41);
    assert_eq!(fit.report.n_rows_clean, 40);
    assert!(fit.report.best_r2.is_finite());
    assert!(fit.report.candidates.iter().all(|c| c.metrics.r2.unwrap().is_finite()));
}

#[test]
fn test_fraud_trainer_drops_nan_rows() {
    let df = with_nan_rating_row(&create_products(40));

    let trainer = FraudTrainer::new(ModelStore::new("unused")).with_config(small_fraud_config());
    let report = trainer.fit(&df).unwrap().report;

    assert_eq!(report.n_rows_clean, 40);
    assert_eq!(report.n_train + report.n_test, 40);
}

#[test]
fn test_price_trainer_requires_schema_columns() {
    let df = create_products(30).drop("material").unwrap();
    let trainer = PriceTrainer::new(ModelStore::new("unused"));
    assert!(matches!(
        trainer.fit(&df),
        Err(SmartPriceError::FeatureNotFound(_))
    ));
}

#[test]
fn test_fraud_trainer_reports_against_weak_labels() {
    let trainer = FraudTrainer::new(ModelStore::new("unused")).with_config(small_fraud_config());
    let fit = trainer.fit(&create_products(200)).unwrap();
    let report = &fit.report;

    assert_eq!(report.n_weak_positive, 10);
    assert!(!report.forced_label);
    assert_eq!(report.n_test, 40);
    assert_eq!(report.confusion.positives() + report.confusion.negatives(), 40);
    // price stays a feature for the detector
    assert_eq!(fit.preprocessor.n_features(), 3 + 8);
    assert!(!fit
        .preprocessor
        .feature_names()
        .iter()
        .any(|n| n.starts_with("is_fraud")));
    assert!(report.metrics.accuracy.is_some());
}

#[test]
fn test_fraud_trainer_forces_label_when_nothing_matches() {
    let config = small_fraud_config().with_thresholds(1e9, 0.0);
    let trainer = FraudTrainer::new(ModelStore::new("unused")).with_config(config);
    let report = trainer.fit(&create_products(50)).unwrap().report;

    assert!(report.forced_label);
    assert_eq!(report.n_weak_positive, 1);
}
