//! Price model training: clean, split, preprocess, pick the best regressor

use crate::error::{Result, SmartPriceError};
use crate::export::{Artifact, ModelStore, PRICE_MODEL, PRICE_PREPROCESSOR};
use crate::preprocessing::{clean, numeric_column, FittedPreprocessor, Preprocessor, ProductSchema, PRICE};
use crate::utils::DataLoader;
use super::config::{PriceTrainingConfig, SplitConfig};
use super::linear_models::LinearRegression;
use super::models::{ModelMetrics, Regressor};
use super::random_forest::RandomForest;
use super::split::split_frame;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Fitted price regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PriceModel {
    Linear(LinearRegression),
    RandomForest(RandomForest),
}

impl PriceModel {
    /// Unfitted candidates, in evaluation order
    pub fn candidates(config: &PriceTrainingConfig) -> Vec<PriceModel> {
        vec![
            PriceModel::Linear(LinearRegression::new()),
            PriceModel::RandomForest(
                RandomForest::new_regressor(config.n_estimators)
                    .with_max_depth(config.max_depth)
                    .with_min_samples_split(config.min_samples_split)
                    .with_min_samples_leaf(config.min_samples_leaf)
                    .with_random_state(config.random_seed),
            ),
        ]
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            PriceModel::Linear(m) => m,
            PriceModel::RandomForest(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            PriceModel::Linear(m) => m,
            PriceModel::RandomForest(m) => m,
        }
    }
}

impl Regressor for PriceModel {
    fn name(&self) -> &'static str {
        self.as_regressor().name()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    fn n_features(&self) -> Option<usize> {
        self.as_regressor().n_features()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.as_regressor().feature_importances()
    }
}

/// Progress of a price training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTrainingStage {
    Loading,
    Loaded,
    Cleaned,
    Split,
    PreprocessorFit,
    CandidateTrained,
    BestSelected,
    Persisted,
}

impl fmt::Display for PriceTrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceTrainingStage::Loading => "loading",
            PriceTrainingStage::Loaded => "loaded",
            PriceTrainingStage::Cleaned => "cleaned",
            PriceTrainingStage::Split => "split",
            PriceTrainingStage::PreprocessorFit => "preprocessor_fit",
            PriceTrainingStage::CandidateTrained => "candidate_trained",
            PriceTrainingStage::BestSelected => "best_selected",
            PriceTrainingStage::Persisted => "persisted",
        };
        f.write_str(s)
    }
}

/// Held-out evaluation of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    pub metrics: ModelMetrics,
}

/// Outcome of a price training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTrainingReport {
    pub candidates: Vec<CandidateReport>,
    pub selected: String,
    pub best_r2: f64,
    pub n_rows_raw: usize,
    pub n_rows_clean: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    /// Output feature names paired with the selected model's importances
    pub feature_importances: Vec<(String, f64)>,
    /// Written artifact paths; empty when the run was not persisted
    pub artifacts: Vec<PathBuf>,
}

/// A fitted preprocessor/model pair with its evaluation
#[derive(Debug, Clone)]
pub struct PriceFit {
    pub preprocessor: FittedPreprocessor,
    pub model: PriceModel,
    pub report: PriceTrainingReport,
}

/// Trains and persists the price model
#[derive(Debug, Clone)]
pub struct PriceTrainer {
    store: ModelStore,
    config: PriceTrainingConfig,
    split: SplitConfig,
    schema: ProductSchema,
    loader: DataLoader,
}

impl PriceTrainer {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            config: PriceTrainingConfig::default(),
            split: SplitConfig::default(),
            schema: ProductSchema::products(),
            loader: DataLoader::new(),
        }
    }

    pub fn with_config(mut self, config: PriceTrainingConfig) -> Self {
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

    /// Load the CSV at `path`, train, and persist both price artifacts
    pub fn train_from_path(&self, path: impl AsRef<Path>) -> Result<PriceTrainingReport> {
        let df = self
            .loader
            .load_products(path, &self.schema)
            .inspect_err(|e| {
                error!(stage = %PriceTrainingStage::Loading, error = %e, "Price training failed");
            })?;
        self.train(&df)
    }

    /// Train on `df` and persist `price_preprocessor` and `price_model`
    /// together. Nothing is written unless every step succeeds.
    pub fn train(&self, df: &DataFrame) -> Result<PriceTrainingReport> {
        let mut stage = PriceTrainingStage::Loading;
        let result = self.fit_tracked(df, &mut stage).and_then(|fit| {
            let paths = self.store.commit(vec![
                Artifact::encode(PRICE_PREPROCESSOR, &fit.preprocessor)?,
                Artifact::encode(PRICE_MODEL, &fit.model)?,
            ])?;
            enter(&mut stage, PriceTrainingStage::Persisted);
            Ok(PriceTrainingReport {
                artifacts: paths,
                ..fit.report
            })
        });

        if let Err(e) = &result {
            error!(stage = %stage, error = %e, "Price training failed");
        }
        result
    }

    /// Run the pipeline without persisting anything
    pub fn fit(&self, df: &DataFrame) -> Result<PriceFit> {
        let mut stage = PriceTrainingStage::Loading;
        self.fit_tracked(df, &mut stage)
    }

    fn fit_tracked(&self, df: &DataFrame, stage: &mut PriceTrainingStage) -> Result<PriceFit> {
        let start = Instant::now();
        self.config.validate()?;
        self.split.validate()?;

        self.schema.validate(df)?;
        enter(stage, PriceTrainingStage::Loaded);

        let cleaned = clean(df)?;
        if cleaned.height() == 0 {
            return Err(SmartPriceError::EmptyInput(
                "no complete rows left after cleaning".to_string(),
            ));
        }
        enter(stage, PriceTrainingStage::Cleaned);

        let (train, test) = split_frame(&cleaned, self.split.test_fraction, self.split.random_seed)?;
        enter(stage, PriceTrainingStage::Split);

        let preprocessor = Preprocessor::from_schema(&self.schema, &[PRICE]).fit(&train)?;
        let x_train = preprocessor.transform(&train)?;
        let x_test = preprocessor.transform(&test)?;
        let y_train = Array1::from_vec(numeric_column(&train, PRICE)?);
        let y_test = Array1::from_vec(numeric_column(&test, PRICE)?);
        enter(stage, PriceTrainingStage::PreprocessorFit);

        let mut reports = Vec::new();
        let mut best: Option<(PriceModel, f64)> = None;

        for mut candidate in PriceModel::candidates(&self.config) {
            let fit_start = Instant::now();
            let name = candidate.name();
            if let Err(e) = candidate.fit(&x_train, &y_train) {
                warn!(candidate = name, error = %e, "Candidate failed to fit; skipped");
                continue;
            }
            let y_pred = match candidate.predict(&x_test) {
                Ok(pred) => pred,
                Err(e) => {
                    warn!(candidate = name, error = %e, "Candidate failed to predict; skipped");
                    continue;
                }
            };

            let mut metrics = ModelMetrics::compute_regression(&y_test, &y_pred);
            metrics.training_time_secs = fit_start.elapsed().as_secs_f64();
            metrics.n_features = x_train.ncols();
            let r2 = metrics.r2.unwrap_or(f64::NEG_INFINITY);

            info!(
                stage = %PriceTrainingStage::CandidateTrained,
                candidate = name,
                mse = metrics.mse.unwrap_or(f64::NAN),
                r2,
                elapsed_ms = fit_start.elapsed().as_millis() as u64,
                "Candidate evaluated"
            );
            *stage = PriceTrainingStage::CandidateTrained;
            reports.push(CandidateReport {
                name: name.to_string(),
                metrics,
            });

            // Strictly greater: ties keep the earlier candidate
            if r2 > best.as_ref().map_or(f64::NEG_INFINITY, |(_, best_r2)| *best_r2) {
                best = Some((candidate, r2));
            }
        }

        let (model, best_r2) = best.ok_or_else(|| {
            SmartPriceError::TrainingError("no price candidate produced a usable score".to_string())
        })?;
        enter(stage, PriceTrainingStage::BestSelected);
        info!(selected = model.name(), r2 = best_r2, "Best price model selected");

        let feature_importances = model
            .feature_importances()
            .map(|imp| preprocessor.feature_names().into_iter().zip(imp.iter().copied()).collect())
            .unwrap_or_default();

        let report = PriceTrainingReport {
            candidates: reports,
            selected: model.name().to_string(),
            best_r2,
            n_rows_raw: df.height(),
            n_rows_clean: cleaned.height(),
            n_train: train.height(),
            n_test: test.height(),
            n_features: preprocessor.n_features(),
            feature_importances,
            artifacts: Vec::new(),
        };

        info!(
            rows = cleaned.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Price model fitted"
        );
        Ok(PriceFit {
            preprocessor,
            model,
            report,
        })
    }
}

fn enter(stage: &mut PriceTrainingStage, next: PriceTrainingStage) {
    *stage = next;
    info!(stage = %next, "Price training stage");
}
