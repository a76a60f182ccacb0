//! Serve-time predictor over persisted artifact pairs

use crate::anomaly::{is_anomalous, AnomalyDetector, IsolationForest};
use crate::error::{Result, SmartPriceError};
use crate::export::{
    ArtifactCache, CacheState, ModelStore, FRAUD_MODEL, FRAUD_PREPROCESSOR, PRICE_MODEL,
    PRICE_PREPROCESSOR,
};
use crate::preprocessing::FittedPreprocessor;
use crate::training::{PriceModel, Regressor};
use super::record::{Prediction, ProductRecord};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// A model with the preprocessor it was trained against
#[derive(Debug)]
struct PricePair {
    preprocessor: FittedPreprocessor,
    model: PriceModel,
}

#[derive(Debug)]
struct FraudPair {
    preprocessor: FittedPreprocessor,
    model: IsolationForest,
}

/// Loads each artifact pair once and answers single-record predictions.
///
/// Failures never escape as errors: a pair that cannot be loaded yields
/// [`Prediction::Unavailable`] until [`Predictor::reload`], and a request
/// that cannot be scored yields [`Prediction::Fault`].
#[derive(Debug)]
pub struct Predictor {
    store: ModelStore,
    price: ArtifactCache<PricePair>,
    fraud: ArtifactCache<FraudPair>,
}

impl Predictor {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            price: ArtifactCache::new(PRICE_MODEL),
            fraud: ArtifactCache::new(FRAUD_MODEL),
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Estimate the price of a listing
    pub fn predict_price(&self, record: &ProductRecord) -> Prediction<f64> {
        let start = Instant::now();
        let pair = match self.price_pair() {
            Ok(pair) => pair,
            Err(e) => return Prediction::Unavailable(e.to_string()),
        };

        let outcome = record.to_frame().and_then(|df| {
            let x = pair.preprocessor.transform(&df)?;
            let y = pair.model.predict(&x)?;
            y.get(0).copied().ok_or_else(|| {
                SmartPriceError::PredictionFault("model returned no output".to_string())
            })
        });

        match outcome {
            Ok(price) if price.is_finite() => {
                debug!(
                    price,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Price predicted"
                );
                Prediction::Value(price)
            }
            Ok(price) => {
                error!(artifact = PRICE_MODEL, value = price, "Non-finite price prediction");
                Prediction::Fault(format!("model produced non-finite price {}", price))
            }
            Err(e) => {
                error!(artifact = PRICE_MODEL, error = %e, "Price prediction failed");
                Prediction::Fault(e.to_string())
            }
        }
    }

    /// Flag a listing as fraudulent; a missing price is treated as `0.0`
    pub fn predict_fraud(&self, record: &ProductRecord) -> Prediction<bool> {
        let start = Instant::now();
        let pair = match self.fraud_pair() {
            Ok(pair) => pair,
            Err(e) => return Prediction::Unavailable(e.to_string()),
        };

        let outcome = record.to_frame().and_then(|df| {
            let x = pair.preprocessor.transform(&df)?;
            let labels = pair.model.predict(&x)?;
            labels.get(0).copied().ok_or_else(|| {
                SmartPriceError::PredictionFault("detector returned no output".to_string())
            })
        });

        match outcome {
            Ok(label) => {
                let flagged = is_anomalous(label);
                debug!(
                    flagged,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Fraud check done"
                );
                Prediction::Value(flagged)
            }
            Err(e) => {
                error!(artifact = FRAUD_MODEL, error = %e, "Fraud prediction failed");
                Prediction::Fault(e.to_string())
            }
        }
    }

    /// Load both pairs now instead of on first request.
    ///
    /// Both are attempted; the first failure is returned.
    pub fn warm_up(&self) -> Result<()> {
        let price = self.price_pair().map(|_| ());
        let fraud = self.fraud_pair().map(|_| ());
        price.and(fraud)
    }

    /// Forget cached pairs and failures, then load again
    pub fn reload(&self) -> Result<()> {
        self.clear();
        self.warm_up()
    }

    /// Drop cached pairs; the next request loads from the store
    pub fn clear(&self) {
        self.price.clear();
        self.fraud.clear();
    }

    pub fn price_state(&self) -> CacheState {
        self.price.state()
    }

    pub fn fraud_state(&self) -> CacheState {
        self.fraud.state()
    }

    fn price_pair(&self) -> Result<Arc<PricePair>> {
        self.price.get_or_load(|| {
            let preprocessor: FittedPreprocessor = self.store.load(PRICE_PREPROCESSOR)?;
            let model: PriceModel = self.store.load(PRICE_MODEL)?;
            check_pairing(PRICE_MODEL, &preprocessor, model.n_features())?;
            Ok(PricePair {
                preprocessor,
                model,
            })
        })
    }

    fn fraud_pair(&self) -> Result<Arc<FraudPair>> {
        self.fraud.get_or_load(|| {
            let preprocessor: FittedPreprocessor = self.store.load(FRAUD_PREPROCESSOR)?;
            let model: IsolationForest = self.store.load(FRAUD_MODEL)?;
            check_pairing(FRAUD_MODEL, &preprocessor, model.n_features())?;
            Ok(FraudPair {
                preprocessor,
                model,
            })
        })
    }
}

/// A model must consume exactly what its preprocessor emits
fn check_pairing(name: &str, preprocessor: &FittedPreprocessor, n_features: Option<usize>) -> Result<()> {
    match n_features {
        Some(n) if n == preprocessor.n_features() => Ok(()),
        other => {
            warn!(
                artifact = name,
                preprocessor_width = preprocessor.n_features(),
                model_width = ?other,
                "Model and preprocessor do not match"
            );
            Err(SmartPriceError::artifact_unavailable(
                name,
                format!(
                    "model expects {:?} features, preprocessor emits {}",
                    other,
                    preprocessor.n_features()
                ),
            ))
        }
    }
}
