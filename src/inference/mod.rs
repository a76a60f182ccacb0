//! Inference module
//!
//! Single-record price estimation and fraud flagging over the persisted
//! artifact pairs, with load-once caching and non-throwing outcomes.

mod predictor;
mod record;

pub use predictor::Predictor;
pub use record::{FraudDetectionResponse, Prediction, PricePredictionResponse, ProductRecord};
