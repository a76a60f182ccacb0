//! Serve-time request and response types

use crate::error::{Result, SmartPriceError};
use crate::preprocessing::{BRAND, CATEGORY, MATERIAL, PRICE, RATING, TRANSACTIONS};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One product listing as submitted for prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub brand: String,
    pub category: String,
    pub material: String,
    pub rating: f64,
    pub transactions: i64,
    /// Listed price; unused by price estimation, defaulted for fraud checks
    #[serde(default)]
    pub price: Option<f64>,
}

impl ProductRecord {
    pub fn new(
        brand: impl Into<String>,
        category: impl Into<String>,
        material: impl Into<String>,
        rating: f64,
        transactions: i64,
    ) -> Self {
        Self {
            brand: brand.into(),
            category: category.into(),
            material: material.into(),
            rating,
            transactions,
            price: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Single-row table in the training schema; a missing price becomes `0.0`
    pub fn to_frame(&self) -> Result<DataFrame> {
        let df = df!(
            BRAND => [self.brand.as_str()],
            CATEGORY => [self.category.as_str()],
            MATERIAL => [self.material.as_str()],
            RATING => [self.rating],
            TRANSACTIONS => [self.transactions],
            PRICE => [self.price.unwrap_or(0.0)]
        )
        .map_err(|e| SmartPriceError::PredictionFault(format!("cannot build input row: {}", e)))?;
        Ok(df)
    }
}

/// Outcome of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prediction<T> {
    Value(T),
    /// The model or its preprocessor could not be loaded
    Unavailable(String),
    /// Loaded fine, but this request could not be scored
    Fault(String),
}

impl<T> Prediction<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, Prediction::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Prediction::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Prediction::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Prediction<U> {
        match self {
            Prediction::Value(v) => Prediction::Value(f(v)),
            Prediction::Unavailable(r) => Prediction::Unavailable(r),
            Prediction::Fault(r) => Prediction::Fault(r),
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Prediction::Value(v) => Ok(v),
            Prediction::Unavailable(r) => Err(SmartPriceError::PredictionFault(format!(
                "model unavailable: {}",
                r
            ))),
            Prediction::Fault(r) => Err(SmartPriceError::PredictionFault(r)),
        }
    }
}

/// Response body for price estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePredictionResponse {
    pub predicted_price: f64,
}

/// Response body for fraud checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudDetectionResponse {
    pub is_fraud: bool,
}
