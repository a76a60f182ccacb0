//! Pipeline configuration

use crate::error::{Result, SmartPriceError};
use crate::training::{FraudTrainingConfig, PriceTrainingConfig, SplitConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Top-level settings for training and serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source CSV of product listings
    pub data_path: PathBuf,
    /// Directory holding the persisted artifacts
    pub model_dir: PathBuf,
    pub split: SplitConfig,
    pub price: PriceTrainingConfig,
    pub fraud: FraudTrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/raw/products.csv"),
            model_dir: PathBuf::from("models"),
            split: SplitConfig::default(),
            price: PriceTrainingConfig::default(),
            fraud: FraudTrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config; absent keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SmartPriceError::ConfigError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            SmartPriceError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_price(mut self, price: PriceTrainingConfig) -> Self {
        self.price = price;
        self
    }

    pub fn with_fraud(mut self, fraud: FraudTrainingConfig) -> Self {
        self.fraud = fraud;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.price.validate()?;
        self.fraud.validate()
    }
}
