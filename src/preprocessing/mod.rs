//! Data preprocessing module
//!
//! Provides the train/serve feature pipeline:
//! - Table cleaning (duplicate and missing-value row removal)
//! - Standard scaling of numeric columns
//! - One-hot encoding of categorical columns with zero-filled unknowns
//! - A fit-once [`FittedPreprocessor`] shared by training and inference

mod cleaner;
mod encoder;
mod pipeline;
mod scaler;

pub use cleaner::clean;
pub(crate) use cleaner::complete_rows;
pub use encoder::{CategoryVocabulary, OneHotEncoder};
pub use pipeline::{FittedPreprocessor, Preprocessor};
pub use scaler::{ScalerParams, StandardScaler};
pub(crate) use scaler::numeric_column;

use crate::error::{Result, SmartPriceError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const BRAND: &str = "brand";
pub const CATEGORY: &str = "category";
pub const MATERIAL: &str = "material";
pub const RATING: &str = "rating";
pub const TRANSACTIONS: &str = "transactions";
pub const PRICE: &str = "price";

/// Declared semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

/// A named, typed column of the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Fixed schema of a product table.
///
/// Column classification always comes from here, never from the runtime
/// dtype of a loaded frame, so fit-time and serve-time agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSchema {
    columns: Vec<ColumnSpec>,
}

impl Default for ProductSchema {
    fn default() -> Self {
        Self::products()
    }
}

impl ProductSchema {
    /// Create a schema from explicit column specs
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// The product listing schema
    pub fn products() -> Self {
        Self::new(vec![
            ColumnSpec::new(BRAND, ColumnType::Categorical),
            ColumnSpec::new(CATEGORY, ColumnType::Categorical),
            ColumnSpec::new(MATERIAL, ColumnType::Categorical),
            ColumnSpec::new(RATING, ColumnType::Numeric),
            ColumnSpec::new(TRANSACTIONS, ColumnType::Numeric),
            ColumnSpec::new(PRICE, ColumnType::Numeric),
        ])
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Names of all schema columns, in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Numeric column names in declaration order, minus `exclude`
    pub fn numeric_columns(&self, exclude: &[&str]) -> Vec<String> {
        self.columns_of(ColumnType::Numeric, exclude)
    }

    /// Categorical column names in declaration order, minus `exclude`
    pub fn categorical_columns(&self, exclude: &[&str]) -> Vec<String> {
        self.columns_of(ColumnType::Categorical, exclude)
    }

    fn columns_of(&self, dtype: ColumnType, exclude: &[&str]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.dtype == dtype && !exclude.contains(&c.name.as_str()))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Schema columns absent from `df`
    pub fn missing_columns(&self, df: &DataFrame) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| df.column(&c.name).is_err())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Fail with [`SmartPriceError::FeatureNotFound`] if any schema column is absent
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        let missing = self.missing_columns(df);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SmartPriceError::FeatureNotFound(missing.join(", ")))
        }
    }
}
