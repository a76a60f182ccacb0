//! Standard scaling of numeric columns

use crate::error::{Result, SmartPriceError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Learned parameters for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub column: String,
    pub mean: f64,
    /// Population standard deviation (ddof = 0)
    pub std: f64,
}

impl ScalerParams {
    /// z-score of `value`; a constant column maps to 0
    #[inline]
    pub fn scale(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            0.0
        } else {
            (value - self.mean) / self.std
        }
    }
}

/// Z-score scaler over a fixed, ordered set of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
}

impl StandardScaler {
    /// Learn mean and standard deviation of each column, in the given order
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let params = columns
            .iter()
            .map(|name| {
                let values = numeric_column(df, name)?;
                let n = values.len() as f64;
                if values.is_empty() {
                    return Err(SmartPriceError::EmptyInput(format!(
                        "column '{}' has no rows",
                        name
                    )));
                }
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                Ok(ScalerParams {
                    column: name.clone(),
                    mean,
                    std: var.sqrt(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { params })
    }

    /// Scale the fitted columns of `df` into an `(n_rows, n_columns)` block
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((df.height(), self.params.len()));
        for (j, p) in self.params.iter().enumerate() {
            let values = numeric_column(df, &p.column)?;
            for (i, v) in values.into_iter().enumerate() {
                out[[i, j]] = p.scale(v);
            }
        }
        Ok(out)
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.params.len()
    }
}

/// Extract a column as `f64`, rejecting nulls and non-numeric content
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| SmartPriceError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| SmartPriceError::PreprocessingError(format!("column '{}': {}", name, e)))?;
    let ca = casted
        .f64()
        .map_err(|e| SmartPriceError::PreprocessingError(format!("column '{}': {}", name, e)))?;

    ca.into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                SmartPriceError::PreprocessingError(format!(
                    "column '{}' has a missing or non-numeric value at row {}",
                    name, row
                ))
            })
        })
        .collect()
}
