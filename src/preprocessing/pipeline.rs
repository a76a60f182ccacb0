//! Fit-once feature pipeline shared by training and inference

use crate::error::{Result, SmartPriceError};
use super::{OneHotEncoder, ProductSchema, StandardScaler};
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Unfitted preprocessor: the declared numeric and categorical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
}

impl Preprocessor {
    /// Declare the columns to scale and the columns to one-hot encode
    pub fn new<N, C, S1, S2>(numeric_columns: N, categorical_columns: C) -> Self
    where
        N: IntoIterator<Item = S1>,
        C: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            numeric_columns: numeric_columns.into_iter().map(Into::into).collect(),
            categorical_columns: categorical_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Partition a schema's columns by declared type, skipping `exclude`
    pub fn from_schema(schema: &ProductSchema, exclude: &[&str]) -> Self {
        Self {
            numeric_columns: schema.numeric_columns(exclude),
            categorical_columns: schema.categorical_columns(exclude),
        }
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Learn scaling and vocabulary parameters from `df`.
    ///
    /// Every call produces a fresh [`FittedPreprocessor`]; nothing carries
    /// over from an earlier fit.
    pub fn fit(&self, df: &DataFrame) -> Result<FittedPreprocessor> {
        let start = Instant::now();

        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(SmartPriceError::EmptyInput(
                "no feature columns declared".to_string(),
            ));
        }
        if df.height() == 0 || df.width() == 0 {
            return Err(SmartPriceError::EmptyInput(format!(
                "cannot fit on a {}x{} table",
                df.height(),
                df.width()
            )));
        }

        let scaler = StandardScaler::fit(df, &self.numeric_columns)?;
        let encoder = OneHotEncoder::fit(df, &self.categorical_columns)?;

        let fitted = FittedPreprocessor {
            scaler,
            encoder,
            n_samples_seen: df.height(),
        };

        debug!(
            rows = df.height(),
            n_features = fitted.n_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessor fitted"
        );
        Ok(fitted)
    }
}

/// Immutable, fitted preprocessor.
///
/// Output layout is fixed at fit time: the scaled numeric block in
/// declaration order, then one one-hot block per categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    n_samples_seen: usize,
}

impl FittedPreprocessor {
    /// Apply the fitted parameters to `df`. Columns not declared at fit time
    /// are ignored.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let numeric = self.scaler.transform(df)?;
        let categorical = self.encoder.transform(df)?;
        let out = concatenate(Axis(1), &[numeric.view(), categorical.view()])?;
        debug_assert_eq!(out.ncols(), self.n_features());
        Ok(out)
    }

    /// Width of every transformed row
    pub fn n_features(&self) -> usize {
        self.scaler.n_features() + self.encoder.n_features()
    }

    /// Output column names in output order
    pub fn feature_names(&self) -> Vec<String> {
        self.scaler
            .params()
            .iter()
            .map(|p| p.column.clone())
            .chain(self.encoder.feature_names())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.scaler.params().iter().map(|p| p.column.clone()).collect()
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.encoder
            .vocabularies()
            .iter()
            .map(|v| v.column.clone())
            .collect()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Rows seen by the fit that produced this preprocessor
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataframe() -> DataFrame {
        df!(
            "age" => &[25.0, 30.0, 35.0, 40.0, 45.0],
            "income" => &[50000.0, 60000.0, 70000.0, 80000.0, 90000.0],
            "city" => &["NYC", "LA", "NYC", "SF", "LA"]
        )
        .unwrap()
    }

    #[test]
    fn test_output_layout() {
        let df = create_test_dataframe();
        let fitted = Preprocessor::new(["age", "income"], ["city"]).fit(&df).unwrap();

        assert_eq!(fitted.n_features(), 5);
        assert_eq!(
            fitted.feature_names(),
            vec!["age", "income", "city=LA", "city=NYC", "city=SF"]
        );

        let out = fitted.transform(&df).unwrap();
        assert_eq!(out.dim(), (5, 5));
        // second row: LA
        assert_eq!(out.row(1).slice(ndarray::s![2..]).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_keeps_width() {
        let df = create_test_dataframe();
        let fitted = Preprocessor::new(["age", "income"], ["city"]).fit(&df).unwrap();

        let query = df!(
            "age" => &[33.0],
            "income" => &[65000.0],
            "city" => &["Berlin"]
        )
        .unwrap();
        let out = fitted.transform(&query).unwrap();

        assert_eq!(out.ncols(), fitted.n_features());
        assert_eq!(out.row(0).slice(ndarray::s![2..]).sum(), 0.0);
    }

    #[test]
    fn test_empty_input() {
        let empty = create_test_dataframe().head(Some(0));
        let err = Preprocessor::new(["age"], ["city"]).fit(&empty).unwrap_err();
        assert!(matches!(err, SmartPriceError::EmptyInput(_)));

        let none: [&str; 0] = [];
        let err = Preprocessor::new(none, none)
            .fit(&create_test_dataframe())
            .unwrap_err();
        assert!(matches!(err, SmartPriceError::EmptyInput(_)));
    }

    #[test]
    fn test_refit_replaces_parameters() {
        let builder = Preprocessor::new(["age"], ["city"]);
        let first = builder.fit(&create_test_dataframe()).unwrap();

        let other = df!("age" => &[1.0, 3.0], "city" => &["Paris", "Rome"]).unwrap();
        let second = builder.fit(&other).unwrap();

        assert_ne!(first, second);
        assert_eq!(second.feature_names(), vec!["age", "city=Paris", "city=Rome"]);
        assert!((second.scaler().params()[0].mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_declared_column() {
        let df = create_test_dataframe();
        let err = Preprocessor::new(["age", "height"], ["city"]).fit(&df).unwrap_err();
        assert!(matches!(err, SmartPriceError::FeatureNotFound(_)));
    }
}
