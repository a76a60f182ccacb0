//! One-hot encoding of categorical columns

use crate::error::{Result, SmartPriceError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted categories observed for one column at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    pub column: String,
    pub categories: Vec<String>,
}

impl CategoryVocabulary {
    /// Position of `value` inside this column's one-hot block
    #[inline]
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// One-hot encoder with a frozen vocabulary.
///
/// Values outside the vocabulary (and missing values) encode as an all-zero
/// block, so the output width never depends on the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<CategoryVocabulary>,
}

impl OneHotEncoder {
    /// Learn the sorted distinct categories of each column, in the given order
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let vocabularies = columns
            .iter()
            .map(|name| {
                let values = string_column(df, name)?;
                let categories: BTreeSet<&str> = values.into_iter().flatten().collect();
                Ok(CategoryVocabulary {
                    column: name.clone(),
                    categories: categories.into_iter().map(str::to_string).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { vocabularies })
    }

    /// Encode the fitted columns of `df` into an `(n_rows, n_features)` block
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((df.height(), self.n_features()));
        let mut offset = 0;

        for vocab in &self.vocabularies {
            let values = string_column(df, &vocab.column)?;
            for (i, value) in values.into_iter().enumerate() {
                if let Some(k) = value.and_then(|v| vocab.index_of(v)) {
                    out[[i, offset + k]] = 1.0;
                }
            }
            offset += vocab.len();
        }

        Ok(out)
    }

    pub fn vocabularies(&self) -> &[CategoryVocabulary] {
        &self.vocabularies
    }

    pub fn n_features(&self) -> usize {
        self.vocabularies.iter().map(|v| v.len()).sum()
    }

    /// Output column names as `column=category`
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| {
                v.categories
                    .iter()
                    .map(move |c| format!("{}={}", v.column, c))
            })
            .collect()
    }
}

fn string_column(df: &DataFrame, name: &str) -> Result<StringChunked> {
    let column = df
        .column(name)
        .map_err(|_| SmartPriceError::FeatureNotFound(name.to_string()))?;
    column
        .cast(&DataType::String)
        .and_then(|c| c.str().cloned())
        .map_err(|e| SmartPriceError::PreprocessingError(format!("column '{}': {}", name, e)))
}
