//! Data loading utilities

use crate::error::{Result, SmartPriceError};
use crate::preprocessing::{complete_rows, ProductSchema};
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

/// Cell contents read as missing, matching the tokens common spreadsheet and
/// dataframe exports write for absent values
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Loader for delimited product tables
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator
    delimiter: u8,
    /// Rows scanned when inferring column types
    infer_schema_length: usize,
    /// Cell contents treated as missing
    null_tokens: Vec<String>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader for comma-separated files
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: 1000,
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Set field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n.max(1);
        self
    }

    /// Replace the cell contents read as missing; empty cells always are
    pub fn with_null_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Load a CSV file.
    ///
    /// A missing or unopenable file yields [`SmartPriceError::DataUnavailable`];
    /// a file that opens but does not parse yields [`SmartPriceError::DataError`].
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();

        let file = File::open(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Source table unavailable");
            SmartPriceError::DataUnavailable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        let null_values = (!self.null_tokens.is_empty()).then(|| {
            NullValues::AllColumns(self.null_tokens.iter().map(|t| t.as_str().into()).collect())
        });
        let parse_opts = CsvParseOptions::default()
            .with_separator(self.delimiter)
            .with_null_values(null_values);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Source table is malformed");
                SmartPriceError::DataError(format!("{}: {}", path.display(), e))
            })?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Data loaded"
        );
        Ok(df)
    }

    /// Load a CSV file and check it against a schema
    pub fn load_products(&self, path: impl AsRef<Path>, schema: &ProductSchema) -> Result<DataFrame> {
        let df = self.load_csv(path)?;
        schema.validate(&df)?;
        Ok(df)
    }

    /// Summarize a source file without training on it
    pub fn inspect(&self, path: impl AsRef<Path>, schema: &ProductSchema) -> Result<FileInfo> {
        let path = path.as_ref();
        let file_size = std::fs::metadata(path)
            .map_err(|e| SmartPriceError::DataUnavailable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .len();

        let df = self.load_csv(path)?;
        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        let missing_columns = schema.missing_columns(&df);
        let null_rows = complete_rows(&df)?.into_iter().filter(|&c| !c).count();

        Ok(FileInfo {
            path: path.display().to_string(),
            file_size,
            n_rows: df.height(),
            n_cols: df.width(),
            columns,
            missing_columns,
            null_rows,
        })
    }
}

/// Summary of a source table
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<String>,
    /// Schema columns absent from the file
    pub missing_columns: Vec<String>,
    /// Rows with at least one missing field
    pub null_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(file, "brand,category,material,rating,transactions,price").unwrap();
        writeln!(file, "Nike,Shoes,Leather,4.5,1000,120.0").unwrap();
        writeln!(file, "Adidas,Shoes,Canvas,4.1,800,90.0").unwrap();
        writeln!(file, "Zara,Shirts,,3.9,150,35.0").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 6);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = DataLoader::new()
            .load_csv("definitely/not/here/products.csv")
            .unwrap_err();
        assert!(matches!(err, SmartPriceError::DataUnavailable { .. }));
    }

    #[test]
    fn test_inspect() {
        let file = create_test_csv();
        let info = DataLoader::new()
            .inspect(file.path(), &ProductSchema::products())
            .unwrap();

        assert_eq!(info.n_rows, 3);
        assert_eq!(info.n_cols, 6);
        assert!(info.missing_columns.is_empty());
        assert_eq!(info.null_rows, 1);
    }

    #[test]
    fn test_null_tokens_read_as_missing() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "brand,rating,transactions").unwrap();
        writeln!(file, "Nike,4.5,10").unwrap();
        writeln!(file, "NA,NaN,null").unwrap();
        writeln!(file, "Zara,3.0,NA").unwrap();
        file.flush().unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.column("transactions").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("rating").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("brand").unwrap().null_count(), 1);
        assert_eq!(df.column("rating").unwrap().null_count(), 1);
        assert_eq!(df.column("transactions").unwrap().null_count(), 2);
    }

    #[test]
    fn test_null_tokens_can_be_disabled() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "brand,rating").unwrap();
        writeln!(file, "NA,4.5").unwrap();
        file.flush().unwrap();

        let df = DataLoader::new()
            .with_null_tokens(Vec::<String>::new())
            .load_csv(file.path())
            .unwrap();
        assert_eq!(df.column("brand").unwrap().null_count(), 0);
    }

    #[test]
    fn test_load_products_rejects_missing_columns() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "brand,rating").unwrap();
        writeln!(file, "Nike,4.5").unwrap();
        file.flush().unwrap();

        let err = DataLoader::new()
            .load_products(file.path(), &ProductSchema::products())
            .unwrap_err();
        assert!(matches!(err, SmartPriceError::FeatureNotFound(_)));
    }
}
