//! Error types for the smartprice pipeline

use thiserror::Error;

/// Result type alias for smartprice operations
pub type Result<T> = std::result::Result<T, SmartPriceError>;

/// Main error type for training and inference
#[derive(Error, Debug)]
pub enum SmartPriceError {
    /// Source table is missing or unreadable
    #[error("Data unavailable: {path}: {reason}")]
    DataUnavailable { path: String, reason: String },

    /// Source table exists but its content is malformed
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    /// Artifact missing, unreadable, or corrupt
    #[error("Artifact unavailable: {name}: {reason}")]
    ArtifactUnavailable { name: String, reason: String },

    #[error("Prediction fault: {0}")]
    PredictionFault(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SmartPriceError {
    /// Shorthand for an [`SmartPriceError::ArtifactUnavailable`]
    pub fn artifact_unavailable(name: impl Into<String>, reason: impl ToString) -> Self {
        SmartPriceError::ArtifactUnavailable {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for SmartPriceError {
    fn from(err: polars::error::PolarsError) -> Self {
        SmartPriceError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SmartPriceError {
    fn from(err: serde_json::Error) -> Self {
        SmartPriceError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for SmartPriceError {
    fn from(err: bincode::Error) -> Self {
        SmartPriceError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SmartPriceError {
    fn from(err: ndarray::ShapeError) -> Self {
        SmartPriceError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SmartPriceError::DataError("bad row".to_string());
        assert_eq!(err.to_string(), "Data error: bad row");

        let err = SmartPriceError::artifact_unavailable("price_model", "file not found");
        assert_eq!(err.to_string(), "Artifact unavailable: price_model: file not found");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SmartPriceError = io_err.into();
        assert!(matches!(err, SmartPriceError::IoError(_)));
    }
}
