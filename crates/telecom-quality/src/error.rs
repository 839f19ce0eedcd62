//! Error types for the data-quality transformations.
//!
//! Every fallible operation in the crate returns [`QualityError`]. Errors are
//! serializable as `{ code, message }` so the CLI (or any other front end) can
//! emit them as structured JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for cleaning and analytics operations.
#[derive(Error, Debug)]
pub enum QualityError {
    /// A named column does not exist in the dataset.
    #[error("Column '{0}' not found in dataset")]
    InvalidColumn(String),

    /// Outlier treatment was requested on a column with no non-missing values.
    #[error("Column '{0}' has no non-missing values")]
    EmptyColumn(String),

    /// No upstream source produced a usable dataset.
    #[error("No dataset available: {0}")]
    UpstreamDataUnavailable(String),

    /// The column's dtype cannot take part in the requested operation.
    #[error("Column '{column}' has type {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<QualityError>,
    },
}

impl QualityError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QualityError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`QualityError::TypeMismatch`].
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        found: impl std::fmt::Display,
    ) -> Self {
        QualityError::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Stable error code for machine consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidColumn(_) => "INVALID_COLUMN",
            Self::EmptyColumn(_) => "EMPTY_COLUMN",
            Self::UpstreamDataUnavailable(_) => "UPSTREAM_DATA_UNAVAILABLE",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was raised because a column was missing.
    pub fn is_invalid_column(&self) -> bool {
        match self {
            Self::InvalidColumn(_) => true,
            Self::WithContext { source, .. } => source.is_invalid_column(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for QualityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("QualityError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for quality operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| QualityError::Polars(e).with_context(context))
    }
}
