//! Configuration types for a cleaning pass.
//!
//! [`CleaningConfig`] describes which of the transformations run and on which
//! columns. It is built with [`CleaningConfig::builder()`] or deserialized from
//! JSON, and validated before use.

use crate::error::{QualityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Multiplier applied to the IQR when deriving outlier bounds.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// A literal value substituted for missing entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FillValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FillValue::Bool(_) => "bool",
            FillValue::Int(_) => "int",
            FillValue::Float(_) => "float",
            FillValue::Str(_) => "str",
        }
    }

    /// Parse a literal from the command line: bool, then int, then finite
    /// float, anything else is kept as text (including `nan` and `inf`).
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(b) = trimmed.parse::<bool>() {
            FillValue::Bool(b)
        } else if let Ok(i) = trimmed.parse::<i64>() {
            FillValue::Int(i)
        } else if let Some(f) = trimmed.parse::<f64>().ok().filter(|f| f.is_finite()) {
            FillValue::Float(f)
        } else {
            FillValue::Str(raw.to_string())
        }
    }
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillValue::Bool(b) => write!(f, "{b}"),
            FillValue::Int(i) => write!(f, "{i}"),
            FillValue::Float(x) => write!(f, "{x}"),
            FillValue::Str(s) => f.write_str(s),
        }
    }
}

/// A column paired with the value that replaces its missing entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultFill {
    pub column: String,
    pub value: FillValue,
}

impl DefaultFill {
    pub fn new(column: impl Into<String>, value: FillValue) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// Parses `COLUMN=VALUE`. The split happens on the last `=` so column names
/// may contain one.
impl FromStr for DefaultFill {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (column, value) = s
            .rsplit_once('=')
            .ok_or_else(|| ConfigValidationError::MalformedFill(s.to_string()))?;
        if column.trim().is_empty() {
            return Err(ConfigValidationError::MalformedFill(s.to_string()));
        }
        Ok(DefaultFill::new(column.trim(), FillValue::parse_literal(value)))
    }
}

/// Configuration for one cleaning pass.
///
/// # Example
///
/// ```rust,ignore
/// use telecom_quality::config::{CleaningConfig, FillValue};
///
/// let config = CleaningConfig::builder()
///     .required_column("MSISDN")
///     .default_fill("Handset Type", FillValue::Str("undefined".into()))
///     .outlier_column("Average RTT")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Whether to remove exact duplicate rows (first occurrence kept).
    /// Default: true
    pub remove_duplicates: bool,

    /// Column whose missing values cause the whole row to be dropped.
    /// Default: None
    pub required_column: Option<String>,

    /// Constant fills applied in order.
    /// Default: empty
    pub default_fills: Vec<DefaultFill>,

    /// Whether to fill remaining numeric nulls with the column mean.
    /// Default: true
    pub impute_numeric_means: bool,

    /// Numeric columns whose IQR outliers are replaced with the column mean.
    /// Default: empty
    pub outlier_columns: Vec<String>,

    /// Multiplier applied to the IQR for the outlier bounds.
    /// Default: 1.5
    pub iqr_multiplier: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            required_column: None,
            default_fills: Vec::new(),
            impute_numeric_means: true,
            outlier_columns: Vec::new(),
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: CleaningConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .map_err(|e| QualityError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Every column name the configuration refers to.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        if let Some(ref required) = self.required_column {
            columns.push(required);
        }
        columns.extend(self.default_fills.iter().map(|f| f.column.as_str()));
        columns.extend(self.outlier_columns.iter().map(|c| c.as_str()));
        columns
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidIqrMultiplier(
                self.iqr_multiplier,
            ));
        }

        if self.referenced_columns().iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyColumnName);
        }

        for (i, fill) in self.default_fills.iter().enumerate() {
            if self.default_fills[..i].iter().any(|f| f.column == fill.column) {
                return Err(ConfigValidationError::DuplicateFill(fill.column.clone()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid IQR multiplier: {0} (must be a finite, non-negative number)")]
    InvalidIqrMultiplier(f64),

    #[error("Column names in the configuration must not be empty")]
    EmptyColumnName,

    #[error("Column '{0}' has more than one default fill")]
    DuplicateFill(String),

    #[error("Malformed fill '{0}' (expected COLUMN=VALUE)")]
    MalformedFill(String),
}

impl From<ConfigValidationError> for QualityError {
    fn from(e: ConfigValidationError) -> Self {
        QualityError::InvalidConfig(e.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    remove_duplicates: Option<bool>,
    required_column: Option<String>,
    default_fills: Vec<DefaultFill>,
    impute_numeric_means: Option<bool>,
    outlier_columns: Vec<String>,
    iqr_multiplier: Option<f64>,
}

impl CleaningConfigBuilder {
    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Set the column whose missing values drop the row.
    pub fn required_column(mut self, column: impl Into<String>) -> Self {
        self.required_column = Some(column.into());
        self
    }

    /// Add a constant fill for a column.
    pub fn default_fill(mut self, column: impl Into<String>, value: FillValue) -> Self {
        self.default_fills.push(DefaultFill::new(column, value));
        self
    }

    /// Enable or disable mean imputation of numeric columns.
    pub fn impute_numeric_means(mut self, impute: bool) -> Self {
        self.impute_numeric_means = Some(impute);
        self
    }

    /// Add a column for IQR outlier replacement.
    pub fn outlier_column(mut self, column: impl Into<String>) -> Self {
        self.outlier_columns.push(column.into());
        self
    }

    /// Set the IQR multiplier used for the outlier bounds.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            remove_duplicates: self.remove_duplicates.unwrap_or(true),
            required_column: self.required_column,
            default_fills: self.default_fills,
            impute_numeric_means: self.impute_numeric_means.unwrap_or(true),
            outlier_columns: self.outlier_columns,
            iqr_multiplier: self.iqr_multiplier.unwrap_or(DEFAULT_IQR_MULTIPLIER),
        };

        config.validate()?;
        Ok(config)
    }
}
