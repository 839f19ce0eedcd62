//! Telecom Scores Data-Quality Library
//!
//! Cleaning and summary analytics for per-subscriber telecom scores, built on
//! Polars.
//!
//! # Overview
//!
//! - **Cleaning**: duplicate removal, required-attribute filtering, constant
//!   fills, numeric mean imputation and IQR outlier replacement
//! - **Schema**: declared fields checked once, up front, with tolerant name
//!   matching
//! - **Loading**: Parquet with CSV fallback
//! - **Analytics**: the figures behind the four dashboard sections
//!
//! Every transformation takes a `&DataFrame` and returns a new one; inputs are
//! never modified.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use telecom_quality::{CleaningConfig, DataQualityTransformer, DatasetSchema, FillValue};
//! use telecom_quality::loader::{DataSource, load_first_available};
//!
//! let (_, df) = load_first_available(&[
//!     DataSource::from_path("data/processed/user_scores.parquet")?,
//!     DataSource::from_path("data/processed/user_scores.csv")?,
//! ])?;
//!
//! let config = CleaningConfig::builder()
//!     .required_column("MSISDN")
//!     .default_fill("Handset Type", FillValue::Str("undefined".into()))
//!     .outlier_column("Average RTT")
//!     .build()?;
//!
//! let outcome = DataQualityTransformer::new(config)
//!     .with_schema(DatasetSchema::telecom_scores())
//!     .clean(&df)?;
//!
//! println!("{} -> {} rows", outcome.report.rows_before, outcome.report.rows_after);
//! ```
//!
//! The individual steps are also available as free functions in [`quality`]:
//!
//! ```rust,ignore
//! use telecom_quality::quality::{dedupe_and_require, fill_default, treat_outliers_with_mean};
//!
//! let df = dedupe_and_require(&df, "MSISDN")?;
//! let df = fill_default(&df, "default_column", &FillValue::Int(0))?;
//! let rtt = treat_outliers_with_mean(df.column("Average RTT")?.as_materialized_series())?;
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod loader;
pub mod quality;
pub mod report;
pub mod schema;
pub mod utils;

// Re-exports for convenient access
pub use analytics::{DashboardContext, DashboardSection, SectionSummary, summarize};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, DEFAULT_IQR_MULTIPLIER,
    DefaultFill, FillValue,
};
pub use error::{QualityError, Result as QualityResult, ResultExt};
pub use loader::{DataSource, load_first_available, write_dataset};
pub use quality::{
    CleaningOutcome, DataQualityTransformer, dedupe_and_require, fill_default,
    fill_numeric_means, treat_outliers_with_mean,
};
pub use report::{CleaningReport, ColumnCount};
pub use schema::{ColumnKind, DatasetSchema, FieldSpec, Requirement};
pub use utils::normalize_column_name;
