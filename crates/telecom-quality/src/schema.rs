//! Explicit dataset schema.
//!
//! A [`DatasetSchema`] declares the logical fields a caller relies on, whether
//! each must be present, and whether it is numeric. It is checked once at the
//! entry point of a cleaning pass, so a missing column fails fast with
//! [`QualityError::InvalidColumn`] instead of surfacing later as an empty result.
//!
//! [`DatasetSchema::validate`] looks declared names up exactly. To accept
//! spelling variants such as `"Engagement Score"` for a declared
//! `"engagement_score"`, run [`DatasetSchema::conform`] first (see
//! [`normalize_column_name`]); the cleaning pass itself never renames.

use crate::error::{QualityError, Result};
use crate::utils::{is_numeric_dtype, normalize_column_name};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Column names of the subscriber scores table.
pub mod columns {
    pub const MSISDN: &str = "MSISDN";
    pub const HANDSET_TYPE: &str = "Handset Type";
    pub const ENGAGEMENT_SCORE: &str = "engagement_score";
    pub const EXPERIENCE_SCORE: &str = "experience_score";
    pub const SATISFACTION_SCORE: &str = "satisfaction_score";
    pub const SESSION_FREQUENCY: &str = "Session Frequency";
    pub const TOTAL_SESSION_DURATION: &str = "Total Session Duration";
    pub const TOTAL_TRAFFIC_BYTES: &str = "Total Traffic (Bytes)";
    pub const TOTAL_TRAFFIC_MB: &str = "Total Traffic (MB)";
    pub const AVG_TCP_RETRANSMISSION: &str = "Average TCP Retransmission";
    pub const AVG_RTT: &str = "Average RTT";
    pub const AVG_THROUGHPUT: &str = "Average Throughput";
    pub const ENGAGEMENT_CLUSTER: &str = "Engagement Cluster";
    pub const EXPERIENCE_CLUSTER: &str = "Experience Cluster";
    pub const SATISFACTION_CLUSTER: &str = "Satisfaction Cluster";
}

/// Logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Whether a field must be present in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Required,
    Optional,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub requirement: Requirement,
}

/// An ordered set of declared fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    fields: Vec<FieldSpec>,
}

impl DatasetSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. A later declaration of the same name replaces the
    /// earlier one.
    pub fn field(
        mut self,
        name: impl Into<String>,
        kind: ColumnKind,
        requirement: Requirement,
    ) -> Self {
        let name = name.into();
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldSpec {
            name,
            kind,
            requirement,
        });
        self
    }

    pub fn required_numeric(self, name: impl Into<String>) -> Self {
        self.field(name, ColumnKind::Numeric, Requirement::Required)
    }

    pub fn optional_numeric(self, name: impl Into<String>) -> Self {
        self.field(name, ColumnKind::Numeric, Requirement::Optional)
    }

    pub fn required_categorical(self, name: impl Into<String>) -> Self {
        self.field(name, ColumnKind::Categorical, Requirement::Required)
    }

    pub fn optional_categorical(self, name: impl Into<String>) -> Self {
        self.field(name, ColumnKind::Categorical, Requirement::Optional)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Rename data columns to their declared names where they only differ in
    /// casing or punctuation. Columns that already match exactly, and columns
    /// the schema does not declare, are left alone.
    pub fn conform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for field in &self.fields {
            if names.iter().any(|n| n == &field.name) {
                continue;
            }
            let wanted = normalize_column_name(&field.name);
            let candidates: Vec<&String> = names
                .iter()
                .filter(|n| normalize_column_name(n) == wanted)
                .collect();

            match candidates.as_slice() {
                [single] => {
                    debug!("Renaming column '{}' to '{}'", single, field.name);
                    out.rename(single.as_str(), field.name.as_str().into())?;
                }
                [] => {}
                _ => warn!(
                    "Column '{}' matches several data columns {:?}; leaving them as-is",
                    field.name, candidates
                ),
            }
        }

        Ok(out)
    }

    /// Check every declared field against `df`.
    ///
    /// Required fields must exist ([`QualityError::InvalidColumn`]); numeric
    /// fields that exist must have a numeric dtype
    /// ([`QualityError::TypeMismatch`]). Missing optional fields are logged.
    pub fn validate(&self, df: &DataFrame) -> Result<()> {
        for field in &self.fields {
            match df.column(&field.name) {
                Ok(column) => {
                    if field.kind == ColumnKind::Numeric
                        && !is_numeric_dtype(column.dtype())
                        && column.dtype() != &DataType::Null
                    {
                        return Err(QualityError::type_mismatch(
                            &field.name,
                            "numeric",
                            column.dtype(),
                        ));
                    }
                }
                Err(_) if field.requirement == Requirement::Required => {
                    return Err(QualityError::InvalidColumn(field.name.clone()));
                }
                Err(_) => warn!("Optional column '{}' is not present", field.name),
            }
        }
        Ok(())
    }

    /// Schema of the subscriber scores table the dashboard reads.
    pub fn telecom_scores() -> Self {
        use columns::*;

        Self::new()
            .required_categorical(MSISDN)
            .optional_categorical(HANDSET_TYPE)
            .required_numeric(ENGAGEMENT_SCORE)
            .required_numeric(EXPERIENCE_SCORE)
            .required_numeric(SATISFACTION_SCORE)
            .optional_numeric(SESSION_FREQUENCY)
            .optional_numeric(TOTAL_SESSION_DURATION)
            .optional_numeric(TOTAL_TRAFFIC_BYTES)
            .optional_numeric(AVG_TCP_RETRANSMISSION)
            .optional_numeric(AVG_RTT)
            .optional_numeric(AVG_THROUGHPUT)
            .optional_categorical(ENGAGEMENT_CLUSTER)
            .optional_categorical(EXPERIENCE_CLUSTER)
            .optional_categorical(SATISFACTION_CLUSTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_required() {
        let df = df!["engagement_score" => [0.1, 0.2]].unwrap();
        let schema = DatasetSchema::new()
            .required_numeric("engagement_score")
            .required_categorical("MSISDN");

        let err = schema.validate(&df).unwrap_err();
        assert!(matches!(err, QualityError::InvalidColumn(ref c) if c == "MSISDN"));
    }

    #[test]
    fn test_validate_missing_optional_is_ok() {
        let df = df!["MSISDN" => ["a", "b"]].unwrap();
        let schema = DatasetSchema::new()
            .required_categorical("MSISDN")
            .optional_numeric("Average RTT");
        assert!(schema.validate(&df).is_ok());
    }

    #[test]
    fn test_validate_numeric_kind() {
        let df = df!["engagement_score" => ["high", "low"]].unwrap();
        let schema = DatasetSchema::new().required_numeric("engagement_score");
        let err = schema.validate(&df).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_conform_renames_case_variants() {
        let df = df![
            "Engagement Score" => [0.5, 0.6],
            "MSISDN" => ["a", "b"],
        ]
        .unwrap();
        let schema = DatasetSchema::new()
            .required_numeric("engagement_score")
            .required_categorical("MSISDN");

        let conformed = schema.conform(&df).unwrap();
        assert!(conformed.column("engagement_score").is_ok());
        assert!(conformed.column("Engagement Score").is_err());
        assert!(schema.validate(&conformed).is_ok());
        // Input untouched
        assert!(df.column("Engagement Score").is_ok());
    }

    #[test]
    fn test_conform_ambiguous_leaves_columns() {
        let df = df![
            "Engagement Score" => [0.5],
            "ENGAGEMENT-score" => [0.6],
        ]
        .unwrap();
        let schema = DatasetSchema::new().required_numeric("engagement_score");
        let conformed = schema.conform(&df).unwrap();
        assert_eq!(conformed.get_column_names(), df.get_column_names());
    }

    #[test]
    fn test_field_redeclaration_replaces() {
        let schema = DatasetSchema::new()
            .optional_numeric("x")
            .required_categorical("x");
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(schema.get("x").unwrap().kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_telecom_scores_schema() {
        let schema = DatasetSchema::telecom_scores();
        assert_eq!(
            schema.get("MSISDN").unwrap().requirement,
            Requirement::Required
        );
        assert_eq!(schema.get("Average RTT").unwrap().kind, ColumnKind::Numeric);
    }
}
