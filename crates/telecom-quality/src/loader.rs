//! Dataset loading and writing.
//!
//! Scores are produced upstream as Parquet, with a CSV export as fallback.
//! [`load_first_available`] tries each candidate source in order and fails with
//! [`QualityError::UpstreamDataUnavailable`] when none can be read.

use crate::error::{QualityError, Result, ResultExt};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows used for CSV schema inference.
const INFER_SCHEMA_ROWS: usize = 100;

/// Where the scoring notebooks publish the full scores table.
pub const DEFAULT_SCORES_PARQUET: &str = "notebooks/artifacts/scores_full.parquet";
pub const DEFAULT_SCORES_CSV: &str = "notebooks/artifacts/scores_full.csv";

/// The published scores table, Parquet first.
pub fn default_sources() -> Vec<DataSource> {
    vec![
        DataSource::Parquet(PathBuf::from(DEFAULT_SCORES_PARQUET)),
        DataSource::Csv(PathBuf::from(DEFAULT_SCORES_CSV)),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Parquet(PathBuf),
    Csv(PathBuf),
}

impl DataSource {
    /// Pick the format from the file extension (`parquet`/`pq`, `csv`/`txt`).
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("parquet") | Some("pq") => Ok(Self::Parquet(path)),
            Some("csv") | Some("txt") => Ok(Self::Csv(path)),
            _ => Err(QualityError::InvalidConfig(format!(
                "Unsupported dataset format: {}",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Parquet(p) | Self::Csv(p) => p,
        }
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> Result<DataFrame> {
        let df = match self {
            Self::Parquet(path) => {
                let file = File::open(path)?;
                ParquetReader::new(file).finish()?
            }
            Self::Csv(path) => read_csv(path)?,
        };
        info!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            self
        );
        Ok(df)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parquet(p) => write!(f, "parquet:{}", p.display()),
            Self::Csv(p) => write!(f, "csv:{}", p.display()),
        }
    }
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .context(format!("Reading {}", path.display()))
}

/// Load the first source that exists, reads cleanly and has at least one row.
pub fn load_first_available(sources: &[DataSource]) -> Result<(DataSource, DataFrame)> {
    let mut tried = Vec::with_capacity(sources.len());

    for source in sources {
        if !source.exists() {
            debug!("Skipping {}: not found", source);
            tried.push(format!("{} (not found)", source));
            continue;
        }
        match source.load() {
            Ok(df) if df.height() > 0 => return Ok((source.clone(), df)),
            Ok(_) => {
                warn!("Skipping {}: no rows", source);
                tried.push(format!("{} (empty)", source));
            }
            Err(e) => {
                warn!("Could not load {}: {}", source, e);
                tried.push(format!("{} ({})", source, e));
            }
        }
    }

    Err(QualityError::UpstreamDataUnavailable(if tried.is_empty() {
        "no sources configured".to_string()
    } else {
        format!("tried {}", tried.join(", "))
    }))
}

/// Write `df` to `path`, choosing the format from the extension.
pub fn write_dataset(df: &DataFrame, path: &Path) -> Result<()> {
    let target = DataSource::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut out = df.clone();
    let mut file = File::create(path)?;
    match target {
        DataSource::Parquet(_) => {
            ParquetWriter::new(&mut file).finish(&mut out)?;
        }
        DataSource::Csv(_) => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut out)?;
        }
    }
    info!("Wrote {} rows to {}", out.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("telecom_quality_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_from_path_by_extension() {
        assert!(matches!(
            DataSource::from_path("scores.parquet").unwrap(),
            DataSource::Parquet(_)
        ));
        assert!(matches!(
            DataSource::from_path("scores.CSV").unwrap(),
            DataSource::Csv(_)
        ));
        let err = DataSource::from_path("scores.xlsx").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_csv_round_trip() {
        let path = temp_path("loader.csv");
        let df = df![
            "MSISDN" => ["a", "b"],
            "engagement_score" => [1.5, 2.5],
        ]
        .unwrap();

        write_dataset(&df, &path).unwrap();
        let loaded = DataSource::from_path(&path).unwrap().load().unwrap();
        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(loaded.get_column_names(), df.get_column_names());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_falls_back_to_next_source() {
        let csv = temp_path("fallback.csv");
        write_dataset(&df!["x" => [1i64, 2, 3]].unwrap(), &csv).unwrap();

        let sources = vec![
            DataSource::Parquet(temp_path("missing.parquet")),
            DataSource::Csv(csv.clone()),
        ];
        let (source, df) = load_first_available(&sources).unwrap();
        assert_eq!(source, DataSource::Csv(csv.clone()));
        assert_eq!(df.height(), 3);
        fs::remove_file(&csv).ok();
    }

    #[test]
    fn test_empty_source_is_skipped() {
        let empty = temp_path("empty.csv");
        let full = temp_path("full.csv");
        write_dataset(&df!["x" => Vec::<i64>::new()].unwrap(), &empty).unwrap();
        write_dataset(&df!["x" => [1i64]].unwrap(), &full).unwrap();

        let sources = vec![DataSource::Csv(empty.clone()), DataSource::Csv(full.clone())];
        let (source, _) = load_first_available(&sources).unwrap();
        assert_eq!(source, DataSource::Csv(full.clone()));

        let err = load_first_available(&sources[..1]).unwrap_err();
        assert!(err.to_string().contains("empty"));
        fs::remove_file(&empty).ok();
        fs::remove_file(&full).ok();
    }

    #[test]
    fn test_no_source_available() {
        let sources = vec![DataSource::Parquet(temp_path("nowhere.parquet"))];
        let err = load_first_available(&sources).unwrap_err();
        assert_eq!(err.error_code(), "UPSTREAM_DATA_UNAVAILABLE");
        assert!(err.to_string().contains("nowhere.parquet"));

        let err = load_first_available(&[]).unwrap_err();
        assert!(matches!(err, QualityError::UpstreamDataUnavailable(_)));
    }
}
