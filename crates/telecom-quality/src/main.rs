//! CLI entry point for the telecom scores data-quality tool.

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::env;
use std::path::{Path, PathBuf};
use telecom_quality::analytics::{DashboardContext, DashboardSection, summarize};
use telecom_quality::loader::{DataSource, default_sources, load_first_available, write_dataset};
use telecom_quality::{
    CleaningConfig, CleaningOutcome, DataQualityTransformer, DatasetSchema, DefaultFill,
};
use tracing::{debug, info, warn};

/// Environment variable naming the default input dataset.
const SCORES_PATH_ENV: &str = "TELECOM_SCORES_PATH";

/// CLI-compatible dashboard section selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliSection {
    Overview,
    Engagement,
    Experience,
    Satisfaction,
    /// Every section, in dashboard order
    All,
}

impl CliSection {
    fn sections(self) -> Vec<DashboardSection> {
        match self {
            CliSection::Overview => vec![DashboardSection::Overview],
            CliSection::Engagement => vec![DashboardSection::Engagement],
            CliSection::Experience => vec![DashboardSection::Experience],
            CliSection::Satisfaction => vec![DashboardSection::Satisfaction],
            CliSection::All => DashboardSection::ALL.to_vec(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Data-quality cleaning and summaries for telecom subscriber scores",
    long_about = "Cleans the per-subscriber scores table and computes dashboard summaries.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TELECOM_SCORES_PATH   Default input dataset when -i is omitted\n  \
                  RUST_LOG              Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Clean with a required key, a handset default and RTT outliers\n  \
                  telecom-quality clean -i scores.parquet -o cleaned.parquet \\\n    \
                  --required MSISDN --fill 'Handset Type=undefined' --outlier-column 'Average RTT'\n\n  \
                  # Satisfaction figures as JSON\n  \
                  telecom-quality summarize -i scores.csv --section satisfaction"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cleaning pass and write the cleaned dataset
    Clean(CleanArgs),
    /// Print dashboard summaries as JSON
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Input dataset(s), tried in order (Parquet or CSV)
    #[arg(short, long = "input")]
    inputs: Vec<PathBuf>,

    /// Output path; the extension selects Parquet or CSV
    #[arg(short, long)]
    output: PathBuf,

    /// JSON cleaning configuration; flags below extend it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop rows missing this column
    #[arg(long)]
    required: Option<String>,

    /// Constant fill, as COLUMN=VALUE (repeatable)
    #[arg(long = "fill")]
    fills: Vec<DefaultFill>,

    /// Replace IQR outliers in this column with its mean (repeatable)
    #[arg(long = "outlier-column")]
    outlier_columns: Vec<String>,

    /// IQR multiplier for outlier fences
    #[arg(long)]
    iqr_multiplier: Option<f64>,

    /// Keep duplicate rows
    #[arg(long)]
    keep_duplicates: bool,

    /// Leave missing numeric values in place
    #[arg(long)]
    no_mean_imputation: bool,

    /// Adopt the scores schema's column names, then check the input against it
    #[arg(long)]
    strict_schema: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write the cleaning report next to the output as <name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// Input dataset(s), tried in order (Parquet or CSV)
    #[arg(short, long = "input")]
    inputs: Vec<PathBuf>,

    /// Section to summarize
    #[arg(short, long, value_enum, default_value = "all")]
    section: CliSection,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = match &cli.command {
        Command::Clean(args) => args.json,
        Command::Summarize(_) => true,
    };
    init_logging(&cli.log_level, cli.quiet, json_output);

    // Load environment variables from .env file
    dotenv().ok();

    match cli.command {
        Command::Clean(args) => run_clean(args),
        Command::Summarize(args) => run_summarize(args),
    }
}

/// Sources from `-i`, else `TELECOM_SCORES_PATH`, else the published artifacts.
fn resolve_sources(inputs: &[PathBuf]) -> Result<Vec<DataSource>> {
    if !inputs.is_empty() {
        return inputs
            .iter()
            .map(|p| DataSource::from_path(p.clone()).map_err(Into::into))
            .collect();
    }
    match env::var(SCORES_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Using {} from {}", path, SCORES_PATH_ENV);
            Ok(vec![DataSource::from_path(path.trim())?])
        }
        _ => {
            debug!("No input given, falling back to default artifacts");
            Ok(default_sources())
        }
    }
}

fn build_config(args: &CleanArgs) -> Result<CleaningConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading cleaning configuration from {}", path.display());
            CleaningConfig::from_json_file(path)?
        }
        None => CleaningConfig::default(),
    };

    let mut builder = CleaningConfig::builder()
        .remove_duplicates(base.remove_duplicates && !args.keep_duplicates)
        .impute_numeric_means(base.impute_numeric_means && !args.no_mean_imputation)
        .iqr_multiplier(args.iqr_multiplier.unwrap_or(base.iqr_multiplier));

    if let Some(required) = args.required.clone().or(base.required_column) {
        builder = builder.required_column(required);
    }
    for fill in base.default_fills.into_iter().chain(args.fills.iter().cloned()) {
        builder = builder.default_fill(fill.column, fill.value);
    }
    for column in base
        .outlier_columns
        .into_iter()
        .chain(args.outlier_columns.iter().cloned())
    {
        builder = builder.outlier_column(column);
    }

    Ok(builder.build()?)
}

fn run_clean(args: CleanArgs) -> Result<()> {
    let config = build_config(&args)?;
    let sources = resolve_sources(&args.inputs)?;
    let (source, data) = load_first_available(&sources)?;
    info!("Dataset loaded from {}: {:?}", source, data.shape());

    let mut transformer = DataQualityTransformer::new(config);
    let data = if args.strict_schema {
        let schema = DatasetSchema::telecom_scores();
        let conformed = schema.conform(&data)?;
        transformer = transformer.with_schema(schema);
        conformed
    } else {
        data
    };

    let outcome = transformer.clean(&data)?;
    write_dataset(&outcome.data, &args.output)?;

    if args.emit_report {
        let (dir, stem) = report_location(&args.output)?;
        let path = outcome.report.write_to_file(&dir, &stem)?;
        if !args.json {
            info!("Report written to {}", path.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print_clean_summary(&source, &args.output, &outcome);
    }
    Ok(())
}

fn report_location(output: &Path) -> Result<(PathBuf, String)> {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Output path has no file name: {}", output.display()))?;
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, stem.to_string()))
}

/// Human-readable summary of a cleaning pass.
///
/// Uses `println!` rather than logging: this is the command's output and must
/// show regardless of log level.
fn print_clean_summary(source: &DataSource, output: &Path, outcome: &CleaningOutcome) {
    let report = &outcome.report;

    println!("\n{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}\n", "=".repeat(80));

    println!("  Input:  {}", source);
    println!("  Output: {}", output.display());
    println!(
        "  Rows:   {} -> {} ({} removed)",
        report.rows_before,
        report.rows_after,
        report.rows_removed()
    );
    println!("  Duplicates removed:     {}", report.duplicates_removed);
    println!("  Missing required field: {}", report.rows_missing_required);
    println!("  Duration: {} ms", report.duration_ms);
    println!();

    if !report.steps.is_empty() {
        println!("STEPS");
        println!("{}", "-".repeat(40));
        for (i, step) in report.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        println!();
    }
}

fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let sources = resolve_sources(&args.inputs)?;
    let (_, data) = load_first_available(&sources)?;
    let ctx = DashboardContext::new(&data)?;

    let mut summaries = Vec::new();
    for section in args.section.sections() {
        match summarize(&ctx, section) {
            Ok(summary) => summaries.push(serde_json::to_value(summary)?),
            Err(e) if e.is_invalid_column() && args.section == CliSection::All => {
                warn!("Skipping {}: {}", section, e);
                summaries.push(serde_json::json!({
                    "section": section,
                    "error": e,
                }));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let output = serde_json::json!({
        "missing_columns": ctx.missing_columns(),
        "sections": summaries,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
