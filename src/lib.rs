//! Labelscope: annotation statistics for YOLO-style datasets.
//!
//! Labelscope reads a dataset laid out as `train/`, `val/` (or `valid/`) and
//! `test/` split directories, each holding `images/` and `labels/`, and
//! reports class frequencies, labels per image, relative label areas and,
//! optionally, per-image blur and brightness.
//!
//! # Modules
//!
//! - [`catalog`]: Split discovery, class lists and image/label pairing
//! - [`schema`]: Bounding-box vs polygon schema detection
//! - [`parser`]: Label line parsing
//! - [`geometry`]: Normalized boxes, polygons and their areas
//! - [`quality`]: Blur and brightness measurement
//! - [`stats`]: The aggregator and its reports
//! - [`validation`]: Strict conformance checking
//! - [`error`]: Error types for labelscope operations

pub mod catalog;
pub mod error;
pub mod geometry;
pub mod parser;
pub mod quality;
pub mod schema;
pub mod stats;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, warn};

pub use error::LabelscopeError;

use catalog::{CatalogOptions, DatasetCatalog};
use stats::{AnalyzeOptions, ProgressHook, QualityScope, DEFAULT_BLUR_THRESHOLD};
use validation::CheckOptions;

/// Files between progress log lines.
const PROGRESS_EVERY: usize = 1000;

/// The labelscope CLI application.
#[derive(Parser)]
#[command(name = "labelscope")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log progress to stderr (same as RUST_LOG=info).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compute annotation statistics for a dataset.
    Analyze(AnalyzeArgs),
    /// Check a dataset for layout and label errors.
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Dataset root containing train/, val/ and test/.
    root: PathBuf,

    /// Splits to measure blur and brightness for ('none', 'all', 'train',
    /// 'val' or 'test').
    #[arg(long, default_value = "none")]
    quality: QualityScope,

    /// Measure at most N images per split.
    #[arg(long, value_name = "N")]
    sample: Option<usize>,

    /// Seed for --sample.
    #[arg(long, env = "LABELSCOPE_SEED", default_value_t = 42)]
    seed: u64,

    /// Process files in parallel.
    #[arg(long)]
    parallel: bool,

    /// Comma-separated class names, overriding data.yaml and classes.txt.
    #[arg(long, env = "LABELSCOPE_CLASSES", value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,

    /// Write per-image quality metrics to this CSV file.
    #[arg(long, value_name = "PATH")]
    quality_csv: Option<PathBuf>,

    /// Blur score under which an image counts as blurry.
    #[arg(long, default_value_t = DEFAULT_BLUR_THRESHOLD)]
    blur_threshold: f64,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Dataset root containing train/, val/ and test/.
    root: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Comma-separated class names, overriding data.yaml and classes.txt.
    #[arg(long, env = "LABELSCOPE_CLASSES", value_delimiter = ',')]
    classes: Option<Vec<String>>,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the labelscope CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelscopeError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Analyze(args)) => run_analyze(args),
        Some(Commands::Check(args)) => run_check(args),
        None => {
            println!("labelscope {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Annotation statistics for YOLO-style datasets.");
            println!();
            println!("Run 'labelscope --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    // A logger may already be installed when embedded; keep it.
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn check_output_format(output: &str) -> Result<(), LabelscopeError> {
    match output {
        "text" | "json" => Ok(()),
        other => Err(LabelscopeError::UnsupportedFormat(format!(
            "'{}' (supported: text, json)",
            other
        ))),
    }
}

/// Execute the analyze subcommand.
fn run_analyze(args: AnalyzeArgs) -> Result<(), LabelscopeError> {
    check_output_format(&args.output)?;

    if args.quality_csv.is_some() && args.quality == QualityScope::None {
        warn!("--quality-csv given without --quality; the CSV will be empty");
    }

    let catalog_opts = CatalogOptions {
        classes: args.classes,
    };
    let opts = AnalyzeOptions {
        quality: args.quality,
        quality_sample: args.sample,
        seed: args.seed,
        parallel: args.parallel,
        blur_threshold: args.blur_threshold,
        progress: Some(ProgressHook::new(|done| {
            if done % PROGRESS_EVERY == 0 {
                info!("{done} file(s) analyzed");
            }
        })),
        ..Default::default()
    };

    let analysis = stats::analyze_root(&args.root, &catalog_opts, &opts)?;

    if let Some(path) = &args.quality_csv {
        stats::write_quality_csv(path, &analysis.images)?;
        info!(
            "wrote {} quality record(s) to {}",
            analysis.images.len(),
            path.display()
        );
    }

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&analysis.stats)?),
        _ => print!("{}", analysis.stats),
    }

    Ok(())
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), LabelscopeError> {
    check_output_format(&args.output)?;

    let catalog_opts = CatalogOptions {
        classes: args.classes,
    };
    let catalog = DatasetCatalog::discover(&args.root, &catalog_opts)?;
    let schema = schema::detect_schema(&catalog.splits);

    let opts = CheckOptions {
        strict: args.strict,
    };
    let report = validation::check_conformance(&catalog, schema, &opts);

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (opts.strict && has_warnings) {
        Err(LabelscopeError::ConformanceFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}
