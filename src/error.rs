use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for labelscope operations.
///
/// Only failures that make a whole run meaningless end up here. Problems with
/// individual label lines or images are recovered locally and surface as
/// counters in [`DatasetStats`](crate::stats::DatasetStats).
#[derive(Debug, Error)]
pub enum LabelscopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid dataset root {path}: {message}")]
    DatasetRootInvalid { path: PathBuf, message: String },

    #[error("Failed while listing {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to parse dataset YAML from {path}: {source}")]
    DataYamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid classes.txt at {path}: {message}")]
    ClassesTxtInvalid { path: PathBuf, message: String },

    #[error("Failed to serialize report as JSON: {0}")]
    ReportJson(#[from] serde_json::Error),

    #[error("Failed to write quality CSV to {path}: {source}")]
    QualityCsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Conformance check failed with {error_count} error(s) and {warning_count} warning(s)")]
    ConformanceFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
