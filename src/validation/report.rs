//! Conformance report types for structured issue reporting.
//!
//! Reports can be displayed to users, serialized as JSON, or filtered
//! programmatically by their stable issue codes.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// The result of checking a dataset for conformance.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// All issues found, in check order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns the number of issues with a given code.
    pub fn count_of(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns true if the check passed in strict mode (no errors or warnings).
    pub fn is_ok_strict(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Conformance check passed: no issues found");
        }

        writeln!(
            f,
            "Conformance check completed with {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single conformance issue (error or warning).
#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Where the issue occurred.
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        code: IssueCode,
        message: impl Into<String>,
        context: IssueContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, code, message, context)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a conformance issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious but analyzable; the aggregator tolerates it.
    Warning,
    /// Data the aggregator has to skip.
    Error,
}

/// A stable code identifying the type of conformance issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    // Layout issues
    /// No split directory with both images/ and labels/ was found.
    NoSplits,
    /// A split directory exists but lacks images/ or labels/.
    MissingSplitDirectory,

    // Pairing issues
    /// An image has no label file with the same stem.
    OrphanImage,
    /// A label file has no image with the same stem.
    OrphanLabel,
    /// A label file could not be read.
    UnreadableLabelFile,

    // Line issues
    /// A line does not parse under the detected schema.
    MalformedLine,
    /// A line has the token count of the other schema.
    SchemaMismatch,
    /// A class id is negative or not in the class list.
    ClassIdOutOfRange,
    /// A geometry has zero or non-finite area.
    DegenerateGeometry,
    /// A normalized coordinate lies outside [0, 1].
    CoordinateOutOfRange,
}

/// Where a conformance issue occurred.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    /// The dataset as a whole.
    Dataset,
    /// A split directory.
    Split { name: String },
    /// A whole file.
    File { path: PathBuf },
    /// One line of a label file (1-based).
    Line { path: PathBuf, line: usize },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Split { name } => write!(f, "split {}", name),
            IssueContext::File { path } => write!(f, "{}", path.display()),
            IssueContext::Line { path, line } => write!(f, "{}:{}", path.display(), line),
        }
    }
}
