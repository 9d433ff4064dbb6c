//! Dataset conformance checking.
//!
//! Analysis is deliberately tolerant: anything it cannot use is skipped and
//! counted. The conformance checker is the strict counterpart. It walks the
//! same catalog and reports every problem it finds, with a location, so the
//! dataset can be fixed instead of silently under-counted:
//! - Layout (no valid splits, split directories missing a subdirectory)
//! - Pairing (orphan images and labels, unreadable label files)
//! - Lines (malformed, wrong schema, class id out of range, degenerate or
//!   out-of-range geometry)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::fs;

use log::{info, warn};

use crate::catalog::{DatasetCatalog, Split};
use crate::parser::parse_label_line;
use crate::schema::{classify_line, AnnotationSchema};

/// Options for conformance checking.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// If true, callers should treat warnings as failures.
    pub strict: bool,
}

/// Checks a catalog under a fixed schema and returns every issue found.
///
/// The report does not depend on `opts.strict`; strictness only changes how
/// a caller judges the result (see [`ValidationReport::is_ok_strict`]).
pub fn check_conformance(
    catalog: &DatasetCatalog,
    schema: AnnotationSchema,
    _opts: &CheckOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    check_layout(catalog, &mut report);
    for split in &catalog.splits {
        check_split(catalog, split, schema, &mut report);
    }

    info!(
        "conformance check: {} error(s), {} warning(s)",
        report.error_count(),
        report.warning_count()
    );
    report
}

fn check_layout(catalog: &DatasetCatalog, report: &mut ValidationReport) {
    for missing in &catalog.missing {
        let what = match (missing.missing_images, missing.missing_labels) {
            (true, true) => "images/ and labels/",
            (true, false) => "images/",
            _ => "labels/",
        };
        report.add(ValidationIssue::warning(
            IssueCode::MissingSplitDirectory,
            format!("{} is missing {}", missing.dir.display(), what),
            IssueContext::Split {
                name: missing.name.to_string(),
            },
        ));
    }

    if catalog.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::NoSplits,
            format!(
                "no train/val/test split with images/ and labels/ under {}",
                catalog.root.display()
            ),
            IssueContext::Dataset,
        ));
    }
}

fn check_split(
    catalog: &DatasetCatalog,
    split: &Split,
    schema: AnnotationSchema,
    report: &mut ValidationReport,
) {
    let split_context = || IssueContext::Split {
        name: split.dir_name.clone(),
    };

    let (pairs, orphans) = match catalog.pairs_and_orphans(split) {
        Ok(files) => files,
        Err(err) => {
            warn!("cannot list split '{}': {err}", split.dir_name);
            report.add(ValidationIssue::error(
                IssueCode::MissingSplitDirectory,
                format!("cannot list files: {err}"),
                split_context(),
            ));
            return;
        }
    };

    for path in orphans.images {
        report.add(ValidationIssue::warning(
            IssueCode::OrphanImage,
            "image has no label file",
            IssueContext::File { path },
        ));
    }
    for path in orphans.labels {
        report.add(ValidationIssue::warning(
            IssueCode::OrphanLabel,
            "label file has no image",
            IssueContext::File { path },
        ));
    }

    let num_classes = catalog.classes.len();
    for pair in &pairs {
        let content = match fs::read_to_string(&pair.label_path) {
            Ok(content) => content,
            Err(err) => {
                report.add(ValidationIssue::error(
                    IssueCode::UnreadableLabelFile,
                    err.to_string(),
                    IssueContext::File {
                        path: pair.label_path.clone(),
                    },
                ));
                continue;
            }
        };

        for (line_idx, line) in content.lines().enumerate() {
            let context = || IssueContext::Line {
                path: pair.label_path.clone(),
                line: line_idx + 1,
            };

            let record = match parse_label_line(line, schema) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    report.add(ValidationIssue::error(
                        IssueCode::MalformedLine,
                        err.to_string(),
                        context(),
                    ));
                    continue;
                }
            };

            if let Some(line_schema) = classify_line(line).filter(|s| *s != schema) {
                report.add(ValidationIssue::error(
                    IssueCode::SchemaMismatch,
                    format!("{} line in a {} dataset", line_schema, schema),
                    context(),
                ));
                continue;
            }

            if record.class_index(num_classes).is_none() {
                report.add(ValidationIssue::error(
                    IssueCode::ClassIdOutOfRange,
                    format!(
                        "class id {} not in {} class(es)",
                        record.class_id, num_classes
                    ),
                    context(),
                ));
            }

            if record.is_degenerate() {
                report.add(ValidationIssue::warning(
                    IssueCode::DegenerateGeometry,
                    format!("geometry has area {}", record.area()),
                    context(),
                ));
            }

            if !record.geometry.is_normalized() {
                report.add(ValidationIssue::warning(
                    IssueCode::CoordinateOutOfRange,
                    "coordinate outside [0, 1]",
                    context(),
                ));
            }
        }
    }
}
