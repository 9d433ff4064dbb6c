//! Stats report types and terminal formatting.
//!
//! The structures here are the immutable outputs of one analysis run. They
//! can be rendered as text (Display) or serialized as JSON.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::SplitName;
use crate::schema::AnnotationSchema;

/// Dataset-wide statistics of one analysis run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetStats {
    /// Schema used to parse every label line.
    pub schema: AnnotationSchema,
    /// Per-split counts, in processing order.
    pub splits: Vec<SplitStats>,
    /// Number of paired images processed.
    pub total_images: usize,
    /// Number of labels counted (in-range class ids only).
    pub total_labels: usize,
    /// Label count for every class, in class-id order, zero-filled.
    pub labels_per_class: Vec<LabelCount>,
    /// `total_labels / total_images`, or 0 for an empty dataset.
    pub avg_labels_per_image: f64,
    /// Lines and files that were skipped or only partly used.
    pub skipped: SkipCounters,
    /// Image quality summary, when quality metrics were requested.
    pub quality: Option<QualitySummary>,
    /// True if the run was cancelled before every file was processed.
    pub cancelled: bool,
    /// Display-only option for histogram rendering width.
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

impl DatasetStats {
    /// Returns the label count for a class name.
    pub fn count_for(&self, label: &str) -> Option<usize> {
        self.labels_per_class
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.count)
    }

    /// Returns the image count of a split, if it was analyzed.
    pub fn images_in(&self, split: SplitName) -> Option<usize> {
        self.splits
            .iter()
            .find(|s| s.name == split)
            .map(|s| s.images)
    }
}

/// Counts for one split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    pub name: SplitName,
    /// Directory name under the dataset root.
    pub dir_name: String,
    pub images: usize,
    pub labels: usize,
}

/// A single class with its label count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    /// The class name.
    pub label: String,
    /// Number of labels with this class.
    pub count: usize,
}

/// Skip and failure counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounters {
    /// Lines that failed to parse.
    pub malformed_lines: usize,
    /// Parsed lines whose class id is outside the class list.
    pub out_of_range_labels: usize,
    /// Counted labels with zero or non-finite area (excluded from sizes).
    pub degenerate_labels: usize,
    /// Label files that could not be read.
    pub unreadable_label_files: usize,
}

/// Quality metrics of one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageQualityRecord {
    pub split: SplitName,
    /// Image file name.
    pub image: String,
    pub path: PathBuf,
    /// False when the image could not be decoded; scores are then zero.
    pub readable: bool,
    pub width: u32,
    pub height: u32,
    /// Laplacian variance (higher is sharper).
    pub blur_score: f64,
    /// Mean HSV value.
    pub brightness: f64,
    /// Relative areas of the image's usable labels.
    pub label_areas: Vec<f64>,
    /// Mean of `label_areas`, or 0 when there are none.
    pub avg_label_area: f64,
}

/// Min/mean/max of a metric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MetricSpread {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl MetricSpread {
    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        (count > 0).then(|| MetricSpread {
            min,
            mean: sum / count as f64,
            max,
        })
    }
}

/// Summary of the per-image quality records of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QualitySummary {
    /// Images whose decoding was attempted.
    pub measured: usize,
    /// Images that failed to decode.
    pub unreadable_images: usize,
    /// Blur score spread over readable images.
    pub blur: Option<MetricSpread>,
    /// Brightness spread over readable images.
    pub brightness: Option<MetricSpread>,
    /// Threshold used for `blurry_images`.
    pub blur_threshold: f64,
    /// Readable images with a blur score below the threshold.
    pub blurry_images: usize,
}

impl QualitySummary {
    /// Summarize a list of per-image records.
    pub fn from_records(records: &[ImageQualityRecord], blur_threshold: f64) -> Self {
        let readable = || records.iter().filter(|r| r.readable);

        QualitySummary {
            measured: records.len(),
            unreadable_images: records.iter().filter(|r| !r.readable).count(),
            blur: MetricSpread::from_values(readable().map(|r| r.blur_score)),
            brightness: MetricSpread::from_values(readable().map(|r| r.brightness)),
            blur_threshold,
            blurry_images: readable()
                .filter(|r| r.blur_score < blur_threshold)
                .count(),
        }
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(
            f,
            "╭─────────────────────────────────────────────────────────────╮"
        )?;
        writeln!(
            f,
            "│                 Dataset Annotation Report                   │"
        )?;
        writeln!(
            f,
            "╰─────────────────────────────────────────────────────────────╯"
        )?;
        writeln!(f)?;

        self.fmt_summary(f)?;
        writeln!(f)?;
        self.fmt_splits(f)?;
        writeln!(f)?;
        self.fmt_labels(f)?;
        writeln!(f)?;
        self.fmt_skipped(f)?;
        if let Some(quality) = &self.quality {
            writeln!(f)?;
            fmt_quality(f, quality)?;
        }

        Ok(())
    }
}

impl DatasetStats {
    fn fmt_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section_top(f, "Summary")?;
        writeln!(f, "│   Schema:          {:<39}│", self.schema.as_str())?;
        writeln!(
            f,
            "│   Images:          {:<39}│",
            format_number(self.total_images)
        )?;
        writeln!(
            f,
            "│   Labels:          {:<39}│",
            format_number(self.total_labels)
        )?;
        writeln!(
            f,
            "│   Labels/image:    {:<39}│",
            format!("{:.2}", self.avg_labels_per_image)
        )?;
        if self.cancelled {
            writeln!(
                f,
                "│   ⚠ Run cancelled: statistics are partial                 │"
            )?;
        }
        section_bottom(f)
    }

    fn fmt_splits(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section_top(f, &format!("Splits ({})", self.splits.len()))?;

        if self.splits.is_empty() {
            writeln!(
                f,
                "│   No valid splits found.                                  │"
            )?;
        } else {
            for split in &self.splits {
                writeln!(
                    f,
                    "│   {:<16} images {:>9}   labels {:>9}        │",
                    truncate_label(&split.dir_name, 16),
                    format_number(split.images),
                    format_number(split.labels)
                )?;
            }
        }

        section_bottom(f)
    }

    fn fmt_labels(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        section_top(f, &format!("Labels ({} classes)", self.labels_per_class.len()))?;

        if self.labels_per_class.is_empty() {
            writeln!(
                f,
                "│   No classes defined.                                     │"
            )?;
        } else {
            let max_count = self
                .labels_per_class
                .iter()
                .map(|e| e.count)
                .max()
                .unwrap_or(0);

            for entry in &self.labels_per_class {
                let bar = render_bar(entry.count, max_count, self.bar_width);
                writeln!(
                    f,
                    "│   {:<16} {:>7} {:>6}  {}│",
                    truncate_label(&entry.label, 16),
                    format_number(entry.count),
                    fmt_percent(entry.count, self.total_labels),
                    pad_bar(&bar, self.bar_width)
                )?;
            }
        }

        section_bottom(f)
    }

    fn fmt_skipped(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.skipped;
        section_top(f, "Skipped")?;

        let rows = [
            ("Malformed lines", s.malformed_lines),
            ("Out-of-range class ids", s.out_of_range_labels),
            ("Degenerate geometries", s.degenerate_labels),
            ("Unreadable label files", s.unreadable_label_files),
        ];

        if rows.iter().all(|(_, count)| *count == 0) {
            writeln!(
                f,
                "│   ✓ Nothing skipped                                       │"
            )?;
        } else {
            for (name, count) in rows {
                let mark = if count > 0 { "⚠" } else { "✓" };
                writeln!(
                    f,
                    "│   {} {:<24} {:>9}                    │",
                    mark,
                    name,
                    format_number(count)
                )?;
            }
        }

        section_bottom(f)
    }
}

fn fmt_quality(f: &mut fmt::Formatter<'_>, q: &QualitySummary) -> fmt::Result {
    section_top(f, "Image Quality")?;

    writeln!(
        f,
        "│   Measured:        {:<39}│",
        format_number(q.measured)
    )?;
    writeln!(
        f,
        "│   Unreadable:      {:<39}│",
        format!(
            "{} ({})",
            format_number(q.unreadable_images),
            fmt_percent(q.unreadable_images, q.measured)
        )
    )?;

    for (name, spread) in [("Blur score", q.blur), ("Brightness", q.brightness)] {
        match spread {
            Some(s) => writeln!(
                f,
                "│   {:<11} min {:>9.1}  mean {:>9.1}  max {:>9.1}  │",
                name, s.min, s.mean, s.max
            )?,
            None => writeln!(f, "│   {:<11} n/a{:<43}│", name, "")?,
        }
    }

    writeln!(
        f,
        "│   Blurry (< {:<6}) {:<39}│",
        format!("{:.0}", q.blur_threshold),
        format_number(q.blurry_images)
    )?;

    section_bottom(f)
}

fn section_top(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(
        f,
        "┌─ {} {}┐",
        title,
        "─".repeat(57usize.saturating_sub(title.chars().count()))
    )?;
    writeln!(
        f,
        "│                                                           │"
    )
}

fn section_bottom(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
        f,
        "│                                                           │"
    )?;
    writeln!(
        f,
        "└───────────────────────────────────────────────────────────┘"
    )
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a percentage, handling zero denominators.
fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return "░".repeat(width);
    }

    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Pad a bar string to ensure consistent column alignment.
fn pad_bar(bar: &str, width: usize) -> String {
    let visual_len = bar.chars().count();
    let padding = (width + 2).saturating_sub(visual_len);
    format!("{}{}", bar, " ".repeat(padding))
}

/// Truncate a label to fit in the display column.
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}
