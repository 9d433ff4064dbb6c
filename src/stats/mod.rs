//! Dataset statistics.
//!
//! The aggregator walks every image/label pair of a catalog, splits in
//! train/val/test order and pairs in file-name order, parses each label line
//! and optionally measures the image. Every file yields a small
//! self-contained outcome that is folded into running totals in that same
//! order, so repeated runs over an unchanged dataset produce identical
//! statistics whether files are processed sequentially or in parallel.

mod export;
mod report;

pub use export::{quality_csv_string, write_quality_csv};
pub use report::{
    DatasetStats, ImageQualityRecord, LabelCount, MetricSpread, QualitySummary, SkipCounters,
    SplitStats,
};

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;

use crate::catalog::{CatalogOptions, ClassList, DatasetCatalog, FilePair, Split, SplitName};
use crate::error::LabelscopeError;
use crate::parser::parse_label_line;
use crate::quality::{measure_image, QualityMeasurement};
use crate::schema::{detect_schema, AnnotationSchema};

/// Blur score under which an image counts as blurry.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

/// Which splits get image quality metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QualityScope {
    /// Count labels only; no image is decoded.
    #[default]
    None,
    All,
    Split(SplitName),
}

impl QualityScope {
    pub fn includes(&self, split: SplitName) -> bool {
        match self {
            QualityScope::None => false,
            QualityScope::All => true,
            QualityScope::Split(name) => *name == split,
        }
    }
}

impl FromStr for QualityScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(QualityScope::None),
            "all" => Ok(QualityScope::All),
            other => other.parse::<SplitName>().map(QualityScope::Split).map_err(|_| {
                format!("unknown quality scope '{other}' (expected none, all, train, val or test)")
            }),
        }
    }
}

/// Shared flag for aborting a long analysis between files.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Files already in progress still finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Callback run after each file is folded, with the number of files folded
/// so far in this run.
#[derive(Clone)]
pub struct ProgressHook(Arc<dyn Fn(usize) + Send + Sync>);

impl ProgressHook {
    pub fn new(hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    fn call(&self, files_done: usize) {
        (self.0)(files_done)
    }
}

impl fmt::Debug for ProgressHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressHook")
    }
}

/// Options for an analysis run.
#[derive(Clone, Debug)]
pub struct AnalyzeOptions {
    /// Splits whose images are decoded for blur/brightness.
    pub quality: QualityScope,
    /// Measure at most this many images per split, chosen with `seed`.
    pub quality_sample: Option<usize>,
    /// Seed for quality sampling.
    pub seed: u64,
    /// Process files of a split on the rayon thread pool.
    pub parallel: bool,
    /// Blur score under which an image counts as blurry.
    pub blur_threshold: f64,
    /// Width of histogram bars (in characters) in the text report.
    pub bar_width: usize,
    pub cancel: CancelToken,
    pub progress: Option<ProgressHook>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            quality: QualityScope::None,
            quality_sample: None,
            seed: 42,
            parallel: false,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            bar_width: 20,
            cancel: CancelToken::default(),
            progress: None,
        }
    }
}

/// Output of one analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub stats: DatasetStats,
    /// Per-image quality records in processing order; empty unless quality
    /// metrics were requested.
    pub images: Vec<ImageQualityRecord>,
}

/// Discover a dataset root, detect its schema and analyze it.
pub fn analyze_root(
    root: &Path,
    catalog_opts: &CatalogOptions,
    opts: &AnalyzeOptions,
) -> Result<Analysis, LabelscopeError> {
    let catalog = DatasetCatalog::discover(root, catalog_opts)?;
    let schema = detect_schema(&catalog.splits);
    Ok(analyze_dataset(&catalog, schema, opts))
}

/// Analyze every pair of a catalog under a fixed schema.
///
/// Never fails: unreadable files, malformed lines and undecodable images are
/// counted in the returned statistics. A cancelled run returns the totals of
/// the files that finished, with `stats.cancelled` set.
pub fn analyze_dataset(
    catalog: &DatasetCatalog,
    schema: AnnotationSchema,
    opts: &AnalyzeOptions,
) -> Analysis {
    let mut acc = Accumulator::new(schema, catalog.classes.clone());
    let mut images = Vec::new();

    for split in &catalog.splits {
        if opts.cancel.is_cancelled() {
            acc.cancelled = true;
            break;
        }

        let mut split_stats = SplitStats {
            name: split.name,
            dir_name: split.dir_name.clone(),
            images: 0,
            labels: 0,
        };

        let pairs = match catalog.pairs(split) {
            Ok(pairs) => pairs,
            Err(err) => {
                warn!("cannot list split '{}': {err}", split.dir_name);
                acc.splits.push(split_stats);
                continue;
            }
        };

        let measure = quality_mask(split, pairs.len(), opts);
        info!(
            "analyzing split '{}': {} pair(s), {} to measure",
            split.dir_name,
            pairs.len(),
            measure.iter().filter(|&&m| m).count()
        );

        let num_classes = catalog.classes.len();
        if opts.parallel {
            let outcomes: Vec<Option<FileOutcome>> = pairs
                .par_iter()
                .zip(measure.par_iter())
                .map(|(pair, &measure)| {
                    if opts.cancel.is_cancelled() {
                        return None;
                    }
                    Some(process_file(pair, schema, num_classes, measure))
                })
                .collect();

            for (pair, outcome) in pairs.iter().zip(outcomes) {
                match outcome {
                    Some(outcome) => {
                        acc.fold(split.name, &mut split_stats, pair, outcome, &mut images);
                        report_progress(opts, acc.total_images);
                    }
                    None => acc.cancelled = true,
                }
            }
        } else {
            for (pair, &measure) in pairs.iter().zip(&measure) {
                if opts.cancel.is_cancelled() {
                    acc.cancelled = true;
                    break;
                }
                let outcome = process_file(pair, schema, num_classes, measure);
                acc.fold(split.name, &mut split_stats, pair, outcome, &mut images);
                report_progress(opts, acc.total_images);
            }
        }

        acc.splits.push(split_stats);
        if acc.cancelled {
            warn!("analysis cancelled; returning partial statistics");
            break;
        }
    }

    let quality = (opts.quality != QualityScope::None)
        .then(|| QualitySummary::from_records(&images, opts.blur_threshold));
    let stats = acc.finish(quality, opts.bar_width);

    info!(
        "analyzed {} image(s) with {} label(s)",
        stats.total_images, stats.total_labels
    );

    Analysis { stats, images }
}

fn report_progress(opts: &AnalyzeOptions, files_done: usize) {
    if let Some(hook) = &opts.progress {
        hook.call(files_done);
    }
}

/// Decide which pairs of a split get their image measured.
fn quality_mask(split: &Split, len: usize, opts: &AnalyzeOptions) -> Vec<bool> {
    if !opts.quality.includes(split.name) {
        return vec![false; len];
    }

    match opts.quality_sample {
        Some(k) if k < len => {
            let mut indices: Vec<usize> = (0..len).collect();
            let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(split.name as u64));
            indices.shuffle(&mut rng);

            let mut mask = vec![false; len];
            for idx in indices.into_iter().take(k) {
                mask[idx] = true;
            }
            mask
        }
        _ => vec![true; len],
    }
}

/// Everything one image/label pair contributes to the totals.
#[derive(Debug, Default)]
struct FileOutcome {
    /// Class index of every counted label, in line order.
    class_hits: Vec<usize>,
    /// Areas of counted, non-degenerate labels.
    areas: Vec<f64>,
    malformed: usize,
    out_of_range: usize,
    degenerate: usize,
    label_file_unreadable: bool,
    measurement: Option<QualityMeasurement>,
}

fn process_file(
    pair: &FilePair,
    schema: AnnotationSchema,
    num_classes: usize,
    measure: bool,
) -> FileOutcome {
    let mut outcome = FileOutcome::default();

    match fs::read_to_string(&pair.label_path) {
        Ok(content) => {
            for (line_idx, line) in content.lines().enumerate() {
                match parse_label_line(line, schema) {
                    Ok(None) => {}
                    Ok(Some(record)) => match record.class_index(num_classes) {
                        Some(class_idx) => {
                            outcome.class_hits.push(class_idx);
                            if record.is_degenerate() {
                                outcome.degenerate += 1;
                            } else {
                                outcome.areas.push(record.area());
                            }
                        }
                        None => {
                            debug!(
                                "{}:{}: class id {} out of range for {} class(es)",
                                pair.label_path.display(),
                                line_idx + 1,
                                record.class_id,
                                num_classes
                            );
                            outcome.out_of_range += 1;
                        }
                    },
                    Err(err) => {
                        debug!("{}:{}: {err}", pair.label_path.display(), line_idx + 1);
                        outcome.malformed += 1;
                    }
                }
            }
        }
        Err(err) => {
            warn!("cannot read {}: {err}", pair.label_path.display());
            outcome.label_file_unreadable = true;
        }
    }

    if measure {
        outcome.measurement = Some(measure_image(&pair.image_path));
    }

    outcome
}

/// Running totals owned by one analysis run.
struct Accumulator {
    schema: AnnotationSchema,
    classes: ClassList,
    class_counts: Vec<usize>,
    splits: Vec<SplitStats>,
    total_images: usize,
    total_labels: usize,
    skipped: SkipCounters,
    cancelled: bool,
}

impl Accumulator {
    fn new(schema: AnnotationSchema, classes: ClassList) -> Self {
        Self {
            schema,
            class_counts: vec![0; classes.len()],
            classes,
            splits: Vec::new(),
            total_images: 0,
            total_labels: 0,
            skipped: SkipCounters::default(),
            cancelled: false,
        }
    }

    fn fold(
        &mut self,
        split: SplitName,
        split_stats: &mut SplitStats,
        pair: &FilePair,
        outcome: FileOutcome,
        images: &mut Vec<ImageQualityRecord>,
    ) {
        let labels = outcome.class_hits.len();
        for class_idx in outcome.class_hits {
            self.class_counts[class_idx] += 1;
        }

        split_stats.images += 1;
        split_stats.labels += labels;
        self.total_images += 1;
        self.total_labels += labels;

        self.skipped.malformed_lines += outcome.malformed;
        self.skipped.out_of_range_labels += outcome.out_of_range;
        self.skipped.degenerate_labels += outcome.degenerate;
        if outcome.label_file_unreadable {
            self.skipped.unreadable_label_files += 1;
        }

        if let Some(m) = outcome.measurement {
            let avg_label_area = if outcome.areas.is_empty() {
                0.0
            } else {
                outcome.areas.iter().sum::<f64>() / outcome.areas.len() as f64
            };

            images.push(ImageQualityRecord {
                split,
                image: pair.image_name.clone(),
                path: pair.image_path.clone(),
                readable: m.readable,
                width: m.width,
                height: m.height,
                blur_score: m.blur_score,
                brightness: m.brightness,
                label_areas: outcome.areas,
                avg_label_area,
            });
        }
    }

    fn finish(self, quality: Option<QualitySummary>, bar_width: usize) -> DatasetStats {
        let avg_labels_per_image = if self.total_images > 0 {
            self.total_labels as f64 / self.total_images as f64
        } else {
            0.0
        };

        let labels_per_class = self
            .classes
            .iter()
            .zip(self.class_counts)
            .map(|(label, count)| LabelCount {
                label: label.to_string(),
                count,
            })
            .collect();

        DatasetStats {
            schema: self.schema,
            splits: self.splits,
            total_images: self.total_images,
            total_labels: self.total_labels,
            labels_per_class,
            avg_labels_per_image,
            skipped: self.skipped,
            quality,
            cancelled: self.cancelled,
            bar_width,
        }
    }
}
