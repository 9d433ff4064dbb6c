//! Annotation schema auto-detection.
//!
//! A dataset is either all bounding boxes or all polygons. The schema is
//! decided once per dataset from the first classifiable label line, scanning
//! splits in train/val/test order and label files in file-name order. This is
//! a fast heuristic; [`crate::validation::check_conformance`] is the strict
//! pass for callers that need every line verified.

use std::fmt;
use std::fs;

use log::{debug, info, warn};
use serde::Serialize;

use crate::catalog::{list_files_with_extensions, Split, LABEL_EXTENSION};

/// Number of coordinate tokens on a bounding-box line.
const BBOX_COORDS: usize = 4;

/// The geometry schema shared by every label file of a dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationSchema {
    /// `class cx cy w h`
    #[default]
    BoundingBox,
    /// `class x1 y1 x2 y2 ... xn yn`
    Polygon,
}

impl AnnotationSchema {
    /// Returns the schema implied by a coordinate-token count, if any.
    pub fn from_coord_count(count: usize) -> Option<Self> {
        if count == BBOX_COORDS {
            Some(AnnotationSchema::BoundingBox)
        } else if count > BBOX_COORDS && count % 2 == 0 {
            Some(AnnotationSchema::Polygon)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationSchema::BoundingBox => "bbox",
            AnnotationSchema::Polygon => "polygon",
        }
    }
}

impl fmt::Display for AnnotationSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a single label line by its token count.
///
/// Returns `None` for blank lines and for lines whose coordinate count fits
/// neither schema.
pub fn classify_line(line: &str) -> Option<AnnotationSchema> {
    let token_count = line.split_whitespace().count();
    if token_count == 0 {
        return None;
    }
    AnnotationSchema::from_coord_count(token_count - 1)
}

/// Detect the annotation schema of a dataset from its splits.
///
/// Splits are visited in the order given (catalogs keep them in
/// train/val/test order). Unreadable label files are skipped. Falls back to
/// [`AnnotationSchema::BoundingBox`] when no line classifies.
pub fn detect_schema(splits: &[Split]) -> AnnotationSchema {
    for split in splits {
        let label_files = match list_files_with_extensions(&split.labels_dir, &[LABEL_EXTENSION]) {
            Ok(files) => files,
            Err(err) => {
                warn!(
                    "skipping split '{}' during schema detection: {err}",
                    split.dir_name
                );
                continue;
            }
        };

        for label_path in label_files {
            let content = match fs::read_to_string(&label_path) {
                Ok(content) => content,
                Err(err) => {
                    warn!("cannot read {}: {err}", label_path.display());
                    continue;
                }
            };

            for (line_idx, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match classify_line(line) {
                    Some(schema) => {
                        info!(
                            "detected {schema} schema from {}:{}",
                            label_path.display(),
                            line_idx + 1
                        );
                        return schema;
                    }
                    None => debug!(
                        "line {}:{} does not classify, continuing",
                        label_path.display(),
                        line_idx + 1
                    ),
                }
            }
        }
    }

    info!("no classifiable label line found, defaulting to bbox schema");
    AnnotationSchema::BoundingBox
}
