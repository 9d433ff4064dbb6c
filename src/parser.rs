//! Label-line parsing.
//!
//! Each non-blank line of a label file is `class_id v1 v2 ... vn`. The active
//! [`AnnotationSchema`] decides how the coordinate tokens are read. Parsing
//! never aborts a run: a malformed line produces a [`LabelParseError`] that the
//! caller counts and skips.

use thiserror::Error;

use crate::geometry::{Geometry, LabelRecord, NormBox, Point};
use crate::schema::AnnotationSchema;

/// Minimum number of whitespace-separated tokens on a usable line.
pub const MIN_TOKENS: usize = 5;

/// Why a single label line could not be turned into a [`LabelRecord`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LabelParseError {
    #[error("expected at least {MIN_TOKENS} tokens, found {found}")]
    TooFewTokens { found: usize },

    #[error("invalid class_id '{0}'; expected an integer")]
    InvalidClassId(String),

    #[error("invalid coordinate '{raw}' at token {index}; expected a floating-point number")]
    InvalidCoordinate { index: usize, raw: String },

    #[error("polygon has an odd number of coordinates ({count})")]
    OddPolygonCoordinates { count: usize },
}

/// Parse one raw label line under the given schema.
///
/// Returns `Ok(None)` for blank lines. Class ids are not range-checked here;
/// see [`LabelRecord::class_index`].
pub fn parse_label_line(
    line: &str,
    schema: AnnotationSchema,
) -> Result<Option<LabelRecord>, LabelParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return Err(LabelParseError::TooFewTokens {
            found: tokens.len(),
        });
    }

    let class_id = tokens[0]
        .parse::<i64>()
        .map_err(|_| LabelParseError::InvalidClassId(tokens[0].to_string()))?;

    let geometry = match schema {
        AnnotationSchema::BoundingBox => {
            // Trailing tokens beyond the four box values are ignored.
            let cx = parse_coord(tokens[1], 1)?;
            let cy = parse_coord(tokens[2], 2)?;
            let w = parse_coord(tokens[3], 3)?;
            let h = parse_coord(tokens[4], 4)?;
            Geometry::BBox(NormBox::new(cx, cy, w, h))
        }
        AnnotationSchema::Polygon => {
            let coords = &tokens[1..];
            if coords.len() % 2 != 0 {
                return Err(LabelParseError::OddPolygonCoordinates {
                    count: coords.len(),
                });
            }

            let mut points = Vec::with_capacity(coords.len() / 2);
            for (pair_idx, pair) in coords.chunks_exact(2).enumerate() {
                let index = 1 + pair_idx * 2;
                let x = parse_coord(pair[0], index)?;
                let y = parse_coord(pair[1], index + 1)?;
                points.push(Point::new(x, y));
            }
            Geometry::Polygon(points)
        }
    };

    Ok(Some(LabelRecord::new(class_id, geometry)))
}

fn parse_coord(raw: &str, index: usize) -> Result<f64, LabelParseError> {
    raw.parse::<f64>()
        .map_err(|_| LabelParseError::InvalidCoordinate {
            index,
            raw: raw.to_string(),
        })
}

/// Fuzz-only entrypoint for single-line parsing under both schemas.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) {
    for schema in [AnnotationSchema::BoundingBox, AnnotationSchema::Polygon] {
        if let Ok(Some(record)) = parse_label_line(input, schema) {
            let _ = record.area();
        }
    }
}
