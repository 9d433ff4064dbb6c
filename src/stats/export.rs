//! CSV export of per-image quality records.

use std::path::Path;

use serde::Serialize;

use super::ImageQualityRecord;
use crate::error::LabelscopeError;

#[derive(Serialize)]
struct QualityCsvRow<'a> {
    split: &'a str,
    image: &'a str,
    readable: bool,
    width: u32,
    height: u32,
    blur_score: f64,
    brightness: f64,
    labels: usize,
    avg_label_area: f64,
}

impl<'a> From<&'a ImageQualityRecord> for QualityCsvRow<'a> {
    fn from(record: &'a ImageQualityRecord) -> Self {
        Self {
            split: record.split.as_str(),
            image: &record.image,
            readable: record.readable,
            width: record.width,
            height: record.height,
            blur_score: record.blur_score,
            brightness: record.brightness,
            labels: record.label_areas.len(),
            avg_label_area: record.avg_label_area,
        }
    }
}

/// Write one CSV row per image quality record, with a header row.
pub fn write_quality_csv(
    path: &Path,
    records: &[ImageQualityRecord],
) -> Result<(), LabelscopeError> {
    let wrap = |source| LabelscopeError::QualityCsvWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    for record in records {
        writer.serialize(QualityCsvRow::from(record)).map_err(wrap)?;
    }
    writer
        .flush()
        .map_err(|err| wrap(csv::Error::from(err)))?;

    Ok(())
}

/// Render quality records as a CSV string.
pub fn quality_csv_string(records: &[ImageQualityRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(QualityCsvRow::from(record))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
