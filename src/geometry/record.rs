//! Typed label records.

use super::{shoelace_area, NormBox, Point};

/// The geometry carried by one annotation line.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// `cx cy w h`, normalized.
    BBox(NormBox),
    /// Ordered vertex ring, normalized.
    Polygon(Vec<Point>),
}

impl Geometry {
    /// Returns the area as a fraction of the image area.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::BBox(bbox) => bbox.area(),
            Geometry::Polygon(points) => shoelace_area(points),
        }
    }

    /// Returns true if every coordinate lies in `[0, 1]`.
    pub fn is_normalized(&self) -> bool {
        match self {
            Geometry::BBox(bbox) => bbox.is_normalized(),
            Geometry::Polygon(points) => points.iter().all(Point::is_normalized),
        }
    }
}

/// One parsed annotation line: a class id plus its geometry.
///
/// The class id is kept signed so that a negative id in the source file is
/// representable and can be reported as out of range instead of failing to
/// parse.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelRecord {
    pub class_id: i64,
    pub geometry: Geometry,
}

impl LabelRecord {
    /// Creates a new label record.
    pub fn new(class_id: i64, geometry: Geometry) -> Self {
        Self { class_id, geometry }
    }

    /// Returns the relative area of the label.
    pub fn area(&self) -> f64 {
        self.geometry.area()
    }

    /// Returns true if the geometry encloses no usable area.
    ///
    /// Degenerate labels still count toward class frequencies but are left
    /// out of size statistics.
    pub fn is_degenerate(&self) -> bool {
        let area = self.area();
        !area.is_finite() || area <= 0.0
    }

    /// Returns the class index if it falls inside `[0, num_classes)`.
    pub fn class_index(&self, num_classes: usize) -> Option<usize> {
        usize::try_from(self.class_id)
            .ok()
            .filter(|&idx| idx < num_classes)
    }
}
