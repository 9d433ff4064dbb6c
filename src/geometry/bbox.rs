//! Normalized bounding boxes in YOLO center format.

use serde::{Deserialize, Serialize};

/// An axis-aligned box stored as normalized `(cx, cy, width, height)`.
///
/// Like the rest of the geometry model, the constructor accepts any values:
/// a negative or zero size is representable and shows up as a degenerate
/// area rather than a panic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormBox {
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
}

impl NormBox {
    /// Creates a box from center coordinates and size.
    #[inline]
    pub fn new(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
        }
    }

    /// Returns the area as a fraction of the image area.
    ///
    /// Width and height are already normalized, so no pixel dimensions are
    /// involved. May be negative if the box is malformed.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Returns true if all four values are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.cx.is_finite()
            && self.cy.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Returns true if every value lies in `[0, 1]`.
    #[inline]
    pub fn is_normalized(&self) -> bool {
        [self.cx, self.cy, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}
