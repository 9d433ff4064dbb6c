//! Geometry model for label records.
//!
//! YOLO-style label files store every coordinate as a fraction of the image
//! width or height. All types in this module keep that normalized space, so
//! an area computed here is already a fraction of the image area and never
//! needs the pixel dimensions of the image.
//!
//! # Example
//!
//! ```
//! use labelscope::geometry::{Geometry, LabelRecord, NormBox, Point};
//!
//! let boxed = LabelRecord::new(0, Geometry::BBox(NormBox::new(0.5, 0.5, 0.4, 0.5)));
//! assert!((boxed.area() - 0.2).abs() < 1e-12);
//!
//! let square = LabelRecord::new(
//!     1,
//!     Geometry::Polygon(vec![
//!         Point::new(0.0, 0.0),
//!         Point::new(1.0, 0.0),
//!         Point::new(1.0, 1.0),
//!         Point::new(0.0, 1.0),
//!     ]),
//! );
//! assert!((square.area() - 1.0).abs() < 1e-12);
//! ```

mod bbox;
mod point;
mod polygon;
mod record;

pub use bbox::NormBox;
pub use point::Point;
pub use polygon::shoelace_area;
pub use record::{Geometry, LabelRecord};
