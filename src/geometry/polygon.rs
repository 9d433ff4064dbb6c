//! Polygon area via the shoelace formula.

use super::Point;

/// Computes the area enclosed by an ordered vertex ring.
///
/// The ring is implicitly closed (the last vertex connects back to the
/// first). The absolute value makes the result independent of winding
/// direction. Fewer than three vertices enclose nothing and yield `0.0`.
pub fn shoelace_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_signed = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % n];
        twice_signed += p.x * q.y - p.y * q.x;
    }

    0.5 * twice_signed.abs()
}
