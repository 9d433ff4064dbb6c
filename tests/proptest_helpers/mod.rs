#![allow(dead_code)]

use labelscope::geometry::Point;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS_AREA: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A normalized coordinate.
pub fn arb_coord() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

pub fn arb_point() -> impl Strategy<Value = Point> {
    (arb_coord(), arb_coord()).prop_map(|(x, y)| Point::new(x, y))
}

/// A vertex ring of 3 to `max_points` normalized points.
pub fn arb_ring(max_points: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec(arb_point(), 3..=max_points)
}

/// Renders a polygon label line.
pub fn polygon_line(class_id: usize, points: &[Point]) -> String {
    let mut line = class_id.to_string();
    for p in points {
        line.push_str(&format!(" {} {}", p.x, p.y));
    }
    line
}
