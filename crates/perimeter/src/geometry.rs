//! Area calculator and small geometric helpers on top of kurbo

use kurbo::{Line as KLine, Point, Vec2};
use shared::Point2D;

/// Two coordinates closer than this are treated as the same point
pub const EPSILON: f64 = 1e-9;

// ============================================================================
// Kurbo helpers
// ============================================================================

/// Convert shared point to kurbo Point
pub fn to_point(p: Point2D) -> Point {
    Point::new(p.x, p.y)
}

/// Vector from `a` to `b`
pub fn vector(a: Point2D, b: Point2D) -> Vec2 {
    to_point(b) - to_point(a)
}

/// Normalize angle in degrees to [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

// ============================================================================
// Area calculator
// ============================================================================

/// Signed polygon area (shoelace formula).
///
/// Positive for counter-clockwise vertex order in a y-up frame. The closing
/// pair (last, first) is always included. Fewer than 3 points yield 0.
pub fn signed_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Absolute polygon area
pub fn polygon_area(points: &[Point2D]) -> f64 {
    signed_area(points).abs()
}

/// Total edge length; includes the closing edge when `closed`
pub fn perimeter_length(points: &[Point2D], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    if closed && points.len() >= 3 {
        open + points[points.len() - 1].distance(points[0])
    } else {
        open
    }
}

/// Axis-aligned bounding box as (min, max), None for an empty slice
pub fn bounding_box<'a>(points: impl IntoIterator<Item = &'a Point2D>) -> Option<(Point2D, Point2D)> {
    let mut iter = points.into_iter();
    let first = *iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), p| {
        (
            Point2D::new(min.x.min(p.x), min.y.min(p.y)),
            Point2D::new(max.x.max(p.x), max.y.max(p.y)),
        )
    });
    Some((min, max))
}

// ============================================================================
// Intersections
// ============================================================================

/// Line-line intersection, returns (t, u, point) with t, u the parameters
/// along `l1` and `l2`. None for parallel lines.
pub fn line_line_intersection(l1: KLine, l2: KLine) -> Option<(f64, f64, Point)> {
    let d1 = l1.p1 - l1.p0;
    let d2 = l2.p1 - l2.p0;
    let cross = d1.x * d2.y - d1.y * d2.x;

    if cross.abs() < 1e-10 {
        return None;
    }

    let d = l2.p0 - l1.p0;
    let t = (d.x * d2.y - d.y * d2.x) / cross;
    let u = (d.x * d1.y - d.y * d1.x) / cross;

    let pt = l1.p0 + d1 * t;
    Some((t, u, pt))
}

/// Do two closed segments properly cross (including touching interiors)?
pub fn segments_intersect(a0: Point2D, a1: Point2D, b0: Point2D, b1: Point2D) -> bool {
    let l1 = KLine::new(to_point(a0), to_point(a1));
    let l2 = KLine::new(to_point(b0), to_point(b1));
    match line_line_intersection(l1, l2) {
        Some((t, u, _)) => {
            let eps = 1e-9;
            (-eps..=1.0 + eps).contains(&t) && (-eps..=1.0 + eps).contains(&u)
        }
        None => collinear_overlap(a0, a1, b0, b1),
    }
}

/// Parallel segments overlap only if they are collinear and their
/// projections share more than a point
fn collinear_overlap(a0: Point2D, a1: Point2D, b0: Point2D, b1: Point2D) -> bool {
    let d = vector(a0, a1);
    let len_sq = d.hypot2();
    if len_sq < EPSILON {
        return false;
    }
    let offset = vector(a0, b0);
    if d.cross(offset).abs() / len_sq.sqrt() > 1e-9 {
        return false;
    }
    let t0 = offset.dot(d) / len_sq;
    let t1 = vector(a0, b1).dot(d) / len_sq;
    let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    hi > 1e-9 && lo < 1.0 - 1e-9
}
