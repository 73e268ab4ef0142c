//! Factory functions for creating test data.
//!
//! Building outlines as point rings and as segment soups, the way a vector
//! drawing parser would hand them over.

use shared::{Point2D, RawSegment};

// ── Point rings ─────────────────────────────────────────────────

/// Axis-aligned rectangle with its corner at the origin, counter-clockwise.
pub fn rectangle_points(w: f64, h: f64) -> Vec<Point2D> {
    vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(w, 0.0),
        Point2D::new(w, h),
        Point2D::new(0.0, h),
    ]
}

/// L-shaped outline: `w` x `h` with a `cut_w` x `cut_h` notch at the top right.
pub fn l_shape_points(w: f64, h: f64, cut_w: f64, cut_h: f64) -> Vec<Point2D> {
    vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(w, 0.0),
        Point2D::new(w, h - cut_h),
        Point2D::new(w - cut_w, h - cut_h),
        Point2D::new(w - cut_w, h),
        Point2D::new(0.0, h),
    ]
}

// ── Segment soups ───────────────────────────────────────────────

/// Edges of a closed ring as raw segments.
pub fn ring_segments(points: &[Point2D]) -> Vec<RawSegment> {
    let n = points.len();
    (0..n)
        .map(|i| RawSegment {
            start: points[i],
            end: points[(i + 1) % n],
        })
        .collect()
}

pub fn rectangle_segments(w: f64, h: f64) -> Vec<RawSegment> {
    ring_segments(&rectangle_points(w, h))
}

/// Shift every endpoint by a small deterministic offset below `jitter`,
/// imitating drawings whose corners do not quite meet.
pub fn jittered(segments: &[RawSegment], jitter: f64) -> Vec<RawSegment> {
    segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let a = jitter * 0.3 * if i % 2 == 0 { 1.0 } else { -1.0 };
            let b = jitter * 0.2 * if i % 3 == 0 { -1.0 } else { 1.0 };
            RawSegment::new(s.start.x + a, s.start.y + b, s.end.x - b, s.end.y + a)
        })
        .collect()
}

/// Rectangle outline plus interior clutter: a small room loop, a dangling
/// dimension line and a duplicated edge.
pub fn cluttered_floor_plan(w: f64, h: f64) -> Vec<RawSegment> {
    let mut segments = rectangle_segments(w, h);
    let room = [
        Point2D::new(w * 0.1, h * 0.1),
        Point2D::new(w * 0.3, h * 0.1),
        Point2D::new(w * 0.3, h * 0.4),
        Point2D::new(w * 0.1, h * 0.4),
    ];
    segments.extend(ring_segments(&room));
    segments.push(RawSegment::new(w * 0.5, h * 0.5, w * 0.8, h * 0.5));
    segments.push(RawSegment::new(w, 0.0, 0.0, 0.0));
    segments
}
