//! Snap engine for manual tracing.
//!
//! Two passes run in order: alignment of X/Y to existing points, then ortho
//! snapping of the direction from the last placed point to a multiple of 45°.
//! Pure functions; nothing is cached between calls.

use serde::{Deserialize, Serialize};
use shared::Point2D;

use crate::geometry::{normalize_degrees, vector, EPSILON};

/// Canonical ortho step in degrees
const ORTHO_STEP_DEG: f64 = 45.0;

/// Snap settings for manual tracing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// Enable snapping
    pub enabled: bool,
    /// Max coordinate delta for alignment snapping, in working units
    pub align_threshold: f64,
    /// Soft ortho window around each canonical angle, in degrees
    pub angle_tolerance_deg: f64,
    /// Always snap to the nearest canonical angle
    pub hard_lock: bool,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            align_threshold: 12.0,
            angle_tolerance_deg: 5.0,
            hard_lock: false,
        }
    }
}

/// Guide line type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideKind {
    /// Horizontal line through a point whose Y was matched
    AlignHorizontal,
    /// Vertical line through a point whose X was matched
    AlignVertical,
    /// Ray from the last point along the locked angle
    AngleLock,
}

/// Transient guide line for on-screen feedback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGuide {
    pub kind: GuideKind,
    /// Point the line passes through (matched point, or the last point for angle locks)
    pub origin: Point2D,
    /// Line direction in degrees
    pub angle_deg: f64,
}

impl SnapGuide {
    /// Segment of the guide extending `extent` to both sides of the origin
    pub fn line(&self, extent: f64) -> (Point2D, Point2D) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let (dx, dy) = (cos * extent, sin * extent);
        match self.kind {
            GuideKind::AngleLock => (self.origin, Point2D::new(self.origin.x + dx, self.origin.y + dy)),
            _ => (
                Point2D::new(self.origin.x - dx, self.origin.y - dy),
                Point2D::new(self.origin.x + dx, self.origin.y + dy),
            ),
        }
    }
}

/// Output of one snap computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    pub point: Point2D,
    pub guides: Vec<SnapGuide>,
    /// X was pulled to an existing point
    pub snapped_x: bool,
    /// Y was pulled to an existing point
    pub snapped_y: bool,
    /// Direction was snapped to a canonical angle
    pub ortho: bool,
    /// Angle from the last point in [0, 360), 0 without a last point
    pub angle_deg: f64,
    /// Distance from the last point, 0 without a last point
    pub distance: f64,
}

/// Snap a raw cursor position with the default angle tolerance
pub fn compute_snap(
    raw: Point2D,
    last_point: Option<Point2D>,
    other_points: &[Point2D],
    align_threshold: f64,
    hard_lock: bool,
) -> SnapResult {
    let settings = SnapSettings {
        align_threshold,
        hard_lock,
        ..SnapSettings::default()
    };
    compute_snap_with(raw, last_point, other_points, &settings)
}

/// Snap a raw cursor position
pub fn compute_snap_with(
    raw: Point2D,
    last_point: Option<Point2D>,
    other_points: &[Point2D],
    settings: &SnapSettings,
) -> SnapResult {
    let mut result = SnapResult {
        point: raw,
        guides: Vec::new(),
        snapped_x: false,
        snapped_y: false,
        ortho: false,
        angle_deg: 0.0,
        distance: 0.0,
    };
    if !settings.enabled || !raw.is_finite() {
        fill_readout(&mut result, last_point);
        return result;
    }

    // 1. Alignment
    let threshold = settings.align_threshold;
    if let Some(p) = nearest_on_axis(other_points, |p| (raw.x - p.x).abs(), threshold) {
        result.point.x = p.x;
        result.snapped_x = true;
        result.guides.push(SnapGuide {
            kind: GuideKind::AlignVertical,
            origin: p,
            angle_deg: 90.0,
        });
    }
    if let Some(p) = nearest_on_axis(other_points, |p| (raw.y - p.y).abs(), threshold) {
        result.point.y = p.y;
        result.snapped_y = true;
        result.guides.push(SnapGuide {
            kind: GuideKind::AlignHorizontal,
            origin: p,
            angle_deg: 0.0,
        });
    }

    // 2. Ortho relative to the last point
    if let Some(last) = last_point.filter(|p| p.is_finite()) {
        if let Some(locked) = ortho_snap(last, result.point, settings) {
            result.point = locked.0;
            result.ortho = true;
            result.guides.push(SnapGuide {
                kind: GuideKind::AngleLock,
                origin: last,
                angle_deg: locked.1,
            });
            drop_stale_alignment(&mut result);
        }
    }

    fill_readout(&mut result, last_point);
    result
}

/// Candidate with the smallest delta under `threshold`; first wins on ties
fn nearest_on_axis<F>(points: &[Point2D], delta: F, threshold: f64) -> Option<Point2D>
where
    F: Fn(&Point2D) -> f64,
{
    let mut best: Option<(f64, Point2D)> = None;
    for p in points.iter().filter(|p| p.is_finite()) {
        let d = delta(p);
        if d < threshold && best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, *p));
        }
    }
    best.map(|(_, p)| p)
}

/// Snap the direction last -> cursor; returns the new point and the locked angle
fn ortho_snap(last: Point2D, cursor: Point2D, settings: &SnapSettings) -> Option<(Point2D, f64)> {
    let d = vector(last, cursor);
    let distance = d.hypot();
    if distance < EPSILON {
        return None;
    }

    let angle = normalize_degrees(d.y.atan2(d.x).to_degrees());
    let nearest = (angle / ORTHO_STEP_DEG).round() * ORTHO_STEP_DEG;
    let off_by = (angle - nearest).abs();
    if !settings.hard_lock && off_by > settings.angle_tolerance_deg {
        return None;
    }

    let locked = normalize_degrees(nearest);
    let (sin, cos) = locked.to_radians().sin_cos();
    let point = Point2D::new(last.x + distance * cos, last.y + distance * sin);
    Some((point, locked))
}

/// Ortho may move the point off an aligned axis; such guides are removed
fn drop_stale_alignment(result: &mut SnapResult) {
    let point = result.point;
    result.guides.retain(|g| match g.kind {
        GuideKind::AlignVertical => (g.origin.x - point.x).abs() < 1e-9,
        GuideKind::AlignHorizontal => (g.origin.y - point.y).abs() < 1e-9,
        GuideKind::AngleLock => true,
    });
    result.snapped_x = result.guides.iter().any(|g| g.kind == GuideKind::AlignVertical);
    result.snapped_y = result.guides.iter().any(|g| g.kind == GuideKind::AlignHorizontal);
}

fn fill_readout(result: &mut SnapResult, last_point: Option<Point2D>) {
    if let Some(last) = last_point {
        let d = vector(last, result.point);
        result.distance = d.hypot();
        result.angle_deg = if result.distance < EPSILON {
            0.0
        } else {
            normalize_degrees(d.y.atan2(d.x).to_degrees())
        };
    }
}
