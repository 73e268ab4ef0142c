//! Wall export for the scaffold calculator

use shared::{Footprint, Point2D, WallEdge};

use crate::geometry::signed_area;
use crate::state::PerimeterModel;

/// Spreadsheet-style label: 0 -> A, 25 -> Z, 26 -> AA, 27 -> AB
pub fn wall_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

/// Segment order for a counter-clockwise walk starting at point 0
fn ccw_segment_order(model: &PerimeterModel) -> Vec<usize> {
    let n = model.segment_count();
    if signed_area(model.points()) < 0.0 {
        (0..n).rev().collect()
    } else {
        (0..n).collect()
    }
}

/// Labelled wall lengths of a closed outline in counter-clockwise order.
/// Empty while the outline is open or `mm_per_unit` is invalid.
pub fn wall_edges(model: &PerimeterModel, mm_per_unit: f64) -> Vec<WallEdge> {
    if !model.is_closed() || !mm_per_unit.is_finite() || mm_per_unit <= 0.0 {
        return Vec::new();
    }
    let segments = model.segments();
    ccw_segment_order(model)
        .into_iter()
        .enumerate()
        .map(|(i, seg)| WallEdge {
            label: wall_label(i),
            length_mm: segments[seg].effective_length() * mm_per_unit,
        })
        .collect()
}

/// Vertices in millimeters, in the same order as [`wall_edges`]
pub fn vertices_mm(model: &PerimeterModel, mm_per_unit: f64) -> Vec<Point2D> {
    let points = model.points();
    let scale = |p: &Point2D| Point2D::new(p.x * mm_per_unit, p.y * mm_per_unit);
    if signed_area(points) < 0.0 && !points.is_empty() {
        // p0, p(n-1), ..., p1
        std::iter::once(&points[0])
            .chain(points[1..].iter().rev())
            .map(scale)
            .collect()
    } else {
        points.iter().map(scale).collect()
    }
}

/// Finalized footprint for collaborators, None while open
pub fn footprint(model: &PerimeterModel, mm_per_unit: f64) -> Option<Footprint> {
    let walls = wall_edges(model, mm_per_unit);
    if walls.is_empty() {
        return None;
    }
    let perimeter_mm = walls.iter().map(|w| w.length_mm).sum();
    Some(Footprint {
        vertices_mm: vertices_mm(model, mm_per_unit),
        walls,
        area_mm2: model.area() * mm_per_unit * mm_per_unit,
        perimeter_mm,
    })
}
