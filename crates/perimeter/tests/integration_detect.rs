//! Integration tests for the vector path.
//!
//! Tests end-to-end: raw segments -> unit heuristic -> loop detector -> area.

mod common;

use perimeter_lib::detect::{detect_outer_polygon, detect_outer_polygon_with, find_loops, DetectSettings};
use perimeter_lib::fixtures::*;
use perimeter_lib::geometry::polygon_area;
use perimeter_lib::units::{normalize_segments_to_mm, DEFAULT_METERS_SPAN_THRESHOLD};
use shared::{Point2D, RawSegment, Units};

/// Deterministic permutation with every segment direction flipped
fn scrambled(segments: &[RawSegment]) -> Vec<RawSegment> {
    let n = segments.len();
    let mut order: Vec<usize> = (0..n).collect();
    // stride coprime with n visits every index once
    let stride = (1..=n).rev().find(|s| gcd(*s, n) == 1 && *s > 1).unwrap_or(1);
    for (k, slot) in order.iter_mut().enumerate() {
        *slot = (k * stride + 2) % n;
    }
    order
        .into_iter()
        .map(|i| RawSegment {
            start: segments[i].end,
            end: segments[i].start,
        })
        .collect()
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[test]
fn test_single_polygon_any_order() {
    common::init_tracing();
    let shapes = vec![
        rectangle_points(12000.0, 8000.0),
        l_shape_points(20000.0, 15000.0, 8000.0, 5000.0),
        vec![Point2D::new(0.0, 0.0), Point2D::new(9000.0, 0.0), Point2D::new(3000.0, 7000.0)],
    ];

    for truth in shapes {
        let expected = polygon_area(&truth);
        for segments in [ring_segments(&truth), scrambled(&ring_segments(&truth))] {
            let found = detect_outer_polygon(&segments).expect("loop");
            assert_eq!(found.points.len(), truth.len());
            assert!((found.area - expected).abs() < 1e-6 * expected);
        }
    }
}

#[test]
fn test_larger_of_two_disjoint_loops() {
    let mut segments = ring_segments(&rectangle_points(3000.0, 3000.0));
    let big: Vec<Point2D> = rectangle_points(10000.0, 6000.0)
        .into_iter()
        .map(|p| Point2D::new(p.x + 50000.0, p.y))
        .collect();
    segments.extend(ring_segments(&big));

    let found = detect_outer_polygon(&segments).unwrap();
    assert!((found.area - 60.0e6).abs() < 1e-3);
    assert!(found.points.iter().all(|p| p.x >= 50000.0));
}

#[test]
fn test_cluttered_plan_finds_outline() {
    let segments = cluttered_floor_plan(15000.0, 10000.0);
    let loops = find_loops(&segments, &DetectSettings::default());
    assert!(loops.len() >= 2);

    let found = detect_outer_polygon(&segments).unwrap();
    assert_eq!(found.points.len(), 4);
    assert!((found.area - 150.0e6).abs() < 1e-3);
}

#[test]
fn test_jittered_corners_merge() {
    let segments = jittered(&rectangle_segments(12000.0, 8000.0), 0.8);
    let found = detect_outer_polygon(&segments).unwrap();
    assert_eq!(found.points.len(), 4);
    assert!((found.area - 96.0e6).abs() / 96.0e6 < 1e-3);
}

#[test]
fn test_gaps_wider_than_tolerance_break_the_loop() {
    let segments = jittered(&rectangle_segments(12000.0, 8000.0), 0.8);
    let strict = DetectSettings::with_tolerance(0.01);
    assert!(detect_outer_polygon_with(&segments, &strict).is_none());
}

#[test]
fn test_deterministic() {
    let segments = cluttered_floor_plan(15000.0, 10000.0);
    let a = detect_outer_polygon(&segments);
    let b = detect_outer_polygon(&segments);
    assert_eq!(a, b);
    assert_eq!(find_loops(&segments, &DetectSettings::default()), find_loops(&segments, &DetectSettings::default()));
}

#[test]
fn test_sparse_inputs_yield_nothing() {
    let one = vec![RawSegment::new(0.0, 0.0, 10.0, 0.0)];
    let two = vec![RawSegment::new(0.0, 0.0, 10.0, 0.0), RawSegment::new(10.0, 0.0, 10.0, 10.0)];
    let zigzag: Vec<RawSegment> = (0..6)
        .map(|i| {
            let x = i as f64 * 10.0;
            RawSegment::new(x, (i % 2) as f64 * 10.0, x + 10.0, ((i + 1) % 2) as f64 * 10.0)
        })
        .collect();

    assert!(detect_outer_polygon(&[]).is_none());
    assert!(detect_outer_polygon(&one).is_none());
    assert!(detect_outer_polygon(&two).is_none());
    assert!(detect_outer_polygon(&zigzag).is_none());
}

#[test]
fn test_meters_drawing_detected_in_mm() {
    common::init_tracing();
    let (segments_mm, guess) =
        normalize_segments_to_mm(&rectangle_segments(12.0, 8.0), DEFAULT_METERS_SPAN_THRESHOLD, None);
    assert_eq!(guess.units, Units::Meters);

    let found = detect_outer_polygon(&segments_mm).unwrap();
    assert!((found.area - 96.0e6).abs() < 1e-3);
}

#[test]
fn test_two_rooms_sharing_a_wall() {
    // two 100 x 100 rooms side by side; the middle wall joins degree-3 nodes
    let segments = vec![
        RawSegment::new(0.0, 0.0, 100.0, 0.0),
        RawSegment::new(100.0, 0.0, 200.0, 0.0),
        RawSegment::new(200.0, 0.0, 200.0, 100.0),
        RawSegment::new(200.0, 100.0, 100.0, 100.0),
        RawSegment::new(100.0, 100.0, 0.0, 100.0),
        RawSegment::new(0.0, 100.0, 0.0, 0.0),
        RawSegment::new(100.0, 0.0, 100.0, 100.0),
    ];

    let found = detect_outer_polygon(&segments).unwrap();
    assert_eq!(found.points.len(), 6);
    assert!((found.area - 20000.0).abs() < 1e-9);
    assert!(found.points.contains(&Point2D::new(200.0, 100.0)));
    assert!(found.points.contains(&Point2D::new(0.0, 100.0)));
}
