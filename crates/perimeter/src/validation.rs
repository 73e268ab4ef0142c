//! Polygon validation utilities.
//!
//! `PolygonValidator` checks a closed outline before it is handed to the
//! scaffold calculator: vertex count, finite coordinates, zero-length edges,
//! self-intersections.

use shared::Point2D;

use crate::geometry::{perimeter_length, segments_intersect, signed_area};

/// Validator for a closed polygon given as a vertex ring
pub struct PolygonValidator<'a> {
    points: &'a [Point2D],
    tolerance: f64,
}

impl<'a> PolygonValidator<'a> {
    /// Create a new validator; edges shorter than `tolerance` are degenerate.
    pub fn new(points: &'a [Point2D], tolerance: f64) -> Self {
        Self { points, tolerance }
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// At least 3 vertices.
    pub fn has_enough_vertices(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn are_coordinates_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite())
    }

    fn edge(&self, i: usize) -> (Point2D, Point2D) {
        let n = self.points.len();
        (self.points[i], self.points[(i + 1) % n])
    }

    /// Indices of edges (including the closing one) shorter than the tolerance.
    pub fn zero_length_edges(&self) -> Vec<usize> {
        if self.points.len() < 2 {
            return Vec::new();
        }
        (0..self.points.len())
            .filter(|&i| {
                let (a, b) = self.edge(i);
                a.distance(b) <= self.tolerance
            })
            .collect()
    }

    /// Pairs of non-adjacent edges that touch or cross.
    pub fn self_intersections(&self) -> Vec<(usize, usize)> {
        let n = self.points.len();
        let mut hits = Vec::new();
        if n < 4 {
            return hits;
        }
        for i in 0..n {
            for j in (i + 2)..n {
                // first and last edge share vertex 0
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (a0, a1) = self.edge(i);
                let (b0, b1) = self.edge(j);
                if segments_intersect(a0, a1, b0, b1) {
                    hits.push((i, j));
                }
            }
        }
        hits
    }

    pub fn is_simple(&self) -> bool {
        self.self_intersections().is_empty()
    }

    /// Counter-clockwise in a y-up frame.
    pub fn is_counter_clockwise(&self) -> bool {
        signed_area(self.points) > 0.0
    }

    /// Area no larger than a strip `tolerance` wide along the perimeter
    pub fn is_degenerate_area(&self) -> bool {
        let band = self.tolerance * perimeter_length(self.points, true);
        signed_area(self.points).abs() <= band
    }

    /// Run all validation checks and return a list of error messages.
    /// An empty list means the polygon is valid.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.has_enough_vertices() {
            errors.push(format!(
                "Polygon needs at least 3 vertices, got {}",
                self.points.len()
            ));
        }

        if !self.are_coordinates_finite() {
            let bad: Vec<usize> = self
                .points
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_finite())
                .map(|(i, _)| i)
                .collect();
            errors.push(format!("Non-finite coordinates at vertices {:?}", bad));
            return errors;
        }

        let zero = self.zero_length_edges();
        if !zero.is_empty() {
            errors.push(format!("Zero-length edges: {:?}", zero));
        }

        let crossings = self.self_intersections();
        if !crossings.is_empty() {
            errors.push(format!(
                "{} self-intersection(s), first between edges {} and {}",
                crossings.len(),
                crossings[0].0,
                crossings[0].1
            ));
        }

        if self.has_enough_vertices() && self.is_degenerate_area() {
            errors.push("Polygon has zero area".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2D> {
        coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect()
    }

    #[test]
    fn test_valid_rectangle() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]);
        let v = PolygonValidator::new(&p, 1e-6);
        assert!(v.validate_all().is_empty());
        assert!(v.is_counter_clockwise());
        assert!(v.is_simple());
    }

    #[test]
    fn test_bowtie_self_intersects() {
        let p = pts(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        let v = PolygonValidator::new(&p, 1e-6);
        assert_eq!(v.self_intersections(), vec![(0, 2)]);
        assert!(!v.is_simple());
        // the two lobes cancel out in the shoelace sum
        let errors = v.validate_all();
        assert!(errors.iter().any(|e| e.contains("self-intersection")));
        assert!(errors.iter().any(|e| e.contains("zero area")));
    }

    #[test]
    fn test_l_shape_is_simple() {
        let p = pts(&[
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ]);
        assert!(PolygonValidator::new(&p, 1e-6).validate_all().is_empty());
    }

    #[test]
    fn test_too_few_vertices() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let errors = PolygonValidator::new(&p, 1e-6).validate_all();
        assert!(errors.iter().any(|e| e.contains("at least 3")));
    }

    #[test]
    fn test_zero_length_edge() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 0.0), (0.0, 5.0)]);
        let v = PolygonValidator::new(&p, 1e-6);
        assert_eq!(v.zero_length_edges(), vec![1]);
    }

    #[test]
    fn test_non_finite() {
        let p = pts(&[(0.0, 0.0), (f64::NAN, 0.0), (0.0, 5.0)]);
        let errors = PolygonValidator::new(&p, 1e-6).validate_all();
        assert_eq!(errors, vec!["Non-finite coordinates at vertices [1]".to_string()]);
    }

    #[test]
    fn test_collinear_zero_area() {
        let p = pts(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let errors = PolygonValidator::new(&p, 1e-6).validate_all();
        assert!(errors.iter().any(|e| e.contains("zero area")));
    }

    #[test]
    fn test_zero_area_scales_with_size() {
        let sliver = pts(&[(0.0, 0.0), (1000.0, 0.0), (500.0, 1e-7)]);
        let errors = PolygonValidator::new(&sliver, 1e-6).validate_all();
        assert!(errors.iter().any(|e| e.contains("zero area")));

        // 10 x 10 square with a coarse tolerance of 1 is still a real polygon
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(!PolygonValidator::new(&square, 1.0).is_degenerate_area());
        assert!(PolygonValidator::new(&square, 1.0).validate_all().is_empty());
    }
}
