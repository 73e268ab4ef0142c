//! Unit and scale resolution.
//!
//! Decides whether raw coordinates are already millimeters, meters or
//! uncalibrated pixels, and turns a two-point calibration into a
//! millimeters-per-unit ratio.

use serde::{Deserialize, Serialize};
use shared::{Point2D, RawSegment, Units};

use crate::geometry::bounding_box;

/// Default span (in file units) below which a drawing is assumed to be in meters
pub const DEFAULT_METERS_SPAN_THRESHOLD: f64 = 100.0;

/// Result of the file-unit heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitGuess {
    /// Guessed source units (Meters or Millimeters)
    pub units: Units,
    /// Larger side of the bounding box of all endpoints
    pub span: f64,
    /// False when the span is close enough to the threshold that the caller
    /// should ask the user to confirm
    pub confident: bool,
}

impl UnitGuess {
    /// Multiplier converting file units to millimeters
    pub fn mm_per_unit(&self) -> f64 {
        self.units.to_mm()
    }
}

/// Guess file units from the bounding-box span of all endpoints.
///
/// Span under `threshold` means the drawing is in meters, otherwise it is
/// already in millimeters. Guesses within a factor of 10 of the threshold
/// are reported as not confident.
pub fn guess_file_units(segments: &[RawSegment], threshold: f64) -> UnitGuess {
    let endpoints = segments
        .iter()
        .flat_map(|s| [s.start, s.end])
        .filter(|p| p.is_finite())
        .collect::<Vec<_>>();

    let span = match bounding_box(&endpoints) {
        Some((min, max)) => (max.x - min.x).max(max.y - min.y),
        None => 0.0,
    };

    let units = if span < threshold {
        Units::Meters
    } else {
        Units::Millimeters
    };
    let confident = span > 0.0 && (span < threshold / 10.0 || span > threshold * 10.0);

    UnitGuess {
        units,
        span,
        confident,
    }
}

/// Scale every coordinate by `mm_per_unit`
pub fn scale_segments(segments: &[RawSegment], mm_per_unit: f64) -> Vec<RawSegment> {
    segments
        .iter()
        .map(|s| RawSegment {
            start: Point2D::new(s.start.x * mm_per_unit, s.start.y * mm_per_unit),
            end: Point2D::new(s.end.x * mm_per_unit, s.end.y * mm_per_unit),
        })
        .collect()
}

/// Convert raw file segments to millimeters using the heuristic guess, or
/// `override_units` when the user confirmed the units explicitly
pub fn normalize_segments_to_mm(
    segments: &[RawSegment],
    threshold: f64,
    override_units: Option<Units>,
) -> (Vec<RawSegment>, UnitGuess) {
    let mut guess = guess_file_units(segments, threshold);
    if let Some(units) = override_units {
        guess.units = units;
        guess.confident = true;
    }
    if !guess.confident {
        tracing::warn!(
            "File units guessed as {:?} from span {:.3}; confirmation recommended",
            guess.units,
            guess.span
        );
    }
    (scale_segments(segments, guess.mm_per_unit()), guess)
}

// ============================================================================
// Calibration
// ============================================================================

/// Two-point calibration: a picked distance on screen and its real length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub a: Point2D,
    pub b: Point2D,
    pub real_distance_mm: f64,
    pub mm_per_unit: f64,
}

impl Calibration {
    /// Build a calibration. None for a non-positive or non-finite distance,
    /// or when the two picked points coincide.
    pub fn from_points(a: Point2D, b: Point2D, real_distance_mm: f64) -> Option<Self> {
        if !real_distance_mm.is_finite() || real_distance_mm <= 0.0 {
            return None;
        }
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        let pixel_distance = a.distance(b);
        if pixel_distance < 1e-9 {
            return None;
        }
        Some(Self {
            a,
            b,
            real_distance_mm,
            mm_per_unit: real_distance_mm / pixel_distance,
        })
    }
}

/// How working coordinates relate to millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scale {
    /// No scale known yet (manual trace before calibration)
    #[default]
    Uncalibrated,
    /// Coordinates are millimeters
    Millimeters,
    /// Exact ratio supplied by the vector parser
    Exact { mm_per_unit: f64 },
    /// Ratio from a user calibration
    Calibrated(Calibration),
}

impl Scale {
    /// Millimeters per working unit, None while uncalibrated.
    /// A ratio that is not finite and positive counts as uncalibrated.
    pub fn mm_per_unit(&self) -> Option<f64> {
        let k = match self {
            Scale::Uncalibrated => return None,
            Scale::Millimeters => 1.0,
            Scale::Exact { mm_per_unit } => *mm_per_unit,
            Scale::Calibrated(c) => c.mm_per_unit,
        };
        (k.is_finite() && k > 0.0).then_some(k)
    }

    pub fn is_calibrated(&self) -> bool {
        self.mm_per_unit().is_some()
    }

    /// Working-unit length to millimeters
    pub fn to_mm(&self, length: f64) -> Option<f64> {
        self.mm_per_unit().map(|k| length * k)
    }

    /// Millimeters to working-unit length
    pub fn from_mm(&self, length_mm: f64) -> Option<f64> {
        self.mm_per_unit().map(|k| length_mm / k)
    }
}

// ============================================================================
// Image space
// ============================================================================

/// Pixel size of a rasterized drawing, for normalized (0..1) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageFrame {
    pub width_px: f64,
    pub height_px: f64,
}

impl ImageFrame {
    pub fn new(width_px: f64, height_px: f64) -> Self {
        Self { width_px, height_px }
    }

    /// Normalized image-fraction point to pixels
    pub fn to_pixels(&self, normalized: Point2D) -> Point2D {
        Point2D::new(normalized.x * self.width_px, normalized.y * self.height_px)
    }

    /// Pixel point to normalized image fraction. None for an empty frame.
    pub fn to_normalized(&self, pixels: Point2D) -> Option<Point2D> {
        if self.width_px <= 0.0 || self.height_px <= 0.0 {
            return None;
        }
        Some(Point2D::new(pixels.x / self.width_px, pixels.y / self.height_px))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: f64, h: f64) -> Vec<RawSegment> {
        vec![
            RawSegment::new(0.0, 0.0, w, 0.0),
            RawSegment::new(w, 0.0, w, h),
            RawSegment::new(w, h, 0.0, h),
            RawSegment::new(0.0, h, 0.0, 0.0),
        ]
    }

    // --- File units ---

    #[test]
    fn test_small_span_is_meters() {
        let guess = guess_file_units(&rect(12.0, 8.0), DEFAULT_METERS_SPAN_THRESHOLD);
        assert_eq!(guess.units, Units::Meters);
        assert!((guess.span - 12.0).abs() < 1e-12);
        assert!(!guess.confident);
    }

    #[test]
    fn test_large_span_is_millimeters() {
        let guess = guess_file_units(&rect(12000.0, 8000.0), DEFAULT_METERS_SPAN_THRESHOLD);
        assert_eq!(guess.units, Units::Millimeters);
        assert!(guess.confident);
    }

    #[test]
    fn test_tiny_span_is_confident_meters() {
        let guess = guess_file_units(&rect(6.0, 4.0), DEFAULT_METERS_SPAN_THRESHOLD);
        assert_eq!(guess.units, Units::Meters);
        assert!(guess.confident);
    }

    #[test]
    fn test_empty_input_not_confident() {
        let guess = guess_file_units(&[], DEFAULT_METERS_SPAN_THRESHOLD);
        assert_eq!(guess.span, 0.0);
        assert!(!guess.confident);
    }

    #[test]
    fn test_normalize_meters_to_mm() {
        let (segs, guess) = normalize_segments_to_mm(&rect(5.0, 3.0), DEFAULT_METERS_SPAN_THRESHOLD, None);
        assert_eq!(guess.units, Units::Meters);
        assert_eq!(segs[1].end, Point2D::new(5000.0, 3000.0));
    }

    #[test]
    fn test_normalize_with_override() {
        let (segs, guess) =
            normalize_segments_to_mm(&rect(50.0, 30.0), DEFAULT_METERS_SPAN_THRESHOLD, Some(Units::Centimeters));
        assert_eq!(guess.units, Units::Centimeters);
        assert!(guess.confident);
        assert_eq!(segs[1].end, Point2D::new(500.0, 300.0));
    }

    // --- Calibration ---

    #[test]
    fn test_calibration_ratio() {
        let c = Calibration::from_points(Point2D::new(10.0, 10.0), Point2D::new(110.0, 10.0), 5000.0).unwrap();
        assert!((c.mm_per_unit - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_calibration_rejects_bad_input() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(100.0, 0.0);
        assert!(Calibration::from_points(a, b, 0.0).is_none());
        assert!(Calibration::from_points(a, b, -10.0).is_none());
        assert!(Calibration::from_points(a, b, f64::NAN).is_none());
        assert!(Calibration::from_points(a, a, 1000.0).is_none());
    }

    // --- Scale ---

    #[test]
    fn test_scale_conversions() {
        assert_eq!(Scale::Uncalibrated.to_mm(10.0), None);
        assert_eq!(Scale::Millimeters.to_mm(10.0), Some(10.0));
        let exact = Scale::Exact { mm_per_unit: 2.5 };
        assert_eq!(exact.to_mm(4.0), Some(10.0));
        assert_eq!(exact.from_mm(10.0), Some(4.0));
    }

    #[test]
    fn test_bad_exact_ratio_is_uncalibrated() {
        for k in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let scale = Scale::Exact { mm_per_unit: k };
            assert!(!scale.is_calibrated());
            assert_eq!(scale.from_mm(100.0), None);
        }
    }

    #[test]
    fn test_scale_serde() {
        let json = serde_json::to_string(&Scale::Exact { mm_per_unit: 2.0 }).unwrap();
        assert!(json.contains(r#""type":"exact""#));
        let back: Scale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Scale::Exact { mm_per_unit: 2.0 });
    }

    // --- Image frame ---

    #[test]
    fn test_image_frame_roundtrip() {
        let frame = ImageFrame::new(2000.0, 1000.0);
        let px = frame.to_pixels(Point2D::new(0.25, 0.5));
        assert_eq!(px, Point2D::new(500.0, 500.0));
        assert_eq!(frame.to_normalized(px), Some(Point2D::new(0.25, 0.5)));
        assert!(ImageFrame::new(0.0, 10.0).to_normalized(px).is_none());
    }
}
