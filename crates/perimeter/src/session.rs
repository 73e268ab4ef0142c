//! Headless tracing session.
//!
//! Owns one perimeter model together with the scale and settings, and wires
//! the two acquisition paths into it: imported vector segments go through
//! the unit heuristic and the loop detector, manual clicks go through the
//! snap engine.

use serde::{Deserialize, Serialize};
use shared::length_input::parse_length;
use shared::{DimensionHint, Footprint, LengthInputError, Point2D, RawSegment, Units};

use crate::detect::detect_outer_polygon_with;
use crate::snap::{compute_snap_with, SnapResult};
use crate::state::{PerimeterModel, TraceSettings};
use crate::units::{normalize_segments_to_mm, Calibration, ImageFrame, Scale, UnitGuess};
use crate::validation::PolygonValidator;
use crate::walls::footprint;

/// Why a session operation did not apply
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// User-entered length could not be parsed
    Length(LengthInputError),
    /// Calibration points coincide
    CoincidentPoints,
    /// Operation needs a known scale
    Uncalibrated,
    /// Scale ratio must be finite and positive
    InvalidScale(f64),
    /// Outline must be closed first
    NotClosed,
    /// Image frame needed for normalized coordinates
    NoImageFrame,
    /// Model refused the edit
    Rejected(String),
    /// Outline failed validation
    Invalid(Vec<String>),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Length(e) => write!(f, "{}", e),
            SessionError::CoincidentPoints => write!(f, "Calibration points coincide"),
            SessionError::Uncalibrated => write!(f, "Scale is not calibrated"),
            SessionError::InvalidScale(k) => write!(f, "Invalid scale: {} mm per unit", k),
            SessionError::NotClosed => write!(f, "Perimeter is not closed"),
            SessionError::NoImageFrame => write!(f, "No image frame set"),
            SessionError::Rejected(msg) => write!(f, "Edit rejected: {}", msg),
            SessionError::Invalid(errors) => write!(f, "Invalid perimeter: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<LengthInputError> for SessionError {
    fn from(e: LengthInputError) -> Self {
        SessionError::Length(e)
    }
}

/// Result of importing vector segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub guess: UnitGuess,
    /// A closed loop was detected and loaded
    pub loop_found: bool,
    pub vertex_count: usize,
    pub area_mm2: f64,
}

/// Tracing session: model + scale + settings
#[derive(Debug)]
pub struct TraceSession {
    pub model: PerimeterModel,
    pub settings: TraceSettings,
    scale: Scale,
    frame: Option<ImageFrame>,
}

impl TraceSession {
    /// Create a new session with default settings.
    pub fn new() -> Self {
        Self::with_settings(TraceSettings::default())
    }

    pub fn with_settings(settings: TraceSettings) -> Self {
        Self {
            model: PerimeterModel::with_tolerance(settings.point_tolerance),
            settings,
            scale: Scale::Uncalibrated,
            frame: None,
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Scale supplied by a vector parser; the ratio must be finite and positive
    pub fn set_scale(&mut self, scale: Scale) -> Result<(), SessionError> {
        let ratio = match scale {
            Scale::Exact { mm_per_unit } => Some(mm_per_unit),
            Scale::Calibrated(c) => Some(c.mm_per_unit),
            Scale::Uncalibrated | Scale::Millimeters => None,
        };
        if let Some(k) = ratio.filter(|_| !scale.is_calibrated()) {
            tracing::warn!("Rejected scale of {} mm per unit", k);
            return Err(SessionError::InvalidScale(k));
        }
        self.change_scale(scale);
        Ok(())
    }

    pub fn mm_per_unit(&self) -> Option<f64> {
        self.scale.mm_per_unit()
    }

    pub fn set_image_frame(&mut self, frame: ImageFrame) {
        self.frame = Some(frame);
    }

    /// Switch scale; stored hints keep their length in millimeters
    fn change_scale(&mut self, scale: Scale) {
        if let (Some(old), Some(new)) = (self.scale.mm_per_unit(), scale.mm_per_unit()) {
            self.model.rescale_hints(old / new);
        }
        self.scale = scale;
    }

    // ── Vector path ───────────────────────────────────────────

    /// Normalize segments to millimeters, detect the outer loop and load it.
    ///
    /// `units` overrides the span heuristic once the user has confirmed the
    /// file units. With no loop the model is left empty for manual tracing.
    pub fn import_segments(&mut self, segments: &[RawSegment], units: Option<Units>) -> ImportOutcome {
        let (segments_mm, guess) =
            normalize_segments_to_mm(segments, self.settings.meters_span_threshold, units);
        let detected = detect_outer_polygon_with(&segments_mm, &self.settings.detect);

        let loaded = match &detected {
            Some(found) => self.model.load_closed(&found.points),
            None => false,
        };
        if loaded {
            self.change_scale(Scale::Millimeters);
        } else {
            self.model.clear();
        }

        let outcome = ImportOutcome {
            guess,
            loop_found: loaded,
            vertex_count: self.model.point_count(),
            area_mm2: if loaded { self.model.area() } else { 0.0 },
        };
        tracing::info!(
            "Imported {} segments as {:?}: loop_found={}, {} vertices",
            segments.len(),
            outcome.guess.units,
            outcome.loop_found,
            outcome.vertex_count
        );
        outcome
    }

    // ── Manual path ───────────────────────────────────────────

    /// Snap a cursor position without placing it
    pub fn preview(&self, raw: Point2D) -> SnapResult {
        compute_snap_with(raw, self.model.last_point(), self.model.points(), &self.settings.snap)
    }

    /// Snap a cursor position and append it; None if the model refused it
    pub fn place_point(&mut self, raw: Point2D) -> Option<SnapResult> {
        let snap = self.preview(raw);
        if self.model.add_point(snap.point.x, snap.point.y) {
            Some(snap)
        } else {
            None
        }
    }

    /// Place a point given as a fraction of the image size
    pub fn place_normalized_point(&mut self, normalized: Point2D) -> Result<SnapResult, SessionError> {
        let frame = self.frame.ok_or(SessionError::NoImageFrame)?;
        self.place_point(frame.to_pixels(normalized))
            .ok_or_else(|| SessionError::Rejected("point coincides with the last point".to_string()))
    }

    /// Two-point calibration from a user-entered real distance
    pub fn calibrate(&mut self, a: Point2D, b: Point2D, distance: &str) -> Result<Calibration, SessionError> {
        let real_mm = parse_length(distance, self.settings.units)?;
        let calibration =
            Calibration::from_points(a, b, real_mm).ok_or(SessionError::CoincidentPoints)?;
        self.change_scale(Scale::Calibrated(calibration));
        tracing::info!("Calibrated: {:.6} mm per unit", calibration.mm_per_unit);
        Ok(calibration)
    }

    // ── Editing ───────────────────────────────────────────────

    /// Set an exact segment length from user input (display units by default)
    pub fn set_segment_length(&mut self, index: usize, input: &str) -> Result<(), SessionError> {
        let length_mm = parse_length(input, self.settings.units)?;
        let length = self.scale.from_mm(length_mm).ok_or(SessionError::Uncalibrated)?;
        if self.model.update_segment_length(index, length) {
            Ok(())
        } else {
            let shown = self.settings.units.format_mm(length_mm, 3);
            tracing::warn!("Segment {} length {} rejected", index, shown);
            Err(SessionError::Rejected(format!("segment {} cannot take length {}", index, shown)))
        }
    }

    /// Pre-fill segment lengths from external hints; returns how many were stored
    pub fn apply_hints(&mut self, hints: &[DimensionHint]) -> usize {
        match self.mm_per_unit() {
            Some(k) => self.model.apply_dimension_hints(hints, k),
            None => 0,
        }
    }

    // ── Output ────────────────────────────────────────────────

    /// Validate the closed outline and export it in millimeters
    pub fn finalize(&self) -> Result<Footprint, SessionError> {
        if !self.model.is_closed() {
            return Err(SessionError::NotClosed);
        }
        let k = self.mm_per_unit().ok_or(SessionError::Uncalibrated)?;

        let errors = PolygonValidator::new(self.model.points(), self.model.tolerance()).validate_all();
        if !errors.is_empty() {
            tracing::warn!("Finalize rejected: {}", errors.join("; "));
            return Err(SessionError::Invalid(errors));
        }

        let result = footprint(&self.model, k).ok_or(SessionError::NotClosed)?;
        tracing::info!(
            "Finalized {} walls, perimeter {}, area {:.3} m²",
            result.walls.len(),
            self.settings.units.format_mm(result.perimeter_mm, 1),
            result.area_m2()
        );
        Ok(result)
    }
}

impl Default for TraceSession {
    fn default() -> Self {
        Self::new()
    }
}
