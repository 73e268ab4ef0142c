// Perimeter acquisition and reconstruction core.
// Vector path: units -> detect -> state::PerimeterModel. Manual path: snap -> state::PerimeterModel.

pub mod command;
pub mod detect;
pub mod fixtures;
pub mod geometry;
pub mod session;
pub mod snap;
pub mod state;
pub mod units;
pub mod validation;
pub mod walls;

pub use detect::{detect_outer_polygon, detect_outer_polygon_with, find_loops, DetectSettings, DetectedLoop};
pub use geometry::polygon_area;
pub use session::{ImportOutcome, SessionError, TraceSession};
pub use snap::{compute_snap, compute_snap_with, GuideKind, SnapGuide, SnapResult, SnapSettings};
pub use state::{PerimeterModel, Segment, TraceSettings};
pub use units::{guess_file_units, Calibration, Scale, UnitGuess};
pub use walls::{footprint, wall_edges};
