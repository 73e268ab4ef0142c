//! JSON command protocol for driving a tracing session.
//!
//! Every command maps onto one session or model operation. Rejected edits
//! come back as `success: false` with a message, never as a panic.

use serde::{Deserialize, Serialize};
use shared::{DimensionHint, Point2D, RawSegment, Units};

use crate::session::TraceSession;
use crate::units::Scale;
use crate::walls::wall_edges;

/// A command the caller can execute against a session.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TraceCommand {
    /// Detect the outline from vector segments
    ImportSegments {
        segments: Vec<RawSegment>,
        /// Confirmed file units; the span heuristic is used when absent
        #[serde(default)]
        units: Option<Units>,
    },
    /// Snap and append a point
    PlacePoint { x: f64, y: f64 },
    /// Snap a cursor position without placing it
    Preview { x: f64, y: f64 },
    MovePoint { index: usize, x: f64, y: f64 },
    RemoveLastPoint,
    ClosePolygon,
    /// Exact length as typed by the user, e.g. "4500" or "4.5 m"
    SetSegmentLength { index: usize, length: String },
    ClearSegmentOverride { index: usize },
    Calibrate { a: Point2D, b: Point2D, distance: String },
    SetScale { scale: Scale },
    ApplyHints { hints: Vec<DimensionHint> },
    AcceptHint { index: usize },
    /// Undo the last edit.
    Undo,
    /// Redo the last undone edit.
    Redo,
    /// Reset the outline.
    Clear,
    /// Inspect the outline: points, segments, area.
    Inspect,
    /// Validate and export the footprint.
    Finalize,
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }

    /// `ok` when the model accepted the edit, otherwise an error naming the command
    fn applied(applied: bool, what: &str) -> Self {
        if applied {
            Self::ok()
        } else {
            Self::err(format!("{what} rejected"))
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> CommandResponse {
    match serde_json::to_value(value) {
        Ok(v) => CommandResponse::ok_with_data(v),
        Err(e) => CommandResponse::err(format!("Serialization failed: {e}")),
    }
}

/// Execute a single command on the session.
pub fn execute_command(session: &mut TraceSession, cmd: TraceCommand) -> CommandResponse {
    match cmd {
        TraceCommand::ImportSegments { segments, units } => {
            let outcome = session.import_segments(&segments, units);
            to_value(&outcome)
        }

        TraceCommand::PlacePoint { x, y } => match session.place_point(Point2D::new(x, y)) {
            Some(snap) => to_value(&snap),
            None => CommandResponse::err("place_point rejected"),
        },

        TraceCommand::Preview { x, y } => to_value(&session.preview(Point2D::new(x, y))),

        TraceCommand::MovePoint { index, x, y } => {
            CommandResponse::applied(session.model.move_point(index, x, y), "move_point")
        }

        TraceCommand::RemoveLastPoint => {
            CommandResponse::applied(session.model.remove_last_point(), "remove_last_point")
        }

        TraceCommand::ClosePolygon => {
            CommandResponse::applied(session.model.close_polygon(), "close_polygon")
        }

        TraceCommand::SetSegmentLength { index, length } => {
            match session.set_segment_length(index, &length) {
                Ok(()) => CommandResponse::ok(),
                Err(e) => CommandResponse::err(e.to_string()),
            }
        }

        TraceCommand::ClearSegmentOverride { index } => CommandResponse::applied(
            session.model.clear_segment_override(index),
            "clear_segment_override",
        ),

        TraceCommand::Calibrate { a, b, distance } => match session.calibrate(a, b, &distance) {
            Ok(calibration) => to_value(&calibration),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        TraceCommand::SetScale { scale } => match session.set_scale(scale) {
            Ok(()) => CommandResponse::ok(),
            Err(e) => CommandResponse::err(e.to_string()),
        },

        TraceCommand::ApplyHints { hints } => {
            let applied = session.apply_hints(&hints);
            CommandResponse::ok_with_data(serde_json::json!({ "applied": applied }))
        }

        TraceCommand::AcceptHint { index } => {
            CommandResponse::applied(session.model.accept_hint(index), "accept_hint")
        }

        TraceCommand::Undo => {
            let success = session.model.undo_edit();
            CommandResponse::ok_with_data(serde_json::json!({ "undone": success }))
        }

        TraceCommand::Redo => {
            let success = session.model.redo_edit();
            CommandResponse::ok_with_data(serde_json::json!({ "redone": success }))
        }

        TraceCommand::Clear => {
            session.model.clear();
            CommandResponse::ok()
        }

        TraceCommand::Inspect => inspect(session),

        TraceCommand::Finalize => match session.finalize() {
            Ok(footprint) => to_value(&footprint),
            Err(e) => CommandResponse::err(e.to_string()),
        },
    }
}

fn inspect(session: &TraceSession) -> CommandResponse {
    let model = &session.model;
    let segments: Vec<serde_json::Value> = model
        .segments()
        .iter()
        .map(|s| {
            serde_json::json!({
                "index": s.index,
                "length": s.length,
                "manual_length": s.manual_length,
                "hint": s.hint,
            })
        })
        .collect();
    let walls = session
        .mm_per_unit()
        .map(|k| wall_edges(model, k))
        .unwrap_or_default();

    CommandResponse::ok_with_data(serde_json::json!({
        "closed": model.is_closed(),
        "point_count": model.point_count(),
        "points": model.points(),
        "segments": segments,
        "area": model.area(),
        "perimeter": model.perimeter(),
        "version": model.version(),
        "scale": session.scale(),
        "walls": walls,
    }))
}

/// Parse and execute a single JSON command string.
pub fn execute_json(session: &mut TraceSession, json: &str) -> Result<CommandResponse, String> {
    let cmd: TraceCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(session, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    session: &mut TraceSession,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<TraceCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(session, cmd))
        .collect())
}
