//! Perimeter model: the building outline being traced or edited.
//!
//! Single owner, single writer. Points are identified by their position in
//! the sequence. Segments are derived: segment `i` runs from point `i` to
//! point `i + 1`, and when the outline is closed the last segment runs from
//! the last point back to the first.

use std::fmt;

use shared::{DimensionHint, Point2D};

use crate::geometry::{perimeter_length, polygon_area, vector};

/// Maximum number of snapshots kept for undo
const MAX_HISTORY: usize = 100;

/// Handle returned by [`PerimeterModel::subscribe`]
pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(u64)>;

/// Derived view of one edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub start: Point2D,
    pub end: Point2D,
    /// Measured length in working units
    pub length: f64,
    /// User-entered length, takes precedence over `length`
    pub manual_length: Option<f64>,
    /// Externally suggested length, shown as a default only
    pub hint: Option<f64>,
}

impl Segment {
    /// Manual override if present, otherwise the measured length
    pub fn effective_length(&self) -> f64 {
        self.manual_length.unwrap_or(self.length)
    }

    pub fn is_manual(&self) -> bool {
        self.manual_length.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    points: Vec<Point2D>,
    closed: bool,
    overrides: Vec<Option<f64>>,
    hints: Vec<Option<f64>>,
}

/// Ordered outline points plus open/closed state, manual overrides and history.
///
/// `overrides` and `hints` always have one slot per point; slot `i` belongs
/// to segment `i`. While the outline is open the last slot (the would-be
/// closing segment) stays empty.
pub struct PerimeterModel {
    points: Vec<Point2D>,
    closed: bool,
    overrides: Vec<Option<f64>>,
    hints: Vec<Option<f64>>,
    tolerance: f64,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// Monotonically increasing version, bumped once per successful mutation
    version: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl Default for PerimeterModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PerimeterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerimeterModel")
            .field("points", &self.points)
            .field("closed", &self.closed)
            .field("overrides", &self.overrides)
            .field("version", &self.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PerimeterModel {
    /// Empty open model with the default coincidence tolerance
    pub fn new() -> Self {
        Self::with_tolerance(1e-6)
    }

    /// Empty open model; points closer than `tolerance` count as coincident
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            points: Vec::new(),
            closed: false,
            overrides: Vec::new(),
            hints: Vec::new(),
            tolerance: tolerance.abs(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            version: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn last_point(&self) -> Option<Point2D> {
        self.points.last().copied()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Current version (increments on every successful mutation)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// `points` when closed, `points - 1` when open
    pub fn segment_count(&self) -> usize {
        if self.closed {
            self.points.len()
        } else {
            self.points.len().saturating_sub(1)
        }
    }

    pub fn segment(&self, index: usize) -> Option<Segment> {
        if index >= self.segment_count() {
            return None;
        }
        let start = self.points[index];
        let end = self.points[(index + 1) % self.points.len()];
        Some(Segment {
            index,
            start,
            end,
            length: start.distance(end),
            manual_length: self.overrides[index],
            hint: self.hints[index],
        })
    }

    pub fn segments(&self) -> Vec<Segment> {
        (0..self.segment_count()).filter_map(|i| self.segment(i)).collect()
    }

    /// Enclosed area in square working units (0 while open)
    pub fn area(&self) -> f64 {
        if self.closed {
            polygon_area(&self.points)
        } else {
            0.0
        }
    }

    /// Sum of measured segment lengths
    pub fn perimeter(&self) -> f64 {
        perimeter_length(&self.points, self.closed)
    }

    // ── Change notification ───────────────────────────────────

    /// Register a callback fired once per successful mutation with the new version
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(u64) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback; false if the id is unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify_changed(&mut self) {
        self.version += 1;
        let version = self.version;
        for (_, listener) in self.listeners.iter_mut() {
            listener(version);
        }
    }

    // ── History ───────────────────────────────────────────────

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            points: self.points.clone(),
            closed: self.closed,
            overrides: self.overrides.clone(),
            hints: self.hints.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.points = snapshot.points;
        self.closed = snapshot.closed;
        self.overrides = snapshot.overrides;
        self.hints = snapshot.hints;
    }

    fn save_undo(&mut self) {
        self.undo_stack.push(self.snapshot());
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Revert the last edit of any kind
    pub fn undo_edit(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(self.snapshot());
        self.restore(prev);
        self.notify_changed();
        true
    }

    /// Re-apply the last undone edit
    pub fn redo_edit(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(self.snapshot());
        self.restore(next);
        self.notify_changed();
        true
    }

    // ── Point editing ─────────────────────────────────────────

    fn coincide(&self, a: Point2D, b: Point2D) -> bool {
        a.distance(b) <= self.tolerance
    }

    /// Append a point. Only while open; rejects a point on top of the last one.
    pub fn add_point(&mut self, x: f64, y: f64) -> bool {
        let p = Point2D::new(x, y);
        if self.closed || !p.is_finite() {
            return false;
        }
        if let Some(last) = self.last_point() {
            if self.coincide(last, p) {
                tracing::debug!("add_point rejected: ({x}, {y}) coincides with the last point");
                return false;
            }
        }

        self.save_undo();
        self.points.push(p);
        self.overrides.push(None);
        self.hints.push(None);
        self.notify_changed();
        true
    }

    /// Reposition a point. Overrides on the incident segments no longer hold
    /// and are cleared; every other segment keeps its override.
    pub fn move_point(&mut self, index: usize, x: f64, y: f64) -> bool {
        let p = Point2D::new(x, y);
        if index >= self.points.len() || !p.is_finite() {
            return false;
        }
        if self.points[index] == p {
            return false;
        }

        let incident = self.incident_segments(index);
        for &seg in &incident {
            let other = if seg == index {
                self.points[(seg + 1) % self.points.len()]
            } else {
                self.points[seg]
            };
            if self.coincide(other, p) {
                tracing::debug!("move_point rejected: would create a zero-length segment {seg}");
                return false;
            }
        }

        self.save_undo();
        self.points[index] = p;
        for seg in incident {
            self.overrides[seg] = None;
        }
        self.notify_changed();
        true
    }

    /// Segments touching point `index`: the one ending there and the one starting there
    fn incident_segments(&self, index: usize) -> Vec<usize> {
        let n = self.points.len();
        let mut result = Vec::with_capacity(2);
        if index > 0 {
            result.push(index - 1);
        } else if self.closed {
            result.push(n - 1);
        }
        if index < self.segment_count() {
            result.push(index);
        }
        result
    }

    /// Undo for tracing: reopen a closed outline, or drop the last point
    pub fn remove_last_point(&mut self) -> bool {
        if self.closed {
            self.save_undo();
            self.closed = false;
            self.clear_closing_slot();
            self.notify_changed();
            return true;
        }
        if self.points.is_empty() {
            return false;
        }

        self.save_undo();
        self.points.pop();
        self.overrides.pop();
        self.hints.pop();
        self.clear_closing_slot();
        self.notify_changed();
        true
    }

    fn clear_closing_slot(&mut self) {
        if let Some(slot) = self.overrides.last_mut() {
            *slot = None;
        }
        if let Some(slot) = self.hints.last_mut() {
            *slot = None;
        }
    }

    /// Close the outline. Needs at least 3 distinct points. A last point
    /// placed on top of the first one is dropped before closing.
    pub fn close_polygon(&mut self) -> bool {
        if self.closed || self.points.len() < 3 {
            return false;
        }
        let n = self.points.len();
        let duplicate_end = self.coincide(self.points[n - 1], self.points[0]);
        if duplicate_end && n < 4 {
            return false;
        }

        self.save_undo();
        if duplicate_end {
            self.points.pop();
            self.overrides.pop();
            self.hints.pop();
        }
        self.closed = true;
        self.notify_changed();
        true
    }

    // ── Manual lengths ────────────────────────────────────────

    /// Set an exact length for segment `index` and re-chain the outline.
    ///
    /// The segment's end point moves along the current direction. The points
    /// after it move by the same offset, so those segments keep length and
    /// direction. In a closed outline the shift stops at the nearest
    /// preceding segment without a manual length, which absorbs the change.
    pub fn update_segment_length(&mut self, index: usize, new_length: f64) -> bool {
        if index >= self.segment_count() || !new_length.is_finite() || new_length <= 0.0 {
            return false;
        }

        let n = self.points.len();
        let start = self.points[index];
        let end_idx = (index + 1) % n;
        let end = self.points[end_idx];

        let d = vector(start, end);
        let len = d.hypot();
        if !len.is_finite() || len <= self.tolerance {
            tracing::debug!("update_segment_length rejected: segment {index} has no direction");
            return false;
        }

        let dir = d / len;
        let delta = dir * new_length - d;

        let mut moved = self.points.clone();
        if self.closed {
            let Some(absorber) = self.absorbing_segment(index) else {
                tracing::debug!("update_segment_length rejected: every other segment is fixed");
                return false;
            };
            let mut j = end_idx;
            loop {
                moved[j] = Point2D::new(moved[j].x + delta.x, moved[j].y + delta.y);
                if j == absorber {
                    break;
                }
                j = (j + 1) % n;
            }
        } else {
            for p in moved.iter_mut().skip(end_idx) {
                *p = Point2D::new(p.x + delta.x, p.y + delta.y);
            }
        }

        if !self.is_valid_outline(&moved) {
            tracing::debug!("update_segment_length rejected: result would be degenerate");
            return false;
        }

        self.save_undo();
        self.points = moved;
        self.overrides[index] = Some(new_length);
        self.notify_changed();
        true
    }

    /// Nearest segment before `index` (walking backwards) without a manual length
    fn absorbing_segment(&self, index: usize) -> Option<usize> {
        let n = self.points.len();
        (1..n)
            .map(|step| (index + n - step) % n)
            .find(|&k| self.overrides[k].is_none())
    }

    fn is_valid_outline(&self, points: &[Point2D]) -> bool {
        if points.iter().any(|p| !p.is_finite()) {
            return false;
        }
        let n = points.len();
        let count = if self.closed { n } else { n.saturating_sub(1) };
        (0..count).all(|i| !self.coincide(points[i], points[(i + 1) % n]))
    }

    /// Drop the manual length of a segment
    pub fn clear_segment_override(&mut self, index: usize) -> bool {
        if index >= self.segment_count() || self.overrides[index].is_none() {
            return false;
        }
        self.save_undo();
        self.overrides[index] = None;
        self.notify_changed();
        true
    }

    // ── Dimension hints ───────────────────────────────────────

    /// Store external length suggestions as defaults for segments the user
    /// has not edited. Hints never replace a manual length.
    /// Returns how many hints were stored.
    pub fn apply_dimension_hints(&mut self, hints: &[DimensionHint], mm_per_unit: f64) -> usize {
        if !mm_per_unit.is_finite() || mm_per_unit <= 0.0 {
            return 0;
        }
        let accepted: Vec<(usize, f64)> = hints
            .iter()
            .filter(|h| h.segment_index < self.segment_count())
            .filter(|h| h.length_mm.is_finite() && h.length_mm > 0.0)
            .filter(|h| self.overrides[h.segment_index].is_none())
            .map(|h| (h.segment_index, h.length_mm / mm_per_unit))
            .collect();

        if accepted.is_empty() {
            return 0;
        }
        self.save_undo();
        for &(index, length) in &accepted {
            self.hints[index] = Some(length);
        }
        self.notify_changed();
        accepted.len()
    }

    /// Multiply every stored hint, including those in history, by `factor`.
    /// Used when the working-unit scale changes; not an undoable edit.
    pub fn rescale_hints(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 || factor == 1.0 {
            return;
        }
        let stacks = self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut());
        for hints in std::iter::once(&mut self.hints).chain(stacks.map(|s| &mut s.hints)) {
            for hint in hints.iter_mut().flatten() {
                *hint *= factor;
            }
        }
        if self.hints.iter().any(Option::is_some) {
            self.notify_changed();
        }
    }

    /// Turn the stored hint for a segment into a manual length
    pub fn accept_hint(&mut self, index: usize) -> bool {
        match self.segment(index).and_then(|s| s.hint) {
            Some(length) => self.update_segment_length(index, length),
            None => false,
        }
    }

    // ── Bulk operations ───────────────────────────────────────

    /// Replace everything with `points`, leaving the outline open.
    /// Discards history, overrides and hints.
    pub fn load_from_points(&mut self, points: &[Point2D]) -> bool {
        if !self.is_loadable(points) {
            return false;
        }
        self.replace(points.to_vec(), false);
        self.notify_changed();
        true
    }

    /// Replace everything with `points` and close in one step
    pub fn load_closed(&mut self, points: &[Point2D]) -> bool {
        let mut pts = points.to_vec();
        if pts.len() >= 4 && self.coincide(pts[pts.len() - 1], pts[0]) {
            pts.pop();
        }
        if pts.len() < 3 || !self.is_loadable(&pts) || self.coincide(pts[pts.len() - 1], pts[0]) {
            return false;
        }
        self.replace(pts, true);
        self.notify_changed();
        true
    }

    fn is_loadable(&self, points: &[Point2D]) -> bool {
        points.iter().all(|p| p.is_finite())
            && points.windows(2).all(|w| !self.coincide(w[0], w[1]))
    }

    fn replace(&mut self, points: Vec<Point2D>, closed: bool) {
        let n = points.len();
        self.points = points;
        self.closed = closed;
        self.overrides = vec![None; n];
        self.hints = vec![None; n];
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Reset to an empty open outline
    pub fn clear(&mut self) {
        self.replace(Vec::new(), false);
        self.notify_changed();
    }
}
