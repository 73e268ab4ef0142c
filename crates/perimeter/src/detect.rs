//! Outer loop detection from a soup of raw line segments.
//!
//! Endpoints are snapped to a tolerance grid to form graph nodes, every
//! segment becomes an undirected edge, and a greedy walk with one-step
//! backtracking collects simple closed loops. The loop with the largest
//! absolute area is the building outline.
//!
//! The graph is an arena: nodes and edges live in `Vec`s and refer to each
//! other by index. Edge usage is tracked per direction ("half-edges") in
//! plain `Vec<bool>` sets that are passed through the walk.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use shared::{Point2D, RawSegment};

use crate::geometry::polygon_area;

pub type NodeId = usize;
pub type EdgeId = usize;

/// Detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectSettings {
    /// Grid size used to merge nearby endpoints into one node
    pub tolerance: f64,
}

impl Default for DetectSettings {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

impl DetectSettings {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    fn effective_tolerance(&self) -> f64 {
        if self.tolerance.is_finite() && self.tolerance > 0.0 {
            self.tolerance
        } else {
            Self::default().tolerance
        }
    }
}

/// A closed loop found by the detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLoop {
    /// Loop vertices in walk order, closing edge implied
    pub points: Vec<Point2D>,
    /// Absolute shoelace area
    pub area: f64,
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub key: (i64, i64),
    /// First raw endpoint seen for this key
    pub p: Point2D,
    pub incident_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
}

/// Undirected segment graph keyed by tolerance-rounded endpoints
#[derive(Debug, Clone, Default)]
pub struct SegmentGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<GraphEdge>,
}

impl SegmentGraph {
    /// Build the graph. Zero-length (after rounding), non-finite and
    /// duplicate segments are dropped. Nodes are numbered in order of first
    /// appearance, which makes every later walk deterministic.
    pub fn build(segments: &[RawSegment], tolerance: f64) -> Self {
        let mut graph = SegmentGraph::default();
        let mut index: HashMap<(i64, i64), NodeId> = HashMap::new();
        let mut seen_pairs: HashSet<(NodeId, NodeId)> = HashSet::new();

        for seg in segments {
            if !seg.start.is_finite() || !seg.end.is_finite() {
                continue;
            }
            let ka = node_key(seg.start, tolerance);
            let kb = node_key(seg.end, tolerance);
            if ka == kb {
                continue;
            }

            let a = graph.node_for(&mut index, ka, seg.start);
            let b = graph.node_for(&mut index, kb, seg.end);
            let pair = if a < b { (a, b) } else { (b, a) };
            if !seen_pairs.insert(pair) {
                continue;
            }

            let id = graph.edges.len();
            graph.edges.push(GraphEdge { id, a, b });
            graph.nodes[a].incident_edges.push(id);
            graph.nodes[b].incident_edges.push(id);
        }

        graph
    }

    fn node_for(
        &mut self,
        index: &mut HashMap<(i64, i64), NodeId>,
        key: (i64, i64),
        p: Point2D,
    ) -> NodeId {
        *index.entry(key).or_insert_with(|| {
            let id = self.nodes.len();
            self.nodes.push(Node {
                id,
                key,
                p,
                incident_edges: Vec::new(),
            });
            id
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.nodes[node].incident_edges.len()
    }

    /// The endpoint of `edge` that is not `node`
    pub fn other(&self, edge: EdgeId, node: NodeId) -> NodeId {
        let e = &self.edges[edge];
        if e.a == node {
            e.b
        } else {
            e.a
        }
    }

    /// Index of the half-edge leaving `from` along `edge`
    fn half(&self, edge: EdgeId, from: NodeId) -> usize {
        if self.edges[edge].a == from {
            edge * 2
        } else {
            edge * 2 + 1
        }
    }

    /// Walk from `start` looking for one simple loop back to it.
    ///
    /// `claimed` holds half-edges of loops already found and is updated when
    /// this walk closes a loop. Half-edges given up while backtracking are
    /// only excluded for the rest of this walk.
    fn walk_from(&self, start: NodeId, claimed: &mut [bool]) -> Option<Vec<NodeId>> {
        let mut exhausted = vec![false; self.edges.len() * 2];
        let mut on_path = vec![false; self.nodes.len()];
        let mut path = vec![start];
        let mut path_edges: Vec<EdgeId> = Vec::new();
        on_path[start] = true;

        while let Some(&current) = path.last() {
            let free = |e: EdgeId| {
                let h = self.half(e, current);
                !claimed[h] && !exhausted[h]
            };
            let incident = &self.nodes[current].incident_edges;

            if let Some((edge, next)) = incident
                .iter()
                .map(|&e| (e, self.other(e, current)))
                .find(|&(e, n)| !on_path[n] && free(e))
            {
                path.push(next);
                path_edges.push(edge);
                on_path[next] = true;
                continue;
            }

            if path.len() >= 3 {
                let closing = incident
                    .iter()
                    .copied()
                    .find(|&e| self.other(e, current) == start && free(e));
                if let Some(edge) = closing {
                    path_edges.push(edge);
                    for &e in &path_edges {
                        claimed[e * 2] = true;
                        claimed[e * 2 + 1] = true;
                    }
                    return Some(path);
                }
            }

            // Dead end: step back and never retry the edge we came along
            if let Some(removed) = path.pop() {
                on_path[removed] = false;
            }
            let Some(edge) = path_edges.pop() else {
                break;
            };
            if let Some(&back) = path.last() {
                exhausted[self.half(edge, back)] = true;
            }
        }

        None
    }
}

fn node_key(p: Point2D, tolerance: f64) -> (i64, i64) {
    ((p.x / tolerance).round() as i64, (p.y / tolerance).round() as i64)
}

// ============================================================================
// Detection
// ============================================================================

/// Find every simple loop reachable by the greedy walk
pub fn find_loops(segments: &[RawSegment], settings: &DetectSettings) -> Vec<DetectedLoop> {
    let graph = SegmentGraph::build(segments, settings.effective_tolerance());
    tracing::debug!(
        "Loop detection: {} segments -> {} nodes, {} edges",
        segments.len(),
        graph.node_count(),
        graph.edge_count()
    );

    if graph.edge_count() < 3 {
        return Vec::new();
    }

    let mut claimed = vec![false; graph.edge_count() * 2];
    let mut consumed = vec![false; graph.node_count()];
    let mut loops = Vec::new();

    for start in 0..graph.node_count() {
        if consumed[start] || graph.degree(start) < 2 {
            continue;
        }
        consumed[start] = true;

        if let Some(cycle) = graph.walk_from(start, &mut claimed) {
            for &n in &cycle {
                consumed[n] = true;
            }
            let points: Vec<Point2D> = cycle.iter().map(|&n| graph.nodes[n].p).collect();
            let area = polygon_area(&points);
            tracing::debug!("Found loop from node {}: {} vertices, area {:.3}", start, points.len(), area);
            loops.push(DetectedLoop { points, area });
        }
    }

    loops
}

/// Detect the outer building polygon with default settings.
///
/// Returns None when no closed loop of at least 3 vertices exists; the
/// caller should fall back to manual tracing.
pub fn detect_outer_polygon(segments: &[RawSegment]) -> Option<DetectedLoop> {
    detect_outer_polygon_with(segments, &DetectSettings::default())
}

/// Detect the outer building polygon: the largest-area loop found
pub fn detect_outer_polygon_with(
    segments: &[RawSegment],
    settings: &DetectSettings,
) -> Option<DetectedLoop> {
    let loops = find_loops(segments, settings);
    let count = loops.len();

    let mut best: Option<DetectedLoop> = None;
    for candidate in loops {
        if best.as_ref().map_or(true, |b| candidate.area > b.area) {
            best = Some(candidate);
        }
    }

    match &best {
        Some(b) => tracing::info!(
            "Detected outer polygon: {} vertices, area {:.3} ({} candidate loops)",
            b.points.len(),
            b.area,
            count
        ),
        None => tracing::info!("No closed loop found in {} segments", segments.len()),
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> RawSegment {
        RawSegment::new(x1, y1, x2, y2)
    }

    fn square_segments(x: f64, y: f64, size: f64) -> Vec<RawSegment> {
        vec![
            seg(x, y, x + size, y),
            seg(x + size, y, x + size, y + size),
            seg(x + size, y + size, x, y + size),
            seg(x, y + size, x, y),
        ]
    }

    // --- Graph construction ---

    #[test]
    fn test_graph_merges_endpoints_within_tolerance() {
        let segs = vec![seg(0.0, 0.0, 100.0, 0.0), seg(100.3, 0.2, 100.0, 50.0)];
        let g = SegmentGraph::build(&segs, 1.0);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.degree(1), 2);
    }

    #[test]
    fn test_graph_drops_zero_length_segments() {
        let segs = vec![seg(5.0, 5.0, 5.2, 5.1), seg(0.0, 0.0, 10.0, 0.0)];
        let g = SegmentGraph::build(&segs, 1.0);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_graph_collapses_duplicate_segments() {
        let segs = vec![seg(0.0, 0.0, 10.0, 0.0), seg(10.0, 0.0, 0.0, 0.0)];
        let g = SegmentGraph::build(&segs, 1.0);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_graph_skips_non_finite() {
        let segs = vec![seg(f64::NAN, 0.0, 10.0, 0.0), seg(0.0, 0.0, 10.0, 0.0)];
        let g = SegmentGraph::build(&segs, 1.0);
        assert_eq!(g.edge_count(), 1);
    }

    // --- Detection ---

    #[test]
    fn test_detect_square() {
        let result = detect_outer_polygon(&square_segments(0.0, 0.0, 100.0)).unwrap();
        assert_eq!(result.points.len(), 4);
        assert!((result.area - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_triangle() {
        let segs = vec![seg(0.0, 0.0, 30.0, 0.0), seg(30.0, 0.0, 0.0, 40.0), seg(0.0, 40.0, 0.0, 0.0)];
        let result = detect_outer_polygon(&segs).unwrap();
        assert_eq!(result.points.len(), 3);
        assert!((result.area - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_ignores_spur() {
        let mut segs = square_segments(0.0, 0.0, 100.0);
        segs.insert(1, seg(100.0, 0.0, 150.0, -20.0));
        let result = detect_outer_polygon(&segs).unwrap();
        assert_eq!(result.points.len(), 4);
        assert!((result.area - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_picks_larger_of_two_loops() {
        let mut segs = square_segments(0.0, 0.0, 10.0);
        segs.extend(square_segments(100.0, 100.0, 50.0));
        let loops = find_loops(&segs, &DetectSettings::default());
        assert_eq!(loops.len(), 2);

        let result = detect_outer_polygon(&segs).unwrap();
        assert!((result.area - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_detect_empty_and_sparse() {
        assert!(detect_outer_polygon(&[]).is_none());
        assert!(detect_outer_polygon(&[seg(0.0, 0.0, 1.0, 1.0)]).is_none());
        assert!(detect_outer_polygon(&[seg(0.0, 0.0, 10.0, 0.0), seg(10.0, 0.0, 10.0, 10.0)]).is_none());
    }

    #[test]
    fn test_detect_open_chain_never_closes() {
        let segs = vec![
            seg(0.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 10.0),
            seg(10.0, 10.0, 0.0, 10.0),
            seg(0.0, 10.0, 0.0, 5.0),
        ];
        assert!(detect_outer_polygon(&segs).is_none());
    }

    #[test]
    fn test_invalid_tolerance_falls_back_to_default() {
        let settings = DetectSettings::with_tolerance(-3.0);
        let result = detect_outer_polygon_with(&square_segments(0.0, 0.0, 20.0), &settings).unwrap();
        assert_eq!(result.points.len(), 4);
    }

    #[test]
    fn test_detect_is_deterministic() {
        let mut segs = square_segments(0.0, 0.0, 40.0);
        segs.push(seg(40.0, 0.0, 80.0, 0.0));
        segs.push(seg(80.0, 0.0, 80.0, 40.0));
        segs.push(seg(80.0, 40.0, 40.0, 40.0));
        let first = detect_outer_polygon(&segs);
        for _ in 0..5 {
            assert_eq!(detect_outer_polygon(&segs), first);
        }
    }
}
