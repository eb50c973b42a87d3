//! Graph builder: rows in, renderable process graph out.
//!
//! Pure functions only. The caller passes the selection explicitly; the
//! builder never keeps state between calls and never rejects input, so
//! cycles, self-loops and dangling transition endpoints pass straight
//! through. See [`crate::validate`] for an opt-in integrity report.

use crate::db::{Comment, Step, Transition};
use crate::layout::{lane_index, lane_order, position, Position};
use crate::style::{bucket_name, node_style, NodeStyle, Overlay};
use serde::Serialize;
use std::collections::HashMap;

/// A step placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Step id
    pub id: String,
    pub label: String,
    /// Trimmed role, or `Unassigned`
    pub role: String,
    /// Trimmed lane, or `Unassigned`
    pub lane: String,
    pub lane_index: usize,
    pub position: Position,
    pub style: NodeStyle,
    pub overlay: Option<Overlay>,
    pub open_comments: usize,
}

/// One transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    /// Transition id
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

/// Nodes and edges ready for rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Lanes in column order
    pub lanes: Vec<String>,
}

impl ProcessGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Number of open comments per step id
pub fn open_comment_counts(comments: &[Comment]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for comment in comments.iter().filter(|c| c.is_open()) {
        if let Some(step_id) = comment.step_id.as_deref() {
            *counts.entry(step_id).or_default() += 1;
        }
    }
    counts
}

/// Overlay for a step: open comments first, then selection
pub fn overlay_for(step_id: &str, open_comments: usize, selected_step_id: Option<&str>) -> Option<Overlay> {
    if open_comments > 0 {
        Some(Overlay::OpenComment)
    } else if selected_step_id == Some(step_id) {
        Some(Overlay::Selected)
    } else {
        None
    }
}

/// Build the renderable graph.
///
/// Node order follows `steps`, edge order follows `transitions`, and lane
/// columns follow the first-seen order of lane values in `steps`.
pub fn build_graph(
    steps: &[Step],
    transitions: &[Transition],
    comments: &[Comment],
    selected_step_id: Option<&str>,
) -> ProcessGraph {
    let lane_names = lane_order(steps);
    let columns = lane_index(steps);
    let open = open_comment_counts(comments);

    let nodes = steps
        .iter()
        .map(|step| {
            let lane = bucket_name(step.lane.as_deref()).to_string();
            // every lane in `steps` is in the index
            let column = columns.get(&lane).copied().unwrap_or_default();
            let open_comments = open.get(step.id.as_str()).copied().unwrap_or(0);
            let overlay = overlay_for(&step.id, open_comments, selected_step_id);

            GraphNode {
                id: step.id.clone(),
                label: step.title.clone(),
                role: bucket_name(step.role.as_deref()).to_string(),
                lane,
                lane_index: column,
                position: position(step.order_index, column),
                style: node_style(step.role.as_deref(), overlay),
                overlay,
                open_comments,
            }
        })
        .collect();

    let edges = transitions
        .iter()
        .map(|t| GraphEdge {
            id: t.id.clone(),
            source: t.from_step_id.clone(),
            target: t.to_step_id.clone(),
            label: t.label.clone(),
        })
        .collect();

    ProcessGraph {
        nodes,
        edges,
        lanes: lane_names,
    }
}
