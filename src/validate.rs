//! Opt-in integrity report for a process snapshot.
//!
//! The graph builder accepts anything. This pass lists what looks wrong so
//! the CLI and API can warn: transitions pointing at unknown steps or at steps
//! of another process, comments on foreign steps, and overlapping nodes.

use crate::db::{Comment, Step, Transition};
use crate::graph::ProcessGraph;
use crate::layout::find_overlaps;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphIssue {
    /// Endpoint id matches no step in the snapshot
    DanglingTransition { transition_id: String, step_id: String },
    /// Endpoint belongs to another process
    CrossProcessTransition { transition_id: String, step_id: String },
    /// Comment scoped to a step that isn't part of this process
    OrphanComment { comment_id: String, step_id: String },
    /// Nodes rendered on top of each other
    Overlap { step_ids: Vec<String> },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::DanglingTransition { transition_id, step_id } => {
                write!(f, "transition {} references unknown step {}", transition_id, step_id)
            }
            GraphIssue::CrossProcessTransition { transition_id, step_id } => {
                write!(f, "transition {} references step {} of another process", transition_id, step_id)
            }
            GraphIssue::OrphanComment { comment_id, step_id } => {
                write!(f, "comment {} is attached to unknown step {}", comment_id, step_id)
            }
            GraphIssue::Overlap { step_ids } => {
                write!(f, "steps {} share the same lane and order", step_ids.join(", "))
            }
        }
    }
}

/// Check the rows of `process_id` and the graph built from them.
///
/// `referenced` holds steps outside `steps` that transitions or comments point
/// at; an endpoint found there is reported as cross-process, not dangling.
pub fn validate_graph(
    process_id: &str,
    steps: &[Step],
    referenced: &[Step],
    transitions: &[Transition],
    comments: &[Comment],
    graph: &ProcessGraph,
) -> Vec<GraphIssue> {
    let owners: HashMap<&str, &str> = steps
        .iter()
        .chain(referenced)
        .map(|s| (s.id.as_str(), s.process_id.as_str()))
        .collect();
    let mut issues = Vec::new();

    for t in transitions {
        for endpoint in [&t.from_step_id, &t.to_step_id] {
            match owners.get(endpoint.as_str()) {
                None => issues.push(GraphIssue::DanglingTransition {
                    transition_id: t.id.clone(),
                    step_id: endpoint.clone(),
                }),
                Some(owner) if *owner != process_id || t.process_id != process_id => {
                    issues.push(GraphIssue::CrossProcessTransition {
                        transition_id: t.id.clone(),
                        step_id: endpoint.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    for c in comments {
        if let Some(step_id) = c.step_id.as_deref() {
            if owners.get(step_id) != Some(&process_id) {
                issues.push(GraphIssue::OrphanComment {
                    comment_id: c.id.clone(),
                    step_id: step_id.to_string(),
                });
            }
        }
    }

    issues.extend(
        find_overlaps(graph)
            .into_iter()
            .map(|step_ids| GraphIssue::Overlap { step_ids }),
    );

    issues
}
