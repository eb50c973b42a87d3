//! Loads a process from the store and builds its graph.
//!
//! Steps and transitions are fetched in parallel, and the graph is built only
//! after both have arrived. Each load takes a ticket; when a newer load has
//! started by the time a result is ready, the older result is discarded
//! instead of applied. Cancellation is cooperative: the superseded fetch
//! still runs to completion.

use crate::db::{Comment, DbError, Process, ProcessStore, Result, Step, Transition};
use crate::graph::{build_graph, ProcessGraph};
use crate::validate::{validate_graph, GraphIssue};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Identifies one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// A built graph together with the rows it came from
#[derive(Debug, Clone, Serialize)]
pub struct LoadedGraph {
    pub process: Process,
    pub graph: ProcessGraph,
    pub issues: Vec<GraphIssue>,
    pub selected_step_id: Option<String>,
}

#[derive(Debug)]
pub enum LoadOutcome {
    Ready(Box<LoadedGraph>),
    /// A newer load started while this one was in flight
    Superseded,
}

/// Hands out tickets and decides which result is current
#[derive(Debug, Default)]
pub struct GraphLoader {
    latest: AtomicU64,
}

impl GraphLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request; every earlier ticket becomes stale
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Fetch `slug` and build its graph with `selected_step_id` highlighted
    pub fn load<S: ProcessStore>(
        &self,
        store: &S,
        slug: &str,
        selected_step_id: Option<&str>,
    ) -> Result<LoadOutcome> {
        let ticket = self.begin();
        self.load_with_ticket(store, ticket, slug, selected_step_id)
    }

    /// Like [`GraphLoader::load`] for a ticket the caller already took
    pub fn load_with_ticket<S: ProcessStore>(
        &self,
        store: &S,
        ticket: LoadTicket,
        slug: &str,
        selected_step_id: Option<&str>,
    ) -> Result<LoadOutcome> {
        let process = store
            .process_by_slug(slug)?
            .ok_or_else(|| DbError::NotFound(format!("Process '{}'", slug)))?;

        let (steps, transitions) = rayon::join(
            || store.steps_for(&process.id),
            || store.transitions_for(&process.id),
        );
        let (steps, transitions) = (steps?, transitions?);
        let comments = store.comments_for(&process.slug)?;

        if !self.is_current(ticket) {
            debug!(process = %slug, ticket = ticket.0, "discarding superseded graph load");
            return Ok(LoadOutcome::Superseded);
        }

        let referenced = store.steps_by_ids(&outside_ids(&steps, &transitions, &comments))?;
        let graph = build_graph(&steps, &transitions, &comments, selected_step_id);
        let issues = validate_graph(&process.id, &steps, &referenced, &transitions, &comments, &graph);
        debug!(
            process = %slug,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            issues = issues.len(),
            "graph built"
        );

        Ok(LoadOutcome::Ready(Box::new(LoadedGraph {
            process,
            graph,
            issues,
            selected_step_id: selected_step_id.map(str::to_string),
        })))
    }
}

/// Step ids that transitions or comments reference but `steps` lacks
fn outside_ids(steps: &[Step], transitions: &[Transition], comments: &[Comment]) -> Vec<String> {
    let known: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
    let mut ids: Vec<String> = Vec::new();
    let referenced = transitions
        .iter()
        .flat_map(|t| [t.from_step_id.as_str(), t.to_step_id.as_str()])
        .chain(comments.iter().filter_map(|c| c.step_id.as_deref()));
    for id in referenced {
        if !known.contains(id) && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}
