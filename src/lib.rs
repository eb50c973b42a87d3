//! Nestland Command Center - business processes as swimlane graphs
//!
//! A process is a set of steps placed in lanes and connected by transitions.
//! Visitors leave comments on a process or a single step; the admin resolves
//! them.
//!
//! # Overview
//!
//! Rows live in SQLite ([`Database`]). The graph builder turns the rows of one
//! process into positioned, styled nodes and edges:
//!
//! | Input | Becomes |
//! |-------|---------|
//! | step | node at `(lane_index * 260, order_index * 140)` |
//! | step role | fill, border and text color |
//! | open comment on a step | red border overlay |
//! | selected step | blue border overlay |
//! | transition | edge |
//!
//! Lanes are columns numbered in the order they are first seen. Blank roles and
//! lanes fall into `Unassigned`.
//!
//! # Quick Start
//!
//! ```no_run
//! use nestland::{build_graph, Database, NewProcess, NewStep};
//!
//! let db = Database::open_at("nestland.db").unwrap();
//! db.create_process(&NewProcess { name: "Client Onboarding", ..Default::default() }).unwrap();
//!
//! let a = db.create_step("client-onboarding", &NewStep {
//!     title: "Intake call",
//!     lane: Some("Client"),
//!     order_index: Some(0),
//!     ..Default::default()
//! }).unwrap();
//! let b = db.create_step("client-onboarding", &NewStep {
//!     title: "Contract review",
//!     lane: Some("Legal"),
//!     order_index: Some(1),
//!     ..Default::default()
//! }).unwrap();
//! db.create_transition("client-onboarding", &a.id, &b.id, None).unwrap();
//!
//! let s = db.snapshot("client-onboarding").unwrap();
//! let graph = build_graph(&s.steps, &s.transitions, &s.comments, Some(a.id.as_str()));
//! println!("Nodes: {}, Edges: {}", graph.nodes.len(), graph.edges.len());
//! ```

pub mod config;
pub mod db;
pub mod export;
pub mod filters;
pub mod graph;
pub mod init;
pub mod layout;
pub mod loader;
pub mod notify;
pub mod schema;
pub mod selection;
pub mod serve;
pub mod style;
pub mod sync;
pub mod validate;

pub use config::{Config, ConfigError};
pub use db::{
    Comment, CommentStatus, Database, DbError, NewProcess, NewStep, Process, ProcessChanges,
    ProcessSnapshot, ProcessStore, Step, StepChanges, Transition, CURRENT_SCHEMA,
};
pub use export::{graph_to_dot, process_summary_markdown, DotConfig};
pub use graph::{build_graph, GraphEdge, GraphNode, ProcessGraph};
pub use layout::{position, Position, LANE_GAP, ROW_GAP};
pub use loader::{GraphLoader, LoadOutcome, LoadedGraph};
pub use notify::{CommentNotifier, LogNotifier};
pub use selection::Selection;
pub use style::{node_style, role_style, NodeStyle, Overlay, RoleStyle};
pub use sync::{sync_databases, SyncError, SyncReport};
pub use validate::{validate_graph, GraphIssue};
