//! Export utilities for process graphs
//!
//! Provides DOT export with layout coordinates and a Markdown process summary.

use crate::db::ProcessSnapshot;
use crate::filters::{steps_by_lane, visible_comments};
use crate::graph::ProcessGraph;
use std::fmt::{self, Write};

/// Configuration for DOT export
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Title for the graph
    pub title: Option<String>,
    /// Include step ids in labels
    pub show_ids: bool,
    /// Wrap each lane in a cluster
    pub show_lanes: bool,
    /// Pin nodes to their layout coordinates (for `neato -n`)
    pub pin_positions: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            title: None,
            show_ids: false,
            show_lanes: true,
            pin_positions: true,
        }
    }
}

/// Escape a string for DOT labels
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Truncate a string to max characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn write_dot(dot: &mut String, graph: &ProcessGraph, config: &DotConfig) -> fmt::Result {
    writeln!(dot, "digraph ProcessGraph {{")?;
    writeln!(dot, "  rankdir=TB;")?;
    writeln!(dot, "  node [fontname=\"Arial\" fontsize=10 shape=box style=\"rounded,filled\"];")?;
    writeln!(dot, "  edge [fontname=\"Arial\" fontsize=9];")?;

    if let Some(title) = &config.title {
        writeln!(dot, "  label=\"{}\";", escape_dot(title))?;
        writeln!(dot, "  labelloc=t;")?;
        writeln!(dot, "  fontsize=14;")?;
    }
    writeln!(dot)?;

    for node in &graph.nodes {
        let mut label = String::new();
        if config.show_ids {
            write!(label, "[{}] ", node.id)?;
        }
        label.push_str(&truncate(&node.label, 40));
        write!(label, "\n{}", node.role)?;
        if node.open_comments > 0 {
            write!(label, " ({} open)", node.open_comments)?;
        }

        let mut attrs = vec![
            format!("label=\"{}\"", escape_dot(&label)),
            format!("fillcolor=\"{}\"", node.style.fill),
            format!("color=\"{}\"", node.style.border),
            format!("fontcolor=\"{}\"", node.style.text),
            format!("penwidth={}", node.style.border_width),
        ];
        if config.pin_positions {
            // DOT's y axis points up; `0.0 - y` avoids printing -0
            attrs.push(format!("pos=\"{},{}!\"", node.position.x, 0.0 - node.position.y));
        }

        writeln!(dot, "  \"{}\" [{}];", escape_dot(&node.id), attrs.join(" "))?;
    }

    if config.show_lanes {
        for (index, lane) in graph.lanes.iter().enumerate() {
            writeln!(dot)?;
            writeln!(dot, "  subgraph \"cluster_{}\" {{", index)?;
            writeln!(dot, "    label=\"{}\";", escape_dot(lane))?;
            writeln!(dot, "    style=dashed; color=\"#CBD5E1\";")?;
            for node in graph.nodes.iter().filter(|n| n.lane_index == index) {
                writeln!(dot, "    \"{}\";", escape_dot(&node.id))?;
            }
            writeln!(dot, "  }}")?;
        }
    }

    writeln!(dot)?;

    for edge in &graph.edges {
        let mut attrs = vec![format!("id=\"{}\"", escape_dot(&edge.id))];
        if let Some(label) = &edge.label {
            attrs.push(format!("label=\"{}\"", escape_dot(&truncate(label, 30))));
        }
        writeln!(
            dot,
            "  \"{}\" -> \"{}\" [{}];",
            escape_dot(&edge.source),
            escape_dot(&edge.target),
            attrs.join(" ")
        )?;
    }

    writeln!(dot, "}}")
}

/// Convert a process graph to DOT format
pub fn graph_to_dot(graph: &ProcessGraph, config: &DotConfig) -> String {
    let mut dot = String::new();
    // writing into a String cannot fail
    let _ = write_dot(&mut dot, graph, config);
    dot
}

fn write_summary(out: &mut String, snapshot: &ProcessSnapshot, graph: &ProcessGraph) -> fmt::Result {
    let process = &snapshot.process;
    writeln!(out, "# {}\n", process.name)?;
    if let Some(category) = &process.category {
        writeln!(out, "**Category:** {}\n", category)?;
    }
    if let Some(description) = &process.description {
        writeln!(out, "{}\n", description)?;
    }

    writeln!(out, "## Lanes\n")?;
    if snapshot.steps.is_empty() {
        writeln!(out, "_No steps yet._\n")?;
    }
    for group in steps_by_lane(&snapshot.steps) {
        writeln!(out, "### {}\n", group.name)?;
        let mut steps = group.steps;
        steps.sort_by_key(|s| s.order_index.unwrap_or(0));
        for step in steps {
            let open = graph.node(&step.id).map(|n| n.open_comments).unwrap_or(0);
            let role = step.role.as_deref().unwrap_or(crate::style::UNASSIGNED);
            write!(out, "{}. **{}** ({})", step.order_index.unwrap_or(0), step.title, role)?;
            if open > 0 {
                write!(out, " - {} open comment(s)", open)?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }

    if !snapshot.transitions.is_empty() {
        writeln!(out, "## Transitions\n")?;
        for t in &snapshot.transitions {
            let title = |id: &str| {
                snapshot
                    .steps
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| s.title.clone())
                    .unwrap_or_else(|| id.to_string())
            };
            write!(out, "- {} -> {}", title(&t.from_step_id), title(&t.to_step_id))?;
            if let Some(label) = &t.label {
                write!(out, " _{}_", label)?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }

    let open: Vec<_> = visible_comments(&snapshot.comments, None)
        .into_iter()
        .filter(|c| c.is_open())
        .collect();
    if !open.is_empty() {
        writeln!(out, "## Open comments\n")?;
        for c in open {
            let scope = c
                .step_id
                .as_deref()
                .and_then(|id| snapshot.steps.iter().find(|s| s.id == id))
                .map(|s| s.title.as_str())
                .unwrap_or("process");
            writeln!(out, "- [{}] {}", scope, c.body)?;
        }
    }

    Ok(())
}

/// Markdown summary of a process: lanes, transitions, open comments
pub fn process_summary_markdown(snapshot: &ProcessSnapshot, graph: &ProcessGraph) -> String {
    let mut out = String::new();
    let _ = write_summary(&mut out, snapshot, graph);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Process;
    use crate::graph::build_graph;
    use crate::graph::fixtures::{comment, step, transition};

    fn sample() -> (ProcessSnapshot, ProcessGraph) {
        let steps = vec![
            step("a", Some("Client"), Some("Client"), Some(0)),
            step("b", Some("OPS"), Some("OPS"), Some(1)),
            step("c", None, Some("OPS"), Some(2)),
        ];
        let mut t1 = transition("t1", "a", "b");
        t1.label = Some("signed \"contract\"".to_string());
        let transitions = vec![t1, transition("t2", "b", "c")];
        let comments = vec![comment("c1", Some("b"), "open"), comment("c2", None, "resolved")];
        let graph = build_graph(&steps, &transitions, &comments, None);
        let snapshot = ProcessSnapshot {
            process: Process {
                id: "proc".to_string(),
                slug: "onboarding".to_string(),
                name: "Client Onboarding".to_string(),
                description: Some("From first call to kickoff".to_string()),
                category: Some("Sales".to_string()),
                created_at: String::new(),
                updated_at: String::new(),
            },
            steps,
            transitions,
            comments,
        };
        (snapshot, graph)
    }

    #[test]
    fn test_graph_to_dot() {
        let (_, graph) = sample();
        let dot = graph_to_dot(&graph, &DotConfig::default());

        assert!(dot.starts_with("digraph ProcessGraph {"));
        assert!(dot.contains("\"a\" -> \"b\""));
        assert!(dot.contains("label=\"signed \\\"contract\\\"\""));
        assert!(dot.contains("pos=\"260,-140!\""));
        assert!(dot.contains("pos=\"0,0!\""));
        assert!(dot.contains("subgraph \"cluster_1\""));
        assert!(dot.contains("label=\"OPS\";"));
        // open comment overlay
        assert!(dot.contains("color=\"#DC2626\""));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_without_lanes_or_positions() {
        let (_, graph) = sample();
        let config = DotConfig {
            title: Some("Onboarding".to_string()),
            show_ids: true,
            show_lanes: false,
            pin_positions: false,
        };
        let dot = graph_to_dot(&graph, &config);
        assert!(!dot.contains("subgraph"));
        assert!(!dot.contains("pos="));
        assert!(dot.contains("label=\"Onboarding\";"));
        assert!(dot.contains("[a] Step a"));
    }

    #[test]
    fn test_empty_graph_dot() {
        let dot = graph_to_dot(&ProcessGraph::default(), &DotConfig::default());
        assert!(dot.contains("digraph ProcessGraph"));
        assert!(!dot.contains("->"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long step title", 10), "a very ...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_process_summary() {
        let (snapshot, graph) = sample();
        let md = process_summary_markdown(&snapshot, &graph);

        assert!(md.starts_with("# Client Onboarding"));
        assert!(md.contains("**Category:** Sales"));
        assert!(md.contains("### Client"));
        assert!(md.contains("1. **Step b** (OPS) - 1 open comment(s)"));
        assert!(md.contains("2. **Step c** (Unassigned)"));
        assert!(md.contains("- Step a -> Step b _signed \"contract\"_"));
        assert!(md.contains("## Open comments"));
        assert!(md.contains("- [Step b] comment c1"));
        assert!(!md.contains("comment c2"));
    }
}
