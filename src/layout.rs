//! Layout policy: lanes become columns, order_index becomes rows.
//!
//! Positions depend only on (lane index, order_index). Steps that share both
//! land on the same coordinates; nothing here moves them apart. Use
//! [`find_overlaps`] to report such collisions.

use crate::db::Step;
use crate::graph::ProcessGraph;
use crate::style::bucket_name;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Horizontal distance between lanes
pub const LANE_GAP: f64 = 260.0;

/// Vertical distance between consecutive order indexes
pub const ROW_GAP: f64 = 140.0;

/// Node coordinates in layout units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Coordinates for a step in lane `lane_index`. A missing order_index is row 0.
pub fn position(order_index: Option<i32>, lane_index: usize) -> Position {
    Position {
        x: lane_index as f64 * LANE_GAP,
        y: f64::from(order_index.unwrap_or(0)) * ROW_GAP,
    }
}

/// Distinct lanes in first-seen order (blank lanes become `Unassigned`)
pub fn lane_order(steps: &[Step]) -> Vec<String> {
    let mut lanes: Vec<String> = Vec::new();
    for step in steps {
        let lane = bucket_name(step.lane.as_deref());
        if !lanes.iter().any(|l| l == lane) {
            lanes.push(lane.to_string());
        }
    }
    lanes
}

/// Lane name -> zero-based column index
pub fn lane_index(steps: &[Step]) -> HashMap<String, usize> {
    lane_order(steps)
        .into_iter()
        .enumerate()
        .map(|(i, lane)| (lane, i))
        .collect()
}

/// Groups of node ids that share exact coordinates, in first-seen order.
/// Only groups with two or more nodes are returned.
pub fn find_overlaps(graph: &ProcessGraph) -> Vec<Vec<String>> {
    // f64 isn't Ord; positions are exact multiples of the gaps so bit equality is fine
    let mut by_position: BTreeMap<(u64, u64), usize> = BTreeMap::new();
    let mut groups: Vec<Vec<String>> = Vec::new();

    for node in &graph.nodes {
        let key = (node.position.x.to_bits(), node.position.y.to_bits());
        match by_position.get(&key) {
            Some(&group) => groups[group].push(node.id.clone()),
            None => {
                by_position.insert(key, groups.len());
                groups.push(vec![node.id.clone()]);
            }
        }
    }

    groups.retain(|g| g.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn step(id: &str, lane: Option<&str>, order_index: Option<i32>) -> Step {
        Step {
            id: id.to_string(),
            process_id: "p".to_string(),
            title: id.to_uppercase(),
            role: None,
            lane: lane.map(str::to_string),
            order_index,
            description: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_position_reference_values() {
        assert_eq!(position(Some(3), 2), Position { x: 520.0, y: 420.0 });
        assert_eq!(position(Some(0), 0), Position { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_missing_order_index_is_row_zero() {
        assert_eq!(position(None, 1), Position { x: 260.0, y: 0.0 });
    }

    #[test]
    fn test_negative_order_index_used_as_given() {
        assert_eq!(position(Some(-1), 0).y, -140.0);
    }

    #[test]
    fn test_lane_order_is_first_seen_not_alphabetical() {
        let steps = vec![
            step("a", Some("OPS"), Some(0)),
            step("b", Some("Client"), Some(1)),
            step("c", Some("OPS"), Some(2)),
            step("d", Some("Finance"), Some(3)),
        ];
        assert_eq!(lane_order(&steps), vec!["OPS", "Client", "Finance"]);
    }

    #[test]
    fn test_blank_lanes_share_unassigned() {
        let steps = vec![
            step("a", None, None),
            step("b", Some("  "), None),
            step("c", Some(" OPS "), None),
            step("d", Some("OPS"), None),
        ];
        assert_eq!(lane_order(&steps), vec!["Unassigned", "OPS"]);
        assert_eq!(lane_index(&steps)["OPS"], 1);
    }

    #[test]
    fn test_reordering_steps_reorders_lanes() {
        let a = step("a", Some("Client"), Some(0));
        let b = step("b", Some("OPS"), Some(1));
        assert_eq!(lane_order(&[a.clone(), b.clone()]), vec!["Client", "OPS"]);
        assert_eq!(lane_order(&[b, a]), vec!["OPS", "Client"]);
    }

    proptest! {
        #[test]
        fn prop_position_is_stateless(order in proptest::option::of(-50i32..500), lane in 0usize..40) {
            let first = position(order, lane);
            let second = position(order, lane);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.x, lane as f64 * LANE_GAP);
            prop_assert_eq!(first.y, f64::from(order.unwrap_or(0)) * ROW_GAP);
        }

        #[test]
        fn prop_lane_index_matches_first_occurrence(lanes in proptest::collection::vec("[A-D]", 0..30)) {
            let steps: Vec<Step> = lanes
                .iter()
                .enumerate()
                .map(|(i, l)| step(&i.to_string(), Some(l), Some(i as i32)))
                .collect();
            let index = lane_index(&steps);
            for lane in &lanes {
                let first = lanes.iter().position(|l| l == lane).unwrap();
                let distinct_before = {
                    let mut seen: Vec<&String> = Vec::new();
                    for l in &lanes[..first] {
                        if !seen.contains(&l) {
                            seen.push(l);
                        }
                    }
                    seen.len()
                };
                prop_assert_eq!(index[lane.as_str()], distinct_before);
            }
        }
    }
}
