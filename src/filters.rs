//! Derived views over process rows
//!
//! Pure functions: inputs are borrowed, outputs are new collections, source
//! rows are never mutated. Role and lane comparisons use trimmed values, and
//! blank values fall into the `Unassigned` bucket.

use crate::db::{Comment, Process, Step};
use crate::style::bucket_name;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Steps sharing one role or lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepGroup {
    pub name: String,
    pub steps: Vec<Step>,
}

/// Conjunctive step filter; `None` fields don't constrain
#[derive(Debug, Clone, Copy, Default)]
pub struct StepFilter<'a> {
    pub role: Option<&'a str>,
    pub lane: Option<&'a str>,
}

/// Comments for the selected step, or all comments when nothing is selected
pub fn visible_comments(comments: &[Comment], selected_step_id: Option<&str>) -> Vec<Comment> {
    match selected_step_id {
        Some(id) => comments
            .iter()
            .filter(|c| c.step_id.as_deref() == Some(id))
            .cloned()
            .collect(),
        None => comments.to_vec(),
    }
}

fn group_by<'a, F>(steps: &'a [Step], key: F) -> Vec<StepGroup>
where
    F: Fn(&'a Step) -> Option<&'a str>,
{
    let mut groups: BTreeMap<&str, Vec<Step>> = BTreeMap::new();
    for step in steps {
        groups
            .entry(bucket_name(key(step)))
            .or_default()
            .push(step.clone());
    }
    groups
        .into_iter()
        .map(|(name, steps)| StepGroup {
            name: name.to_string(),
            steps,
        })
        .collect()
}

/// Steps grouped by trimmed role, groups sorted by role name.
/// Within a group, input order is kept.
pub fn steps_by_role(steps: &[Step]) -> Vec<StepGroup> {
    group_by(steps, |s| s.role.as_deref())
}

/// Steps grouped by trimmed lane, groups sorted by lane name
pub fn steps_by_lane(steps: &[Step]) -> Vec<StepGroup> {
    group_by(steps, |s| s.lane.as_deref())
}

fn distinct_sorted<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct non-blank categories, sorted
pub fn available_categories(processes: &[Process]) -> Vec<String> {
    distinct_sorted(processes.iter().map(|p| p.category.as_deref()))
}

/// Distinct non-blank lanes, sorted
pub fn available_lanes(steps: &[Step]) -> Vec<String> {
    distinct_sorted(steps.iter().map(|s| s.lane.as_deref()))
}

/// Distinct non-blank roles, sorted
pub fn available_roles(steps: &[Step]) -> Vec<String> {
    distinct_sorted(steps.iter().map(|s| s.role.as_deref()))
}

/// Processes in `category` (trimmed match), or all when `None`
pub fn filter_processes_by_category(processes: &[Process], category: Option<&str>) -> Vec<Process> {
    match category.map(str::trim) {
        Some(c) => processes
            .iter()
            .filter(|p| p.category.as_deref().map(str::trim) == Some(c))
            .cloned()
            .collect(),
        None => processes.to_vec(),
    }
}

fn bucket_matches(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        Some(w) => bucket_name(value) == bucket_name(Some(w)),
        None => true,
    }
}

/// Steps matching every constraint of `filter`.
/// Filtering on `Unassigned` selects steps with a blank value.
pub fn filter_steps(steps: &[Step], filter: StepFilter<'_>) -> Vec<Step> {
    steps
        .iter()
        .filter(|s| bucket_matches(s.role.as_deref(), filter.role))
        .filter(|s| bucket_matches(s.lane.as_deref(), filter.lane))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{comment, step};
    use crate::style::UNASSIGNED;

    fn process(slug: &str, category: Option<&str>) -> Process {
        Process {
            id: slug.to_string(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            description: None,
            category: category.map(str::to_string),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_visible_comments_without_selection() {
        let comments = vec![
            comment("1", Some("a"), "open"),
            comment("2", None, "open"),
            comment("3", Some("b"), "resolved"),
        ];
        assert_eq!(visible_comments(&comments, None), comments);
    }

    #[test]
    fn test_visible_comments_for_selected_step() {
        let comments = vec![
            comment("1", Some("a"), "open"),
            comment("2", None, "open"),
            comment("3", Some("b"), "resolved"),
            comment("4", Some("a"), "resolved"),
        ];
        let ids: Vec<String> = visible_comments(&comments, Some("a"))
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_steps_by_role_trims_and_buckets() {
        let steps = vec![
            step("1", Some("OPS"), None, Some(3)),
            step("2", Some("  OPS "), None, Some(1)),
            step("3", None, None, Some(0)),
            step("4", Some("Client"), None, Some(2)),
            step("5", Some(""), None, None),
        ];
        let groups = steps_by_role(&steps);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Client", "OPS", UNASSIGNED]);

        let ops: Vec<&str> = groups[1].steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ops, vec!["1", "2"]);
        let unassigned: Vec<&str> = groups[2].steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(unassigned, vec!["3", "5"]);
    }

    #[test]
    fn test_steps_by_lane() {
        let steps = vec![
            step("1", None, Some("Sales"), None),
            step("2", None, Some("Client"), None),
            step("3", None, Some("Sales "), None),
        ];
        let groups = steps_by_lane(&steps);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Client");
        assert_eq!(groups[1].steps.len(), 2);
    }

    #[test]
    fn test_available_lanes_skip_blank() {
        let steps = vec![
            step("1", None, Some(""), None),
            step("2", None, None, None),
            step("3", None, Some("OPS"), None),
            step("4", None, Some(" OPS"), None),
            step("5", None, Some("Client"), None),
            step("6", None, Some("   "), None),
        ];
        assert_eq!(available_lanes(&steps), vec!["Client", "OPS"]);
    }

    #[test]
    fn test_available_values_are_case_sensitive() {
        let steps = vec![
            step("1", Some("ops"), None, None),
            step("2", Some("OPS"), None, None),
            step("3", Some("OPS "), None, None),
        ];
        assert_eq!(available_roles(&steps), vec!["OPS", "ops"]);
    }

    #[test]
    fn test_available_categories() {
        let processes = vec![
            process("a", Some("Finance")),
            process("b", None),
            process("c", Some(" Finance")),
            process("d", Some("Onboarding")),
            process("e", Some("")),
        ];
        assert_eq!(available_categories(&processes), vec!["Finance", "Onboarding"]);
        assert!(available_categories(&[]).is_empty());
    }

    #[test]
    fn test_filter_processes_by_category() {
        let processes = vec![
            process("a", Some("Finance")),
            process("b", Some("Onboarding")),
            process("c", Some("Finance ")),
        ];
        let finance: Vec<String> = filter_processes_by_category(&processes, Some("Finance"))
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(finance, vec!["a", "c"]);
        assert_eq!(filter_processes_by_category(&processes, None).len(), 3);
    }

    #[test]
    fn test_filter_steps() {
        let steps = vec![
            step("1", Some("OPS"), Some("Back office"), None),
            step("2", Some("OPS"), Some("Client"), None),
            step("3", Some("Sales"), Some("Client"), None),
            step("4", None, Some("Client"), None),
        ];

        let ids = |f: StepFilter<'_>| -> Vec<String> {
            filter_steps(&steps, f).into_iter().map(|s| s.id).collect()
        };

        assert_eq!(ids(StepFilter::default()).len(), 4);
        assert_eq!(ids(StepFilter { role: Some(" OPS"), lane: None }), vec!["1", "2"]);
        assert_eq!(
            ids(StepFilter { role: Some("OPS"), lane: Some("Client") }),
            vec!["2"]
        );
        assert_eq!(ids(StepFilter { role: Some(UNASSIGNED), lane: None }), vec!["4"]);
    }

    #[test]
    fn test_filters_do_not_mutate_input() {
        let steps = vec![step("1", Some(" OPS "), Some(" Client "), Some(1))];
        let before = steps.clone();
        let _ = steps_by_role(&steps);
        let _ = available_lanes(&steps);
        let _ = filter_steps(&steps, StepFilter { role: Some("OPS"), lane: None });
        assert_eq!(steps, before);
    }
}
