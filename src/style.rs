//! Role styles for process graph nodes
//!
//! Roles map to fill/border colors through a lookup table rather than
//! branching, so adding a role is adding a row. Anything not in the table,
//! including a blank role, renders with [`UNASSIGNED_STYLE`].

use serde::Serialize;

/// Bucket name used for blank or missing roles and lanes
pub const UNASSIGNED: &str = "Unassigned";

/// Colors for one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleStyle {
    pub role: &'static str,
    pub fill: &'static str,
    pub border: &'static str,
    pub text: &'static str,
}

/// Known organizational roles
pub const ROLE_STYLES: &[RoleStyle] = &[
    RoleStyle { role: "Client", fill: "#FEF3C7", border: "#D97706", text: "#78350F" },
    RoleStyle { role: "Sales", fill: "#DBEAFE", border: "#2563EB", text: "#1E3A8A" },
    RoleStyle { role: "OPS", fill: "#DCFCE7", border: "#16A34A", text: "#14532D" },
    RoleStyle { role: "Finance", fill: "#EDE9FE", border: "#7C3AED", text: "#4C1D95" },
    RoleStyle { role: "Legal", fill: "#FCE7F3", border: "#DB2777", text: "#831843" },
    RoleStyle { role: "Management", fill: "#E0F2FE", border: "#0284C7", text: "#0C4A6E" },
    RoleStyle { role: "Support", fill: "#FFEDD5", border: "#EA580C", text: "#7C2D12" },
];

/// Neutral style for unknown roles
pub const UNASSIGNED_STYLE: RoleStyle = RoleStyle {
    role: UNASSIGNED,
    fill: "#F3F4F6",
    border: "#9CA3AF",
    text: "#374151",
};

/// Trimmed value, or `Unassigned` when missing or blank
pub fn bucket_name(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => UNASSIGNED,
    }
}

/// Style for a role (trimmed, exact match)
pub fn role_style(role: Option<&str>) -> &'static RoleStyle {
    let name = bucket_name(role);
    ROLE_STYLES
        .iter()
        .find(|s| s.role == name)
        .unwrap_or(&UNASSIGNED_STYLE)
}

/// Highlight applied on top of the role style. At most one per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    /// The step has at least one open comment; wins over selection
    OpenComment,
    /// The step is the currently selected one
    Selected,
}

impl Overlay {
    pub fn border(&self) -> &'static str {
        match self {
            Overlay::OpenComment => "#DC2626",
            Overlay::Selected => "#2563EB",
        }
    }

    pub fn border_width(&self) -> u8 {
        match self {
            Overlay::OpenComment => 3,
            Overlay::Selected => 2,
        }
    }
}

/// Resolved visual attributes of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    pub fill: &'static str,
    pub border: &'static str,
    pub border_width: u8,
    pub text: &'static str,
}

/// Base border width without an overlay
pub const BASE_BORDER_WIDTH: u8 = 1;

/// Combine a role style with an optional overlay
pub fn node_style(role: Option<&str>, overlay: Option<Overlay>) -> NodeStyle {
    let base = role_style(role);
    match overlay {
        Some(o) => NodeStyle {
            fill: base.fill,
            border: o.border(),
            border_width: o.border_width(),
            text: base.text,
        },
        None => NodeStyle {
            fill: base.fill,
            border: base.border,
            border_width: BASE_BORDER_WIDTH,
            text: base.text,
        },
    }
}
