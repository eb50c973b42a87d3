//! Dashboard selection as a plain value.
//!
//! The active step and category are passed into the builder and filters
//! explicitly. Every operation returns a new `Selection`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub step_id: Option<String>,
    pub category: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_step(&self, step_id: &str) -> Self {
        Self {
            step_id: Some(step_id.to_string()),
            ..self.clone()
        }
    }

    pub fn clear_step(&self) -> Self {
        Self {
            step_id: None,
            ..self.clone()
        }
    }

    /// Select `step_id`, or clear the selection if it is already selected
    pub fn toggle_step(&self, step_id: &str) -> Self {
        if self.step_id.as_deref() == Some(step_id) {
            self.clear_step()
        } else {
            self.select_step(step_id)
        }
    }

    /// Blank categories clear the filter
    pub fn with_category(&self, category: Option<&str>) -> Self {
        Self {
            category: category
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            ..self.clone()
        }
    }

    pub fn selected_step(&self) -> Option<&str> {
        self.step_id.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}
