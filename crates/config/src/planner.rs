//! Planner and executor settings

use appctl_types::{DuplicatePolicy, FailureMode};
use serde::{Deserialize, Serialize};

/// `[planner]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Remove the previous release after a successful upgrade
    #[serde(default = "default_unpublish_superseded")]
    pub unpublish_superseded: bool,
    #[serde(default)]
    pub on_failure: FailureMode,
    #[serde(default)]
    pub duplicate_app_ids: DuplicatePolicy,
    /// Execute downgrades without asking
    #[serde(default)]
    pub allow_downgrade: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            unpublish_superseded: true,
            on_failure: FailureMode::Continue,
            duplicate_app_ids: DuplicatePolicy::Reject,
            allow_downgrade: false,
        }
    }
}

fn default_unpublish_superseded() -> bool {
    true
}
