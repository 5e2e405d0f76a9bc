//! Execution report type definitions

use crate::{AppId, AppVersion, PlanAction, PlanEntry, SupersededApp};
use appctl_errors::PublishError;
use serde::{Deserialize, Serialize};

/// Terminal state of one plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum EntryOutcome {
    Succeeded,
    Failed(PublishError),
    Skipped,
    /// Execution was aborted before this entry was reached
    NotAttempted,
}

impl EntryOutcome {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
            Self::NotAttempted => "not attempted",
        }
    }
}

/// Cleanup state of a superseded release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SupersededState {
    Pending,
    Removed,
    RemoveFailed(PublishError),
}

/// A superseded release and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededRecord {
    pub app: SupersededApp,
    pub state: SupersededState,
}

/// Per-entry execution result, in plan order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    pub app_id: AppId,
    pub name: String,
    pub publisher: String,
    pub version: AppVersion,
    pub action: PlanAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<AppVersion>,
    pub outcome: EntryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<SupersededRecord>,
}

impl EntryReport {
    #[must_use]
    pub fn new(entry: &PlanEntry, outcome: EntryOutcome) -> Self {
        Self {
            app_id: entry.package.app_id.clone(),
            name: entry.package.name.clone(),
            publisher: entry.package.publisher.clone(),
            version: entry.package.version,
            action: entry.action,
            previous_version: entry.existing_version(),
            outcome,
            superseded: None,
        }
    }
}

/// Result of executing a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_attempted: usize,
    /// Successful new installs
    pub new_installs: usize,
    /// Successful upgrades
    pub upgrades: usize,
    /// Successful downgrades
    pub downgrades: usize,
    pub superseded_removed: usize,
    pub superseded_remove_failed: usize,
    /// Whether the failure policy stopped execution early
    pub aborted: bool,
    pub entries: Vec<EntryReport>,
}

impl ExecutionSummary {
    /// True when nothing failed, including superseded cleanup
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.superseded_remove_failed == 0 && !self.aborted
    }
}
