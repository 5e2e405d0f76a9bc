use serde::{Deserialize, Serialize};

use super::FailureContext;
use appctl_types::{AppVersion, PlanAction};

/// Plan execution events
///
/// `position` is the zero-based index of the entry in the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecuteEvent {
    Started {
        total: usize,
        unpublish_superseded: bool,
    },

    EntryStarted {
        position: usize,
        name: String,
        version: AppVersion,
        action: PlanAction,
    },

    EntrySucceeded {
        position: usize,
        name: String,
        version: AppVersion,
        action: PlanAction,
    },

    EntrySkipped {
        position: usize,
        name: String,
        version: AppVersion,
    },

    EntryFailed {
        position: usize,
        name: String,
        version: AppVersion,
        action: PlanAction,
        failure: FailureContext,
    },

    /// The failure policy stopped execution
    Aborted { position: usize, remaining: usize },

    SupersededQueued {
        name: String,
        publisher: String,
        version: AppVersion,
    },

    SupersededRemoved {
        name: String,
        publisher: String,
        version: AppVersion,
    },

    SupersededRemoveFailed {
        name: String,
        publisher: String,
        version: AppVersion,
        failure: FailureContext,
    },

    Completed {
        succeeded: usize,
        failed: usize,
        skipped: usize,
        not_attempted: usize,
        superseded_removed: usize,
        superseded_remove_failed: usize,
    },
}
