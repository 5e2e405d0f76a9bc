use serde::{Deserialize, Serialize};

use super::FailureContext;
use appctl_types::{AppId, AppVersion, PlanAction};

/// Plan construction events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// Planning started for a batch
    Started {
        target: String,
        packages: usize,
        installed: usize,
    },

    /// One package was classified against the snapshot
    EntryClassified {
        position: usize,
        app_id: AppId,
        name: String,
        version: AppVersion,
        existing_version: Option<AppVersion>,
        action: PlanAction,
    },

    /// The full plan is ready
    Built {
        total: usize,
        new_installs: usize,
        upgrades: usize,
        downgrades: usize,
        skips: usize,
    },

    /// The batch could not be planned
    Failed { failure: FailureContext },
}
