//! Installation plan type definitions

use crate::{AppPackage, AppVersion, InstalledApp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the executor will do with a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// No installed release of the app exists
    NewInstall,
    /// Candidate is newer than the installed release
    Upgrade,
    /// Candidate equals the installed release
    Skip,
    /// Candidate is older than the installed release
    Downgrade,
}

impl PlanAction {
    /// Upgrades and downgrades both go through the data-migration publish path
    #[must_use]
    pub fn is_upgrade_class(self) -> bool {
        matches!(self, Self::Upgrade | Self::Downgrade)
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewInstall => write!(f, "new install"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Skip => write!(f, "skip"),
            Self::Downgrade => write!(f, "downgrade"),
        }
    }
}

/// One row of an installation plan
///
/// Entries are built once by the planner and never mutated; execution
/// results are recorded separately in an `EntryReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub package: AppPackage,
    /// Installed release with the same app id, if any
    pub existing: Option<InstalledApp>,
    pub action: PlanAction,
}

impl PlanEntry {
    #[must_use]
    pub fn new(package: AppPackage, existing: Option<InstalledApp>, action: PlanAction) -> Self {
        Self {
            package,
            existing,
            action,
        }
    }

    /// Version currently installed, if any
    #[must_use]
    pub fn existing_version(&self) -> Option<AppVersion> {
        self.existing.as_ref().map(|app| app.version)
    }
}

impl fmt::Display for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.existing, self.action) {
            (Some(existing), PlanAction::Upgrade | PlanAction::Downgrade) => write!(
                f,
                "{}: {} ({} -> {})",
                self.package.name, self.action, existing.version, self.package.version
            ),
            _ => write!(
                f,
                "{}: {} ({})",
                self.package.name, self.action, self.package.version
            ),
        }
    }
}

/// Decision returned by a failure policy after a publish fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinueDecision {
    Continue,
    Abort,
}
