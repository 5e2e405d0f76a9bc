//! Plan construction error types
//!
//! Every variant here is fatal to plan construction: a batch that cannot be
//! classified or ordered as a whole produces no plan at all.

use std::borrow::Cow;

use crate::{UserFacingError, VersionError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PlanError {
    #[error("cannot classify {app}: {source}")]
    Classification {
        app: String,
        #[source]
        source: VersionError,
    },

    #[error("dependency order is not a permutation of the batch: {message}")]
    OrderMismatch { message: String },

    #[error("app id {app_id} appears more than once in the batch ({names})")]
    DuplicateAppId { app_id: String, names: String },

    #[error("app id {app_id} has {count} installed entries in the snapshot")]
    AmbiguousInstalledMatch { app_id: String, count: usize },

    #[error("circular dependency detected: {apps}")]
    CircularDependency { apps: String },

    #[error("no packages specified")]
    NoPackagesSpecified,
}

impl UserFacingError for PlanError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Classification { .. } => {
                Some("Fix the version string in the package or the installed snapshot.")
            }
            Self::OrderMismatch { .. } => {
                Some("The dependency sorter must return every package of the batch exactly once.")
            }
            Self::DuplicateAppId { .. } => Some(
                "Remove one of the duplicate packages or set planner.duplicate_app_ids = \"independent\".",
            ),
            Self::AmbiguousInstalledMatch { .. } => {
                Some("Refresh the installed-app snapshot from the target environment.")
            }
            Self::CircularDependency { .. } => {
                Some("Break the dependency cycle between the listed apps.")
            }
            Self::NoPackagesSpecified => Some("List at least one package in the batch manifest."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Classification { .. } => "plan.classification",
            Self::OrderMismatch { .. } => "plan.order_mismatch",
            Self::DuplicateAppId { .. } => "plan.duplicate_app_id",
            Self::AmbiguousInstalledMatch { .. } => "plan.ambiguous_installed_match",
            Self::CircularDependency { .. } => "plan.circular_dependency",
            Self::NoPackagesSpecified => "plan.no_packages",
        };
        Some(code)
    }
}
