//! Classification of a candidate package against the installed snapshot

use appctl_errors::PlanError;
use appctl_types::{AppId, AppPackage, AppVersion, InstalledApp, PlanAction};
use std::cmp::Ordering;

/// Classify a package given its installed match, if any
///
/// Pure function of the two versions and whether a match exists.
#[must_use]
pub fn classify(package: &AppPackage, existing: Option<&InstalledApp>) -> PlanAction {
    let Some(existing) = existing else {
        return PlanAction::NewInstall;
    };

    match package.version.cmp(&existing.version) {
        Ordering::Greater => PlanAction::Upgrade,
        Ordering::Equal => PlanAction::Skip,
        Ordering::Less => PlanAction::Downgrade,
    }
}

/// Find the installed release matching an app id
///
/// Only rows with `is_installed` set count as a match; published-only rows
/// are ignored.
///
/// # Errors
///
/// Returns `PlanError::AmbiguousInstalledMatch` if more than one installed
/// row carries the app id.
pub fn find_existing<'a>(
    installed: &'a [InstalledApp],
    app_id: &AppId,
) -> Result<Option<&'a InstalledApp>, PlanError> {
    let mut matches = installed
        .iter()
        .filter(|app| app.is_installed && &app.app_id == app_id);

    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(PlanError::AmbiguousInstalledMatch {
            app_id: app_id.to_string(),
            count: extra + 1,
        });
    }

    Ok(first)
}

/// Parse a raw version string for the named app
///
/// Readers of package files and snapshots use this so that a malformed
/// version anywhere in a batch fails plan construction as a whole.
///
/// # Errors
///
/// Returns `PlanError::Classification` wrapping the version error.
pub fn parse_version(app: &str, raw: &str) -> Result<AppVersion, PlanError> {
    AppVersion::parse(raw).map_err(|source| PlanError::Classification {
        app: app.to_string(),
        source,
    })
}
