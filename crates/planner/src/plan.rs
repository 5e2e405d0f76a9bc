//! Plan construction

use crate::classify::{classify, find_existing};
use appctl_errors::PlanError;
use appctl_events::{EventEmitter, EventSender, FailureContext, PlanEvent};
use appctl_types::{AppId, AppPackage, DuplicatePolicy, InstalledApp, PlanAction, PlanEntry, Target};
use std::collections::HashMap;

/// Options that change how a batch is planned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub duplicates: DuplicatePolicy,
}

/// Build an installation plan
///
/// `dependency_order` must contain exactly the packages of `packages`
/// (compared by release, not by path), in the order they must be published.
/// The returned plan has one entry per package in that same order.
///
/// # Errors
///
/// Returns a `PlanError` if the order is not a permutation of the batch, if
/// the batch contains a duplicate app id under `DuplicatePolicy::Reject`, or
/// if the snapshot has more than one installed row for an app id. No partial
/// plan is returned.
pub fn build_plan(
    packages: &[AppPackage],
    installed: &[InstalledApp],
    dependency_order: &[AppPackage],
    options: &PlanOptions,
) -> Result<Vec<PlanEntry>, PlanError> {
    check_permutation(packages, dependency_order)?;

    if options.duplicates == DuplicatePolicy::Reject {
        check_duplicates(packages)?;
    }

    dependency_order
        .iter()
        .map(|package| {
            let existing = find_existing(installed, &package.app_id)?;
            let action = classify(package, existing);
            Ok(PlanEntry::new(package.clone(), existing.cloned(), action))
        })
        .collect()
}

fn check_permutation(
    packages: &[AppPackage],
    dependency_order: &[AppPackage],
) -> Result<(), PlanError> {
    if packages.len() != dependency_order.len() {
        return Err(PlanError::OrderMismatch {
            message: format!(
                "batch has {} packages, dependency order has {}",
                packages.len(),
                dependency_order.len()
            ),
        });
    }

    let mut used = vec![false; packages.len()];
    for ordered in dependency_order {
        let slot = packages
            .iter()
            .enumerate()
            .position(|(index, candidate)| !used[index] && candidate.same_release(ordered));

        match slot {
            Some(index) => used[index] = true,
            None => {
                return Err(PlanError::OrderMismatch {
                    message: format!("{ordered} is not part of the batch or appears twice"),
                })
            }
        }
    }

    Ok(())
}

fn check_duplicates(packages: &[AppPackage]) -> Result<(), PlanError> {
    let mut seen: HashMap<&AppId, Vec<&str>> = HashMap::new();
    let mut first_duplicate: Option<&AppId> = None;

    for package in packages {
        let names = seen.entry(&package.app_id).or_default();
        names.push(&package.name);
        if names.len() > 1 && first_duplicate.is_none() {
            first_duplicate = Some(&package.app_id);
        }
    }

    match first_duplicate {
        Some(app_id) => Err(PlanError::DuplicateAppId {
            app_id: app_id.to_string(),
            names: seen[app_id].join(", "),
        }),
        None => Ok(()),
    }
}

/// Plan builder that reports what it does through the event channel
#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: PlanOptions,
    event_sender: Option<EventSender>,
}

impl Planner {
    #[must_use]
    pub fn new(options: PlanOptions) -> Self {
        Self {
            options,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Build a plan for `target`, emitting one event per classified entry
    ///
    /// # Errors
    ///
    /// See [`build_plan`].
    pub fn build(
        &self,
        target: &Target,
        packages: &[AppPackage],
        installed: &[InstalledApp],
        dependency_order: &[AppPackage],
    ) -> Result<Vec<PlanEntry>, PlanError> {
        let correlation = target.name();
        self.emit_plan(
            correlation,
            PlanEvent::Started {
                target: target.to_string(),
                packages: packages.len(),
                installed: installed.len(),
            },
        );

        let plan = match build_plan(packages, installed, dependency_order, &self.options) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(target_env = %target, error = %err, "plan construction failed");
                self.emit_plan(
                    correlation,
                    PlanEvent::Failed {
                        failure: FailureContext::from_error(&err),
                    },
                );
                return Err(err);
            }
        };

        for (position, entry) in plan.iter().enumerate() {
            self.emit_plan(
                correlation,
                PlanEvent::EntryClassified {
                    position,
                    app_id: entry.package.app_id.clone(),
                    name: entry.package.name.clone(),
                    version: entry.package.version,
                    existing_version: entry.existing_version(),
                    action: entry.action,
                },
            );
        }

        let count = |action: PlanAction| plan.iter().filter(|e| e.action == action).count();
        self.emit_plan(
            correlation,
            PlanEvent::Built {
                total: plan.len(),
                new_installs: count(PlanAction::NewInstall),
                upgrades: count(PlanAction::Upgrade),
                downgrades: count(PlanAction::Downgrade),
                skips: count(PlanAction::Skip),
            },
        );
        tracing::debug!(target_env = %target, entries = plan.len(), "plan built");

        Ok(plan)
    }
}

impl EventEmitter for Planner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}
