//! Plan execution with per-entry failure handling and superseded cleanup
//!
//! Entries run strictly in plan order, one at a time. A publish failure is
//! recorded on its entry and handed to the failure policy, which decides
//! whether the remaining entries run. Releases superseded by a successful
//! upgrade are only removed after the main loop, so later entries in the
//! batch can still rely on them while they publish.

use appctl_errors::PublishError;
use appctl_events::{EventEmitter, EventSender, ExecuteEvent, FailureContext};
use appctl_types::{
    AppPackage, AppVersion, ContinueDecision, EntryOutcome, EntryReport, ExecutionSummary,
    FailureMode, PlanAction, PlanEntry, SupersededApp, SupersededRecord, SupersededState, Target,
};

/// Performs the actual install and removal against a target environment
pub trait Publisher {
    /// Publish a package; `is_upgrade` selects the data-migration path
    ///
    /// # Errors
    ///
    /// Returns a `PublishError` describing why the target refused the app.
    fn publish(
        &mut self,
        target: &Target,
        package: &AppPackage,
        is_upgrade: bool,
    ) -> Result<(), PublishError>;

    /// Remove one release of an app
    ///
    /// # Errors
    ///
    /// Returns a `PublishError` describing why the removal failed.
    fn unpublish(
        &mut self,
        target: &Target,
        name: &str,
        publisher: &str,
        version: &AppVersion,
    ) -> Result<(), PublishError>;
}

/// Decides whether execution continues after a failed publish
pub trait FailurePolicy {
    fn on_failure(&mut self, entry: &PlanEntry, error: &PublishError) -> ContinueDecision;
}

impl<F> FailurePolicy for F
where
    F: FnMut(&PlanEntry, &PublishError) -> ContinueDecision,
{
    fn on_failure(&mut self, entry: &PlanEntry, error: &PublishError) -> ContinueDecision {
        self(entry, error)
    }
}

/// Keep going after every failure
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl FailurePolicy for AlwaysContinue {
    fn on_failure(&mut self, _entry: &PlanEntry, _error: &PublishError) -> ContinueDecision {
        ContinueDecision::Continue
    }
}

/// Stop at the first failed publish
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnFirstFailure;

impl FailurePolicy for AbortOnFirstFailure {
    fn on_failure(&mut self, _entry: &PlanEntry, _error: &PublishError) -> ContinueDecision {
        ContinueDecision::Abort
    }
}

/// Built-in policy for a configured failure mode
#[must_use]
pub fn policy_for(mode: FailureMode) -> Box<dyn FailurePolicy + Send> {
    match mode {
        FailureMode::Continue => Box::new(AlwaysContinue),
        FailureMode::Abort => Box::new(AbortOnFirstFailure),
    }
}

/// Executor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Remove the previous release after a successful upgrade or downgrade
    pub unpublish_superseded: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            unpublish_superseded: true,
        }
    }
}

/// Runs a plan against a target
#[derive(Debug, Clone, Default)]
pub struct Executor {
    options: ExecuteOptions,
    event_sender: Option<EventSender>,
}

impl Executor {
    #[must_use]
    pub fn new(options: ExecuteOptions) -> Self {
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

    /// Execute `plan` against `target`
    ///
    /// Never fails: every publish and unpublish error is recorded in the
    /// returned summary. The summary has exactly one report per plan entry,
    /// in plan order.
    pub fn execute<P, F>(
        &self,
        target: &Target,
        plan: &[PlanEntry],
        publisher: &mut P,
        policy: &mut F,
    ) -> ExecutionSummary
    where
        P: Publisher + ?Sized,
        F: FailurePolicy + ?Sized,
    {
        let correlation = target.name();
        let mut reports: Vec<EntryReport> = Vec::with_capacity(plan.len());
        // Indices into `reports` whose superseded release awaits removal
        let mut pending: Vec<usize> = Vec::new();
        let mut aborted = false;

        self.emit_execute(
            correlation,
            ExecuteEvent::Started {
                total: plan.len(),
                unpublish_superseded: self.options.unpublish_superseded,
            },
        );

        for (position, entry) in plan.iter().enumerate() {
            if entry.action == PlanAction::Skip {
                self.emit_execute(
                    correlation,
                    ExecuteEvent::EntrySkipped {
                        position,
                        name: entry.package.name.clone(),
                        version: entry.package.version,
                    },
                );
                reports.push(EntryReport::new(entry, EntryOutcome::Skipped));
                continue;
            }

            self.emit_execute(
                correlation,
                ExecuteEvent::EntryStarted {
                    position,
                    name: entry.package.name.clone(),
                    version: entry.package.version,
                    action: entry.action,
                },
            );

            let is_upgrade = entry.action.is_upgrade_class();
            match publisher.publish(target, &entry.package, is_upgrade) {
                Ok(()) => {
                    let mut report = EntryReport::new(entry, EntryOutcome::Succeeded);
                    if let Some(record) = self.queue_superseded(correlation, entry) {
                        report.superseded = Some(record);
                        pending.push(reports.len());
                    }
                    self.emit_execute(
                        correlation,
                        ExecuteEvent::EntrySucceeded {
                            position,
                            name: entry.package.name.clone(),
                            version: entry.package.version,
                            action: entry.action,
                        },
                    );
                    reports.push(report);
                }
                Err(error) => {
                    tracing::warn!(
                        target_env = %target,
                        app = %entry.package,
                        error = %error,
                        "publish failed"
                    );
                    self.emit_execute(
                        correlation,
                        ExecuteEvent::EntryFailed {
                            position,
                            name: entry.package.name.clone(),
                            version: entry.package.version,
                            action: entry.action,
                            failure: FailureContext::from_error(&error),
                        },
                    );

                    let decision = policy.on_failure(entry, &error);
                    reports.push(EntryReport::new(entry, EntryOutcome::Failed(error)));

                    if decision == ContinueDecision::Abort {
                        aborted = true;
                        let remaining = plan.len() - position - 1;
                        self.emit_execute(
                            correlation,
                            ExecuteEvent::Aborted {
                                position,
                                remaining,
                            },
                        );
                        break;
                    }
                }
            }
        }

        for entry in &plan[reports.len()..] {
            reports.push(EntryReport::new(entry, EntryOutcome::NotAttempted));
        }

        // Cleanup runs over whatever was queued, aborted or not
        for index in pending {
            self.remove_superseded(target, publisher, &mut reports[index]);
        }

        let summary = summarize(reports, aborted);
        self.emit_execute(
            correlation,
            ExecuteEvent::Completed {
                succeeded: summary.succeeded,
                failed: summary.failed,
                skipped: summary.skipped,
                not_attempted: summary.not_attempted,
                superseded_removed: summary.superseded_removed,
                superseded_remove_failed: summary.superseded_remove_failed,
            },
        );
        tracing::info!(
            target_env = %target,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            aborted = summary.aborted,
            "plan executed"
        );

        summary
    }

    fn queue_superseded(&self, correlation: &str, entry: &PlanEntry) -> Option<SupersededRecord> {
        if !self.options.unpublish_superseded || !entry.action.is_upgrade_class() {
            return None;
        }
        let existing = entry.existing.as_ref()?;
        let app = SupersededApp::from(existing);

        self.emit_execute(
            correlation,
            ExecuteEvent::SupersededQueued {
                name: app.name.clone(),
                publisher: app.publisher.clone(),
                version: app.version,
            },
        );

        Some(SupersededRecord {
            app,
            state: SupersededState::Pending,
        })
    }

    fn remove_superseded<P>(&self, target: &Target, publisher: &mut P, report: &mut EntryReport)
    where
        P: Publisher + ?Sized,
    {
        let Some(record) = report.superseded.as_mut() else {
            return;
        };
        let app = &record.app;

        match publisher.unpublish(target, &app.name, &app.publisher, &app.version) {
            Ok(()) => {
                self.emit_execute(
                    target.name(),
                    ExecuteEvent::SupersededRemoved {
                        name: app.name.clone(),
                        publisher: app.publisher.clone(),
                        version: app.version,
                    },
                );
                record.state = SupersededState::Removed;
            }
            Err(error) => {
                tracing::warn!(
                    target_env = %target,
                    app = %app,
                    error = %error,
                    "superseded release could not be removed"
                );
                self.emit_execute(
                    target.name(),
                    ExecuteEvent::SupersededRemoveFailed {
                        name: app.name.clone(),
                        publisher: app.publisher.clone(),
                        version: app.version,
                        failure: FailureContext::from_error(&error),
                    },
                );
                record.state = SupersededState::RemoveFailed(error);
            }
        }
    }
}

impl EventEmitter for Executor {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

fn summarize(entries: Vec<EntryReport>, aborted: bool) -> ExecutionSummary {
    let mut summary = ExecutionSummary {
        total: entries.len(),
        aborted,
        ..ExecutionSummary::default()
    };

    for report in &entries {
        match report.outcome {
            EntryOutcome::Succeeded => {
                summary.succeeded += 1;
                match report.action {
                    PlanAction::NewInstall => summary.new_installs += 1,
                    PlanAction::Upgrade => summary.upgrades += 1,
                    PlanAction::Downgrade => summary.downgrades += 1,
                    PlanAction::Skip => {}
                }
            }
            EntryOutcome::Failed(_) => summary.failed += 1,
            EntryOutcome::Skipped => summary.skipped += 1,
            EntryOutcome::NotAttempted => summary.not_attempted += 1,
        }

        match report.superseded.as_ref().map(|record| &record.state) {
            Some(SupersededState::Removed) => summary.superseded_removed += 1,
            Some(SupersededState::RemoveFailed(_)) => summary.superseded_remove_failed += 1,
            Some(SupersededState::Pending) | None => {}
        }
    }

    summary.entries = entries;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        publishes: Vec<(String, bool)>,
        fail: Vec<String>,
    }

    impl Publisher for Recorder {
        fn publish(
            &mut self,
            _target: &Target,
            package: &AppPackage,
            is_upgrade: bool,
        ) -> Result<(), PublishError> {
            self.publishes.push((package.name.clone(), is_upgrade));
            if self.fail.contains(&package.name) {
                return Err(PublishError::Failed {
                    app: package.name.clone(),
                    message: "refused".into(),
                });
            }
            Ok(())
        }

        fn unpublish(
            &mut self,
            _target: &Target,
            _name: &str,
            _publisher: &str,
            _version: &AppVersion,
        ) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn entry(name: &str, action: PlanAction) -> PlanEntry {
        let version = AppVersion::new(2, 0, 0, 0);
        let package = AppPackage::new(name, name, "Contoso", version);
        let existing = action.is_upgrade_class().then(|| {
            appctl_types::InstalledApp::new(name, name, "Contoso", AppVersion::new(1, 0, 0, 0))
        });
        PlanEntry::new(package, existing, action)
    }

    #[test]
    fn test_upgrade_flag_follows_action() {
        let plan = vec![
            entry("new", PlanAction::NewInstall),
            entry("up", PlanAction::Upgrade),
            entry("down", PlanAction::Downgrade),
        ];
        let mut publisher = Recorder::default();
        let summary = Executor::default().execute(
            &Target::new("bc"),
            &plan,
            &mut publisher,
            &mut AlwaysContinue,
        );

        assert_eq!(
            publisher.publishes,
            vec![
                ("new".to_string(), false),
                ("up".to_string(), true),
                ("down".to_string(), true)
            ]
        );
        assert_eq!(summary.new_installs, 1);
        assert_eq!(summary.upgrades, 1);
        assert_eq!(summary.downgrades, 1);
        assert_eq!(summary.superseded_removed, 2);
    }

    #[test]
    fn test_abort_on_last_entry_has_nothing_remaining() {
        let plan = vec![entry("a", PlanAction::NewInstall)];
        let mut publisher = Recorder {
            fail: vec!["a".into()],
            ..Recorder::default()
        };
        let summary = Executor::default().execute(
            &Target::new("bc"),
            &plan,
            &mut publisher,
            &mut AbortOnFirstFailure,
        );
        assert!(summary.aborted);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_attempted, 0);
        assert_eq!(summary.entries.len(), 1);
    }

    #[test]
    fn test_cleanup_disabled_queues_nothing() {
        let plan = vec![entry("up", PlanAction::Upgrade)];
        let mut publisher = Recorder::default();
        let executor = Executor::new(ExecuteOptions {
            unpublish_superseded: false,
        });
        let summary = executor.execute(
            &Target::new("bc"),
            &plan,
            &mut publisher,
            &mut AlwaysContinue,
        );
        assert_eq!(summary.succeeded, 1);
        assert!(summary.entries[0].superseded.is_none());
        assert_eq!(summary.superseded_removed, 0);
    }
}
