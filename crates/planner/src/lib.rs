#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Installation planning and execution for appctl
//!
//! Given a batch of candidate packages and a snapshot of what a target
//! already has, the planner decides per package whether it is a new
//! install, an upgrade, a downgrade, or nothing to do, keeping the
//! dependency order it was handed. The executor then publishes the plan
//! entry by entry, applies the failure policy, and removes superseded
//! releases once the batch is through.
//!
//! Everything that touches the outside world (package files, the target
//! environment, dependency analysis) is reached through the traits in
//! [`traits`], so the planner itself is pure and deterministic.

pub mod classify;
pub mod execute;
pub mod plan;
pub mod sort;
pub mod traits;

pub use classify::{classify, find_existing, parse_version};
pub use execute::{
    policy_for, AbortOnFirstFailure, AlwaysContinue, ExecuteOptions, Executor, FailurePolicy,
    Publisher,
};
pub use plan::{build_plan, PlanOptions, Planner};
pub use sort::DeclaredDependencySorter;
pub use traits::{DependencySorter, EnvironmentQuery, PackageReader};

use appctl_errors::Result;
use appctl_events::{EventEmitter, EventSender};
use appctl_types::{ExecutionSummary, PlanEntry, Target};
use std::path::{Path, PathBuf};

/// Wires the collaborators into a two-step prepare / run flow
#[derive(Debug)]
pub struct InstallPlanner<R, Q, S> {
    reader: R,
    query: Q,
    sorter: S,
    planner: Planner,
    executor: Executor,
    event_sender: Option<EventSender>,
}

impl<R, Q, S> InstallPlanner<R, Q, S>
where
    R: PackageReader,
    Q: EnvironmentQuery,
    S: DependencySorter,
{
    #[must_use]
    pub fn new(reader: R, query: Q, sorter: S) -> Self {
        Self {
            reader,
            query,
            sorter,
            planner: Planner::default(),
            executor: Executor::default(),
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_plan_options(mut self, options: PlanOptions) -> Self {
        self.planner = rebuild_planner(options, self.event_sender.clone());
        self
    }

    #[must_use]
    pub fn with_execute_options(mut self, options: ExecuteOptions) -> Self {
        self.executor = rebuild_executor(options, self.event_sender.clone());
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.planner = self.planner.with_event_sender(sender.clone());
        self.executor = self.executor.with_event_sender(sender.clone());
        self.event_sender = Some(sender);
        self
    }

    /// Read every package file, query the target, sort, and plan
    ///
    /// # Errors
    ///
    /// Fails if any package cannot be read, the target cannot be queried,
    /// the sorter finds no valid order, or the plan cannot be built. Nothing
    /// is published in any of these cases.
    pub fn prepare<P: AsRef<Path>>(&self, target: &Target, paths: &[P]) -> Result<Vec<PlanEntry>> {
        self.emit_operation_started("prepare");

        let result = self.prepare_inner(target, paths);
        match &result {
            Ok(_) => self.emit_operation_completed("prepare", true),
            Err(err) => self.emit_operation_failed(
                "prepare",
                appctl_events::FailureContext::from_error(err),
            ),
        }
        result
    }

    fn prepare_inner<P: AsRef<Path>>(
        &self,
        target: &Target,
        paths: &[P],
    ) -> Result<Vec<PlanEntry>> {
        let packages = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                self.reader.read_package(path).map(|package| match package.path {
                    Some(_) => package,
                    None => package.with_path(PathBuf::from(path)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let installed = self.query.installed_apps(target)?;
        let order = self.sorter.sort(&packages)?;

        Ok(self.planner.build(target, &packages, &installed, &order)?)
    }

    /// Execute a prepared plan
    pub fn run<P, F>(
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
        self.executor.execute(target, plan, publisher, policy)
    }
}

fn rebuild_planner(options: PlanOptions, sender: Option<EventSender>) -> Planner {
    let planner = Planner::new(options);
    match sender {
        Some(sender) => planner.with_event_sender(sender),
        None => planner,
    }
}

fn rebuild_executor(options: ExecuteOptions, sender: Option<EventSender>) -> Executor {
    let executor = Executor::new(options);
    match sender {
        Some(sender) => executor.with_event_sender(sender),
        None => executor,
    }
}

impl<R, Q, S> EventEmitter for InstallPlanner<R, Q, S> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}
