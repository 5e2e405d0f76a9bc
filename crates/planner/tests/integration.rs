//! Integration tests for the planner crate

#[cfg(test)]
mod tests {
    use appctl_errors::{Error, PackageError, PlanError, PublishError};
    use appctl_events::{AppEvent, ExecuteEvent, PlanEvent};
    use appctl_planner::{
        build_plan, classify, AbortOnFirstFailure, AlwaysContinue, DeclaredDependencySorter,
        EnvironmentQuery, ExecuteOptions, Executor, InstallPlanner, PackageReader, PlanOptions,
        Planner, Publisher,
    };
    use appctl_types::{
        AppPackage, AppVersion, ContinueDecision, EntryOutcome, InstalledApp, PlanAction,
        PlanEntry, SupersededState, Target,
    };
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn v(s: &str) -> AppVersion {
        AppVersion::parse(s).unwrap()
    }

    fn pkg(id: &str, name: &str, version: &str) -> AppPackage {
        AppPackage::new(id, name, "Contoso", v(version))
    }

    fn installed(id: &str, name: &str, version: &str) -> InstalledApp {
        InstalledApp::new(id, name, "Contoso", v(version))
    }

    fn target() -> Target {
        Target::new("bc-sandbox")
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Publish { name: String, upgrade: bool },
        Unpublish { name: String, version: AppVersion },
    }

    /// Records every call; fails the names it is told to fail
    #[derive(Default)]
    struct FakePublisher {
        calls: Vec<Call>,
        failing_publish: Vec<String>,
        failing_unpublish: Vec<String>,
    }

    impl FakePublisher {
        fn failing(names: &[&str]) -> Self {
            Self {
                failing_publish: names.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }

        fn unpublishes(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Unpublish { .. }))
                .collect()
        }
    }

    impl Publisher for FakePublisher {
        fn publish(
            &mut self,
            _target: &Target,
            package: &AppPackage,
            is_upgrade: bool,
        ) -> Result<(), PublishError> {
            self.calls.push(Call::Publish {
                name: package.name.clone(),
                upgrade: is_upgrade,
            });
            if self.failing_publish.contains(&package.name) {
                return Err(PublishError::VersionConflict {
                    app: package.name.clone(),
                    message: "dependency missing".into(),
                });
            }
            Ok(())
        }

        fn unpublish(
            &mut self,
            _target: &Target,
            name: &str,
            _publisher: &str,
            version: &AppVersion,
        ) -> Result<(), PublishError> {
            self.calls.push(Call::Unpublish {
                name: name.to_string(),
                version: *version,
            });
            if self.failing_unpublish.iter().any(|n| n == name) {
                return Err(PublishError::Failed {
                    app: name.to_string(),
                    message: "still referenced".into(),
                });
            }
            Ok(())
        }
    }

    /// C skip, A new install, B upgrade from 1.0
    fn scenario_plan() -> Vec<PlanEntry> {
        let packages = vec![pkg("a", "A", "2.0"), pkg("b", "B", "1.5"), pkg("c", "C", "1.0")];
        let snapshot = vec![installed("b", "B", "1.0"), installed("c", "C", "1.0")];
        let order = vec![packages[2].clone(), packages[0].clone(), packages[1].clone()];
        build_plan(&packages, &snapshot, &order, &PlanOptions::default()).unwrap()
    }

    #[test]
    fn test_scenario_plan_follows_dependency_order() {
        let plan = scenario_plan();
        let rows: Vec<(&str, PlanAction)> = plan
            .iter()
            .map(|e| (e.package.name.as_str(), e.action))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("C", PlanAction::Skip),
                ("A", PlanAction::NewInstall),
                ("B", PlanAction::Upgrade),
            ]
        );
        assert_eq!(plan[2].existing_version(), Some(v("1.0")));
        assert_eq!(plan[2].to_string(), "B: upgrade (1.0 -> 1.5)");
    }

    #[test]
    fn test_scenario_all_succeed_with_cleanup() {
        let plan = scenario_plan();
        let mut publisher = FakePublisher::default();
        let summary =
            Executor::default().execute(&target(), &plan, &mut publisher, &mut AlwaysContinue);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.superseded_removed, 1);
        assert!(summary.is_clean());

        assert_eq!(
            publisher.calls,
            vec![
                Call::Publish {
                    name: "A".into(),
                    upgrade: false
                },
                Call::Publish {
                    name: "B".into(),
                    upgrade: true
                },
                Call::Unpublish {
                    name: "B".into(),
                    version: v("1.0")
                },
            ]
        );
    }

    #[test]
    fn test_scenario_failed_upgrade_removes_nothing() {
        let plan = scenario_plan();
        let mut publisher = FakePublisher::failing(&["B"]);
        let summary =
            Executor::default().execute(&target(), &plan, &mut publisher, &mut AlwaysContinue);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.superseded_removed, 0);
        assert!(publisher.unpublishes().is_empty());
        assert!(matches!(
            summary.entries[2].outcome,
            EntryOutcome::Failed(PublishError::VersionConflict { .. })
        ));
    }

    #[test]
    fn test_abort_leaves_rest_not_attempted() {
        let packages = vec![
            pkg("a", "A", "1.0"),
            pkg("b", "B", "1.0"),
            pkg("c", "C", "1.0"),
            pkg("d", "D", "1.0"),
        ];
        let plan = build_plan(&packages, &[], &packages, &PlanOptions::default()).unwrap();
        let mut publisher = FakePublisher::failing(&["B"]);
        let summary = Executor::default().execute(
            &target(),
            &plan,
            &mut publisher,
            &mut AbortOnFirstFailure,
        );

        assert!(summary.aborted);
        let outcomes: Vec<&str> = summary.entries.iter().map(|e| e.outcome.label()).collect();
        assert_eq!(
            outcomes,
            vec!["succeeded", "failed", "not attempted", "not attempted"]
        );
        assert_eq!(summary.not_attempted, 2);
        assert_eq!(publisher.calls.len(), 2);
    }

    #[test]
    fn test_cleanup_still_runs_after_abort() {
        let packages = vec![pkg("a", "A", "2.0"), pkg("b", "B", "1.0")];
        let snapshot = vec![installed("a", "A", "1.0")];
        let plan = build_plan(&packages, &snapshot, &packages, &PlanOptions::default()).unwrap();
        let mut publisher = FakePublisher::failing(&["B"]);
        let summary = Executor::default().execute(
            &target(),
            &plan,
            &mut publisher,
            &mut AbortOnFirstFailure,
        );

        assert!(summary.aborted);
        assert_eq!(summary.superseded_removed, 1);
        assert_eq!(
            publisher.calls.last(),
            Some(&Call::Unpublish {
                name: "A".into(),
                version: v("1.0")
            })
        );
    }

    #[test]
    fn test_unpublish_failure_keeps_upgrade_succeeded() {
        let packages = vec![pkg("a", "A", "2.0"), pkg("b", "B", "3.0")];
        let snapshot = vec![installed("a", "A", "1.0"), installed("b", "B", "2.0")];
        let plan = build_plan(&packages, &snapshot, &packages, &PlanOptions::default()).unwrap();
        let mut publisher = FakePublisher {
            failing_unpublish: vec!["A".into()],
            ..FakePublisher::default()
        };
        let summary =
            Executor::default().execute(&target(), &plan, &mut publisher, &mut AlwaysContinue);

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.upgrades, 2);
        assert_eq!(summary.superseded_removed, 1);
        assert_eq!(summary.superseded_remove_failed, 1);
        assert!(!summary.is_clean());

        let a = &summary.entries[0];
        assert_eq!(a.outcome, EntryOutcome::Succeeded);
        let record = a.superseded.as_ref().unwrap();
        assert!(matches!(record.state, SupersededState::RemoveFailed(_)));

        // Both unpublishes attempted, in queue order
        assert_eq!(publisher.unpublishes().len(), 2);
    }

    #[test]
    fn test_downgrade_publishes_as_upgrade_and_cleans_up() {
        let packages = vec![pkg("a", "A", "1.0")];
        let snapshot = vec![installed("a", "A", "2.0")];
        let plan = build_plan(&packages, &snapshot, &packages, &PlanOptions::default()).unwrap();
        assert_eq!(plan[0].action, PlanAction::Downgrade);

        let mut publisher = FakePublisher::default();
        let summary =
            Executor::default().execute(&target(), &plan, &mut publisher, &mut AlwaysContinue);
        assert_eq!(summary.downgrades, 1);
        assert_eq!(
            publisher.calls,
            vec![
                Call::Publish {
                    name: "A".into(),
                    upgrade: true
                },
                Call::Unpublish {
                    name: "A".into(),
                    version: v("2.0")
                },
            ]
        );
    }

    #[test]
    fn test_closure_policy_sees_failed_entry() {
        let packages = vec![pkg("a", "A", "1.0"), pkg("b", "B", "1.0"), pkg("c", "C", "1.0")];
        let plan = build_plan(&packages, &[], &packages, &PlanOptions::default()).unwrap();
        let mut publisher = FakePublisher::failing(&["A", "B"]);
        let mut seen = Vec::new();
        let mut policy = |entry: &PlanEntry, _error: &PublishError| {
            seen.push(entry.package.name.clone());
            if seen.len() == 2 {
                ContinueDecision::Abort
            } else {
                ContinueDecision::Continue
            }
        };

        let summary = Executor::default().execute(&target(), &plan, &mut publisher, &mut policy);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.not_attempted, 1);
        assert_eq!(seen, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_execution_is_deterministic() {
        let plan = scenario_plan();
        let run = || {
            let mut publisher = FakePublisher::failing(&["A"]);
            let summary =
                Executor::default().execute(&target(), &plan, &mut publisher, &mut AlwaysContinue);
            (summary, publisher.calls)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_ambiguous_snapshot_rejected() {
        let packages = vec![pkg("a", "A", "2.0")];
        let snapshot = vec![installed("a", "A", "1.0"), installed("A", "A", "1.1")];
        let err = build_plan(&packages, &snapshot, &packages, &PlanOptions::default()).unwrap_err();
        assert_eq!(
            err,
            PlanError::AmbiguousInstalledMatch {
                app_id: "a".into(),
                count: 2
            }
        );
    }

    #[test]
    fn test_published_only_rows_do_not_match() {
        let packages = vec![pkg("a", "A", "2.0")];
        let snapshot = vec![installed("a", "A", "1.0").published_only()];
        let plan = build_plan(&packages, &snapshot, &packages, &PlanOptions::default()).unwrap();
        assert_eq!(plan[0].action, PlanAction::NewInstall);
    }

    #[test]
    fn test_planner_emits_events() {
        let (tx, mut rx) = appctl_events::channel();
        let packages = vec![pkg("a", "A", "1.0"), pkg("b", "B", "1.0")];
        let snapshot = vec![installed("b", "B", "1.0")];
        let plan = Planner::default()
            .with_event_sender(tx)
            .build(&target(), &packages, &snapshot, &packages)
            .unwrap();
        assert_eq!(plan.len(), 2);

        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            assert_eq!(message.meta.correlation_id.as_deref(), Some("bc-sandbox"));
            events.push(message.event);
        }
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], AppEvent::Plan(PlanEvent::Started { packages: 2, .. })));
        assert!(matches!(
            events[3],
            AppEvent::Plan(PlanEvent::Built {
                total: 2,
                new_installs: 1,
                skips: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_executor_emits_abort_event() {
        let (tx, mut rx) = appctl_events::channel();
        let packages = vec![pkg("a", "A", "1.0"), pkg("b", "B", "1.0")];
        let plan = build_plan(&packages, &[], &packages, &PlanOptions::default()).unwrap();
        let mut publisher = FakePublisher::failing(&["A"]);
        Executor::new(ExecuteOptions::default())
            .with_event_sender(tx)
            .execute(&target(), &plan, &mut publisher, &mut AbortOnFirstFailure);

        let mut aborted = None;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Execute(ExecuteEvent::Aborted { position, remaining }) = message.event
            {
                aborted = Some((position, remaining));
            }
        }
        assert_eq!(aborted, Some((0, 1)));
    }

    struct MapReader(HashMap<PathBuf, AppPackage>);

    impl PackageReader for MapReader {
        fn read_package(&self, path: &Path) -> appctl_errors::Result<AppPackage> {
            self.0.get(path).cloned().ok_or_else(|| {
                PackageError::NotFound {
                    path: path.display().to_string(),
                }
                .into()
            })
        }
    }

    struct FixedQuery(Vec<InstalledApp>);

    impl EnvironmentQuery for FixedQuery {
        fn installed_apps(&self, _target: &Target) -> appctl_errors::Result<Vec<InstalledApp>> {
            Ok(self.0.clone())
        }
    }

    fn reader() -> MapReader {
        MapReader(HashMap::from([
            (
                PathBuf::from("ext.app"),
                pkg("ext", "Extension", "2.0").with_dependency("base"),
            ),
            (PathBuf::from("base.app"), pkg("base", "Base", "1.0")),
        ]))
    }

    #[test]
    fn test_install_planner_prepare_and_run() {
        let planner = InstallPlanner::new(
            reader(),
            FixedQuery(vec![installed("ext", "Extension", "1.0")]),
            DeclaredDependencySorter,
        );
        let plan = planner
            .prepare(&target(), &["ext.app", "base.app"])
            .unwrap();

        let names: Vec<&str> = plan.iter().map(|e| e.package.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Extension"]);
        assert_eq!(plan[1].action, PlanAction::Upgrade);
        assert_eq!(plan[1].package.path, Some(PathBuf::from("ext.app")));

        let mut publisher = FakePublisher::default();
        let summary = planner.run(&target(), &plan, &mut publisher, &mut AlwaysContinue);
        assert_eq!(summary.new_installs, 1);
        assert_eq!(summary.upgrades, 1);
        assert_eq!(summary.superseded_removed, 1);
    }

    #[test]
    fn test_install_planner_missing_file() {
        let planner = InstallPlanner::new(reader(), FixedQuery(Vec::new()), DeclaredDependencySorter);
        let err = planner.prepare(&target(), &["missing.app"]).unwrap_err();
        assert!(matches!(err, Error::Package(PackageError::NotFound { .. })));
    }

    #[test]
    fn test_install_planner_keep_superseded() {
        let planner = InstallPlanner::new(
            reader(),
            FixedQuery(vec![installed("ext", "Extension", "1.0")]),
            DeclaredDependencySorter,
        )
        .with_execute_options(ExecuteOptions {
            unpublish_superseded: false,
        });
        let plan = planner.prepare(&target(), &["ext.app"]).unwrap();
        let mut publisher = FakePublisher::default();
        let summary = planner.run(&target(), &plan, &mut publisher, &mut AlwaysContinue);
        assert_eq!(summary.upgrades, 1);
        assert!(publisher.unpublishes().is_empty());
    }

    fn version_strategy() -> impl Strategy<Value = AppVersion> {
        (0u32..5, 0u32..5, 0u32..3, 0u32..3)
            .prop_map(|(a, b, c, d)| AppVersion::new(a, b, c, d))
    }

    proptest! {
        #[test]
        fn prop_classification_matches_ordering(
            candidate in version_strategy(),
            existing in version_strategy(),
        ) {
            let package = AppPackage::new("x", "X", "P", candidate);
            let current = InstalledApp::new("x", "X", "P", existing);
            let action = classify(&package, Some(&current));
            let expected = match candidate.cmp(&existing) {
                std::cmp::Ordering::Greater => PlanAction::Upgrade,
                std::cmp::Ordering::Equal => PlanAction::Skip,
                std::cmp::Ordering::Less => PlanAction::Downgrade,
            };
            prop_assert_eq!(action, expected);
            prop_assert_eq!(classify(&package, None), PlanAction::NewInstall);
        }

        #[test]
        fn prop_plan_preserves_order(seed in proptest::collection::vec(0usize..100, 1..8)) {
            let packages: Vec<AppPackage> = (0..seed.len())
                .map(|i| pkg(&format!("app{i}"), &format!("App{i}"), "1.0"))
                .collect();
            let mut order = packages.clone();
            // Deterministic shuffle driven by the seed
            let mut keyed: Vec<(usize, AppPackage)> =
                seed.iter().copied().zip(order.drain(..)).collect();
            keyed.sort_by_key(|(key, _)| *key);
            let order: Vec<AppPackage> = keyed.into_iter().map(|(_, p)| p).collect();

            let first = build_plan(&packages, &[], &order, &PlanOptions::default()).unwrap();
            let second = build_plan(&packages, &[], &order, &PlanOptions::default()).unwrap();
            prop_assert_eq!(&first, &second);
            let planned: Vec<&AppPackage> = first.iter().map(|e| &e.package).collect();
            let expected: Vec<&AppPackage> = order.iter().collect();
            prop_assert_eq!(planned, expected);
        }
    }
}
