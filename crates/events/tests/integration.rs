//! Integration tests for events

#[cfg(test)]
mod tests {
    use appctl_events::*;
    use appctl_types::{AppVersion, PlanAction};

    #[tokio::test]
    async fn test_event_sender_emit() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::Error { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Error);
        assert_eq!(first.meta.source, EventSource::GENERAL);

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second.event,
            AppEvent::General(GeneralEvent::DebugLog { .. })
        ));
        assert_eq!(second.meta.level, EventLevel::Debug);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_execute_event_levels() {
        let failed = AppEvent::Execute(ExecuteEvent::EntryFailed {
            position: 1,
            name: "B".into(),
            version: AppVersion::new(1, 5, 0, 0),
            action: PlanAction::Upgrade,
            failure: FailureContext::new(None::<String>, "boom", None::<String>, false),
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
        assert_eq!(failed.event_source(), EventSource::EXECUTE);

        let aborted = AppEvent::Execute(ExecuteEvent::Aborted {
            position: 1,
            remaining: 2,
        });
        assert_eq!(aborted.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Plan(PlanEvent::Built {
            total: 3,
            new_installs: 1,
            upgrades: 1,
            downgrades: 0,
            skips: 1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "plan");
        assert_eq!(json["event"]["type"], "Built");
        assert_eq!(json["event"]["total"], 3);
    }

    #[tokio::test]
    async fn test_correlated_emit() {
        let (tx, mut rx) = channel();
        tx.emit_plan(
            "bcdev",
            PlanEvent::Started {
                target: "bcdev".into(),
                packages: 2,
                installed: 5,
            },
        );

        let message = rx.recv().await.unwrap();
        assert_eq!(message.meta.correlation_id.as_deref(), Some("bcdev"));
        assert_eq!(message.meta.source, EventSource::PLAN);
        assert_eq!(message.meta.level, EventLevel::Info);
    }
}
