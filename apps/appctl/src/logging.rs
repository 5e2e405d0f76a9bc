//! Structured logging for events
//!
//! Every event that reaches the CLI is also written to the tracing
//! subscriber with structured fields, so `--debug` log files carry the full
//! plan and execution history.

use appctl_events::{AppEvent, EventMessage, ExecuteEvent, PlanEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an event at its own level with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Plan(PlanEvent::EntryClassified {
            position,
            app_id,
            name,
            version,
            existing_version,
            action,
        }) => {
            debug!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                position = position,
                app_id = %app_id,
                app = %name,
                version = %version,
                existing = ?existing_version.map(|v| v.to_string()),
                action = %action,
                "Entry classified"
            );
        }
        AppEvent::Plan(PlanEvent::Failed { failure }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Planning failed"
            );
        }
        AppEvent::Execute(ExecuteEvent::EntryFailed {
            position,
            name,
            version,
            action,
            failure,
        }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                position = position,
                app = %name,
                version = %version,
                action = %action,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Publish failed"
            );
        }
        AppEvent::Execute(ExecuteEvent::SupersededRemoveFailed {
            name,
            publisher,
            version,
            failure,
        }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                app = %name,
                publisher = %publisher,
                version = %version,
                code = ?failure.code,
                message = %failure.message,
                "Superseded release not removed"
            );
        }
        AppEvent::Execute(ExecuteEvent::Completed {
            succeeded,
            failed,
            skipped,
            not_attempted,
            superseded_removed,
            superseded_remove_failed,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                succeeded = succeeded,
                failed = failed,
                skipped = skipped,
                not_attempted = not_attempted,
                superseded_removed = superseded_removed,
                superseded_remove_failed = superseded_remove_failed,
                "Execution completed"
            );
        }
        _ => match meta.tracing_level() {
            tracing::Level::ERROR => {
                error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::WARN => {
                warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::INFO => {
                info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::DEBUG => {
                debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            _ => {
                trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
        },
    }
}
