//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use appctl_events::{AppEvent, EventMessage, ExecuteEvent, GeneralEvent, PlanEvent};
use console::{style, Term};

/// Turns library events into progress lines on stderr
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
    quiet: bool,
    term: Term,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            quiet,
            term: Term::stderr(),
        }
    }

    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);

        if self.quiet {
            return;
        }

        match message.event {
            AppEvent::General(event) => self.handle_general(event),
            AppEvent::Plan(event) => self.handle_plan(event),
            AppEvent::Execute(event) => self.handle_execute(event),
        }
    }

    fn handle_general(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message} ({context})")),
                None => self.show_warning(&message),
            },
            GeneralEvent::Error { message, details } => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
            GeneralEvent::DebugLog { message, .. } => {
                if self.debug_enabled {
                    self.show_line(&format!("debug: {message}"));
                }
            }
            GeneralEvent::OperationFailed { operation, failure } => {
                self.show_error(&format!("{operation} failed: {}", failure.message));
            }
            GeneralEvent::OperationStarted { .. } | GeneralEvent::OperationCompleted { .. } => {}
        }
    }

    fn handle_plan(&self, event: PlanEvent) {
        match event {
            PlanEvent::Started {
                target,
                packages,
                installed,
            } => self.show_line(&format!(
                "Planning {packages} package(s) against {target} ({installed} installed)"
            )),
            PlanEvent::Built {
                new_installs,
                upgrades,
                downgrades,
                skips,
                ..
            } => {
                self.show_line(&format!(
                    "Plan ready: {new_installs} new, {upgrades} upgrade(s), {downgrades} downgrade(s), {skips} unchanged"
                ));
                if downgrades > 0 {
                    self.show_warning("plan contains downgrades");
                }
            }
            PlanEvent::Failed { failure } => self.show_error(&failure.message),
            PlanEvent::EntryClassified { .. } => {}
        }
    }

    fn handle_execute(&self, event: ExecuteEvent) {
        match event {
            ExecuteEvent::EntryStarted {
                position,
                name,
                version,
                action,
            } => self.show_line(&format!("[{}] {action}: {name} {version}", position + 1)),
            ExecuteEvent::EntrySucceeded { name, version, .. } => {
                self.show_success(&format!("Published {name} {version}"));
            }
            ExecuteEvent::EntrySkipped { name, version, .. } => {
                self.show_line(&format!("{name} {version} is already installed"));
            }
            ExecuteEvent::EntryFailed {
                name,
                version,
                failure,
                ..
            } => self.show_error(&format!("{name} {version}: {}", failure.message)),
            ExecuteEvent::Aborted { remaining, .. } => {
                self.show_warning(&format!("stopping; {remaining} package(s) not attempted"));
            }
            ExecuteEvent::SupersededRemoved {
                name,
                publisher,
                version,
            } => self.show_line(&format!("Removed superseded {name} {version} ({publisher})")),
            ExecuteEvent::SupersededRemoveFailed {
                name,
                version,
                failure,
                ..
            } => self.show_warning(&format!(
                "could not remove superseded {name} {version}: {}",
                failure.message
            )),
            ExecuteEvent::Started { .. }
            | ExecuteEvent::SupersededQueued { .. }
            | ExecuteEvent::Completed { .. } => {}
        }
    }

    fn show_line(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_success(&self, message: &str) {
        if self.colors_enabled {
            self.show_line(&style(message).green().to_string());
        } else {
            self.show_line(message);
        }
    }

    fn show_warning(&self, message: &str) {
        let line = format!("warning: {message}");
        if self.colors_enabled {
            self.show_line(&style(line).yellow().to_string());
        } else {
            self.show_line(&line);
        }
    }

    fn show_error(&self, message: &str) {
        let line = format!("error: {message}");
        if self.colors_enabled {
            self.show_line(&style(line).red().to_string());
        } else {
            self.show_line(&line);
        }
    }
}
