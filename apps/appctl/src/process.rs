//! External commands that talk to the target environment
//!
//! appctl does not speak to containers itself. Publishing, unpublishing, and
//! listing installed apps are delegated to argv templates from the
//! `[commands]` config section.

use appctl_errors::{Error, PackageError, PublishError};
use appctl_planner::{EnvironmentQuery, Publisher};
use appctl_types::{AppPackage, AppVersion, InstalledApp, Target};
use std::process::{Command, Output};

/// Values substituted into a command template
#[derive(Debug, Default)]
pub struct Placeholders<'a> {
    pub target: &'a str,
    pub path: Option<String>,
    pub app_id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub publisher: Option<&'a str>,
    pub version: Option<String>,
    pub upgrade: Option<bool>,
}

impl Placeholders<'_> {
    fn value(&self, key: &str) -> Option<String> {
        match key {
            "target" => Some(self.target.to_string()),
            "path" => self.path.clone(),
            "app_id" => self.app_id.map(str::to_string),
            "name" => self.name.map(str::to_string),
            "publisher" => self.publisher.map(str::to_string),
            "version" => self.version.clone(),
            "upgrade" => self.upgrade.map(|upgrade| upgrade.to_string()),
            _ => None,
        }
    }

    /// Expand `{key}` tokens in one pass; substituted values are never rescanned
    fn substitute(&self, arg: &str) -> String {
        let mut out = String::with_capacity(arg.len());
        let mut rest = arg;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let token = &rest[open..];
            let expanded = token
                .find('}')
                .and_then(|close| self.value(&token[1..close]).map(|value| (close, value)));
            match expanded {
                Some((close, value)) => {
                    out.push_str(&value);
                    rest = &token[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = &token[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// An argv list with `{placeholder}` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    /// Returns `None` for an empty argv
    #[must_use]
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(Self { argv })
        }
    }

    #[must_use]
    pub fn render(&self, values: &Placeholders<'_>) -> Vec<String> {
        self.argv.iter().map(|arg| values.substitute(arg)).collect()
    }

    /// Render and run to completion, capturing output
    fn run(&self, values: &Placeholders<'_>) -> Result<(String, Output), PublishError> {
        let argv = self.render(values);
        let command_line = argv.join(" ");
        let (program, args) = argv.split_first().ok_or_else(|| PublishError::SpawnFailed {
            command: command_line.clone(),
            message: "empty command".to_string(),
        })?;

        tracing::debug!(command = %command_line, "running command");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| PublishError::SpawnFailed {
                command: command_line.clone(),
                message: e.to_string(),
            })?;
        Ok((command_line, output))
    }
}

/// Map a failed command to the most specific publish error
fn classify_failure(target: &Target, app: &str, command: String, output: &Output) -> PublishError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let lower = stderr.to_ascii_lowercase();

    if lower.contains("signature") || lower.contains("not signed") {
        PublishError::SignatureVerification {
            app: app.to_string(),
            message: stderr,
        }
    } else if lower.contains("version conflict") || lower.contains("already published") {
        PublishError::VersionConflict {
            app: app.to_string(),
            message: stderr,
        }
    } else if ["not running", "cannot connect", "no such container"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        PublishError::EnvironmentUnavailable {
            target: target.to_string(),
            message: stderr,
        }
    } else {
        PublishError::CommandFailed {
            command,
            // Killed by a signal
            status: output.status.code().unwrap_or(-1),
            stderr,
        }
    }
}

/// Publisher backed by the configured publish / unpublish commands
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    publish: CommandTemplate,
    unpublish: Option<CommandTemplate>,
}

impl CommandPublisher {
    #[must_use]
    pub fn new(publish: CommandTemplate, unpublish: Option<CommandTemplate>) -> Self {
        Self { publish, unpublish }
    }
}

impl Publisher for CommandPublisher {
    fn publish(
        &mut self,
        target: &Target,
        package: &AppPackage,
        is_upgrade: bool,
    ) -> Result<(), PublishError> {
        let values = Placeholders {
            target: target.name(),
            path: package.path.as_ref().map(|p| p.display().to_string()),
            app_id: Some(package.app_id.as_str()),
            name: Some(&package.name),
            publisher: Some(&package.publisher),
            version: Some(package.version.to_string()),
            upgrade: Some(is_upgrade),
        };
        let (command, output) = self.publish.run(&values)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(classify_failure(target, &package.name, command, &output))
        }
    }

    fn unpublish(
        &mut self,
        target: &Target,
        name: &str,
        publisher: &str,
        version: &AppVersion,
    ) -> Result<(), PublishError> {
        let Some(template) = &self.unpublish else {
            return Err(PublishError::Failed {
                app: name.to_string(),
                message: "no unpublish command configured".to_string(),
            });
        };
        let values = Placeholders {
            target: target.name(),
            name: Some(name),
            publisher: Some(publisher),
            version: Some(version.to_string()),
            ..Placeholders::default()
        };
        let (command, output) = template.run(&values)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(classify_failure(target, name, command, &output))
        }
    }
}

/// Environment query backed by the configured query command
///
/// The command must print the installed apps as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandQuery {
    template: CommandTemplate,
}

impl CommandQuery {
    #[must_use]
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

impl EnvironmentQuery for CommandQuery {
    fn installed_apps(&self, target: &Target) -> Result<Vec<InstalledApp>, Error> {
        let values = Placeholders {
            target: target.name(),
            ..Placeholders::default()
        };
        let query_failed = |message: String| PackageError::QueryFailed {
            target: target.to_string(),
            message,
        };

        let (command, output) = self
            .template
            .run(&values)
            .map_err(|e| query_failed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(query_failed(format!("`{command}` failed: {}", stderr.trim())).into());
        }

        crate::batch::parse_snapshot(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appctl_errors::UserFacingError;

    fn template(args: &[&str]) -> CommandTemplate {
        CommandTemplate::new(args.iter().map(ToString::to_string).collect()).unwrap()
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(CommandTemplate::new(Vec::new()).is_none());
    }

    #[test]
    fn test_render_placeholders() {
        let t = template(&["publish", "--container={target}", "{path}", "{upgrade}", "{x}"]);
        let values = Placeholders {
            target: "bc",
            path: Some("/apps/a.app".into()),
            upgrade: Some(true),
            ..Placeholders::default()
        };
        assert_eq!(
            t.render(&values),
            vec!["publish", "--container=bc", "/apps/a.app", "true", "{x}"]
        );
    }

    #[test]
    fn test_substituted_values_are_not_expanded_again() {
        let t = template(&["{name}", "--path={path}", "{version}"]);
        let values = Placeholders {
            target: "bc",
            path: Some("/apps/{target}.app".into()),
            name: Some("Sales {version}"),
            version: Some("1.0".into()),
            ..Placeholders::default()
        };
        assert_eq!(
            t.render(&values),
            vec!["Sales {version}", "--path=/apps/{target}.app", "1.0"]
        );
    }

    #[test]
    fn test_unset_and_unbalanced_placeholders_kept() {
        let t = template(&["{path}", "{{target}}", "{target"]);
        let values = Placeholders {
            target: "bc",
            ..Placeholders::default()
        };
        assert_eq!(t.render(&values), vec!["{path}", "{bc}", "{target"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_failure_maps_environment_marker() {
        let mut publisher = CommandPublisher::new(
            template(&["sh", "-c", "echo 'Error: No such container: bc' >&2; exit 1"]),
            None,
        );
        let package = AppPackage::new("a", "A", "Contoso", AppVersion::new(1, 0, 0, 0));
        let err = publisher
            .publish(&Target::new("bc"), &package, false)
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::EnvironmentUnavailable { ref target, .. } if target == "bc"
        ));
        assert!(err.is_retryable());
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_failure_maps_signature_marker() {
        let mut publisher = CommandPublisher::new(
            template(&["sh", "-c", "echo 'The app is not signed' >&2; exit 3"]),
            None,
        );
        let package = AppPackage::new("a", "A", "Contoso", AppVersion::new(1, 0, 0, 0));
        let err = publisher
            .publish(&Target::new("bc"), &package, false)
            .unwrap_err();
        assert!(matches!(err, PublishError::SignatureVerification { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_failure_keeps_status_and_stderr() {
        let mut publisher =
            CommandPublisher::new(template(&["sh", "-c", "echo boom >&2; exit 4"]), None);
        let package = AppPackage::new("a", "A", "Contoso", AppVersion::new(1, 0, 0, 0));
        let err = publisher
            .publish(&Target::new("bc"), &package, false)
            .unwrap_err();
        assert_eq!(
            err,
            PublishError::CommandFailed {
                command: "sh -c echo boom >&2; exit 4".into(),
                status: 4,
                stderr: "boom".into(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_query_parses_stdout() {
        let query = CommandQuery::new(template(&[
            "sh",
            "-c",
            r#"echo '[{"AppId":"a","Name":"A","Publisher":"P","Version":"1.0"}]'"#,
        ]));
        let apps = query.installed_apps(&Target::new("bc")).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "A");
    }

    #[cfg(unix)]
    #[test]
    fn test_query_blank_stdout_is_empty_snapshot() {
        let query = CommandQuery::new(template(&["sh", "-c", "true"]));
        let apps = query.installed_apps(&Target::new("bc")).unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn test_missing_unpublish_command() {
        let mut publisher = CommandPublisher::new(template(&["true"]), None);
        let err = publisher
            .unpublish(&Target::new("bc"), "A", "P", &AppVersion::new(1, 0, 0, 0))
            .unwrap_err();
        assert!(matches!(err, PublishError::Failed { .. }));
    }
}
