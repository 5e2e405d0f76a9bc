//! CLI error handling

use std::fmt;

use appctl_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Planning, config, or package error from the library crates
    Ops(appctl_errors::Error),
    /// Plan contains downgrades and `--allow-downgrade` was not given
    DowngradeRefused(Vec<String>),
    /// User declined the confirmation prompt
    Declined,
    /// One or more entries failed; the summary has already been rendered
    Incomplete { failed: usize, aborted: bool },
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::DowngradeRefused(apps) => {
                write!(f, "plan downgrades {}", apps.join(", "))?;
                write!(f, "\n  Hint: pass --allow-downgrade to install older versions.")
            }
            CliError::Declined => write!(f, "installation cancelled"),
            CliError::Incomplete { failed, aborted } => {
                write!(f, "{failed} package(s) failed to publish")?;
                if *aborted {
                    write!(f, "; remaining packages were not attempted")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<appctl_errors::Error> for CliError {
    fn from(e: appctl_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<appctl_errors::PackageError> for CliError {
    fn from(e: appctl_errors::PackageError) -> Self {
        CliError::Ops(e.into())
    }
}

impl From<appctl_errors::ConfigError> for CliError {
    fn from(e: appctl_errors::ConfigError) -> Self {
        CliError::Ops(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
