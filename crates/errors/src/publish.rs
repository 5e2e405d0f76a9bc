//! Publish and unpublish error types
//!
//! These are recorded per entry in an execution summary; the executor never
//! propagates them.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PublishError {
    #[error("signature verification failed for {app}: {message}")]
    SignatureVerification { app: String, message: String },

    #[error("version conflict for {app}: {message}")]
    VersionConflict { app: String, message: String },

    #[error("target environment {target} is unavailable: {message}")]
    EnvironmentUnavailable { target: String, message: String },

    #[error("command `{command}` failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to launch `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("publish failed for {app}: {message}")]
    Failed { app: String, message: String },
}

impl UserFacingError for PublishError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SignatureVerification { .. } => {
                Some("Sign the app or allow unsigned apps in the target environment.")
            }
            Self::VersionConflict { .. } => {
                Some("Check which version is installed in the target before retrying.")
            }
            Self::EnvironmentUnavailable { .. } => {
                Some("Make sure the container is running and reachable.")
            }
            Self::SpawnFailed { .. } => {
                Some("Check the configured publish/unpublish command in the [commands] section.")
            }
            Self::CommandFailed { .. } | Self::Failed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::EnvironmentUnavailable { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SignatureVerification { .. } => "publish.signature_verification",
            Self::VersionConflict { .. } => "publish.version_conflict",
            Self::EnvironmentUnavailable { .. } => "publish.environment_unavailable",
            Self::CommandFailed { .. } => "publish.command_failed",
            Self::SpawnFailed { .. } => "publish.spawn_failed",
            Self::Failed { .. } => "publish.failed",
        };
        Some(code)
    }
}
