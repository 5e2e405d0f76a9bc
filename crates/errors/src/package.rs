//! Package and snapshot reading error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("package not found: {path}")]
    NotFound { path: String },

    #[error("invalid package {path}: {message}")]
    InvalidPackage { path: String, message: String },

    #[error("invalid batch manifest {path}: {message}")]
    InvalidBatch { path: String, message: String },

    #[error("invalid installed-app snapshot: {message}")]
    InvalidSnapshot { message: String },

    #[error("environment query for {target} failed: {message}")]
    QueryFailed { target: String, message: String },
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Check the package path in the batch manifest."),
            Self::InvalidBatch { .. } => {
                Some("Every [[package]] needs path, id, name, publisher and version.")
            }
            Self::QueryFailed { .. } => {
                Some("Make sure the container is running, or pass the snapshot in the batch file.")
            }
            Self::InvalidPackage { .. } | Self::InvalidSnapshot { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::QueryFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "package.not_found",
            Self::InvalidPackage { .. } => "package.invalid",
            Self::InvalidBatch { .. } => "package.invalid_batch",
            Self::InvalidSnapshot { .. } => "package.invalid_snapshot",
            Self::QueryFailed { .. } => "package.query_failed",
        };
        Some(code)
    }
}
