//! Version parsing and comparison error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("invalid version component '{component}' in {input}")]
    InvalidComponent { input: String, component: String },

    #[error("version {input} has {count} components, expected 2 to 4")]
    ComponentCount { input: String, count: usize },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("Use numeric versions like 1.0, 22.3.1 or 22.3.1.4 (major.minor[.build[.revision]]).")
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::InvalidComponent { .. } => "version.invalid_component",
            Self::ComponentCount { .. } => "version.component_count",
        };
        Some(code)
    }
}
