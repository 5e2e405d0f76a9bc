//! App identity and environment snapshot types

use crate::AppVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable identifier of an app, independent of its version
///
/// App ids are GUIDs in practice and are compared case-insensitively, so the
/// stored form is always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AppId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<AppId> for String {
    fn from(id: AppId) -> Self {
        id.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The environment (container) the planner acts on
///
/// Passed explicitly to every environment-facing call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate app to install, read from a package file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppPackage {
    pub app_id: AppId,
    pub name: String,
    pub publisher: String,
    pub version: AppVersion,
    /// File the package was read from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// App ids this package declares as dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<AppId>,
}

impl AppPackage {
    pub fn new(
        app_id: impl Into<AppId>,
        name: impl Into<String>,
        publisher: impl Into<String>,
        version: AppVersion,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            name: name.into(),
            publisher: publisher.into(),
            version,
            path: None,
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, app_id: impl Into<AppId>) -> Self {
        self.dependencies.push(app_id.into());
        self
    }

    /// Whether two packages describe the same release of the same app
    #[must_use]
    pub fn same_release(&self, other: &Self) -> bool {
        self.app_id == other.app_id
            && self.version == other.version
            && self.name == other.name
            && self.publisher == other.publisher
    }
}

impl fmt::Display for AppPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.publisher)
    }
}

/// One row of the target environment's app list
///
/// Field names follow the container module's JSON output (`AppId`,
/// `IsInstalled`, ...); snake_case aliases are accepted for hand-written
/// snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstalledApp {
    #[serde(alias = "app_id")]
    pub app_id: AppId,
    #[serde(alias = "name")]
    pub name: String,
    #[serde(alias = "publisher")]
    pub publisher: String,
    #[serde(alias = "version")]
    pub version: AppVersion,
    #[serde(alias = "is_installed", default = "default_true")]
    pub is_installed: bool,
    #[serde(alias = "is_published", default = "default_true")]
    pub is_published: bool,
}

impl InstalledApp {
    pub fn new(
        app_id: impl Into<AppId>,
        name: impl Into<String>,
        publisher: impl Into<String>,
        version: AppVersion,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            name: name.into(),
            publisher: publisher.into(),
            version,
            is_installed: true,
            is_published: true,
        }
    }

    /// Mark the app as published but not installed
    #[must_use]
    pub fn published_only(mut self) -> Self {
        self.is_installed = false;
        self
    }
}

fn default_true() -> bool {
    true
}

/// An older release scheduled for removal after its successor was published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededApp {
    pub app_id: AppId,
    pub name: String,
    pub publisher: String,
    pub version: AppVersion,
}

impl From<&InstalledApp> for SupersededApp {
    fn from(app: &InstalledApp) -> Self {
        Self {
            app_id: app.app_id.clone(),
            name: app.name.clone(),
            publisher: app.publisher.clone(),
            version: app.version,
        }
    }
}

impl fmt::Display for SupersededApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.publisher)
    }
}
