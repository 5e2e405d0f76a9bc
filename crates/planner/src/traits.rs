//! Collaborator seams the planner depends on
//!
//! Reading package files, asking an environment what is installed, and
//! deriving an install order all live outside the planner. The CLI provides
//! file and process backed implementations; tests use in-memory fakes.

use appctl_errors::Result;
use appctl_types::{AppPackage, InstalledApp, Target};
use std::path::Path;

/// Extracts package metadata from a package file
pub trait PackageReader {
    /// # Errors
    ///
    /// Returns an error if the file is missing or its metadata is unreadable.
    /// A malformed version string surfaces as a classification error.
    fn read_package(&self, path: &Path) -> Result<AppPackage>;
}

/// Reports the apps currently present on a target
pub trait EnvironmentQuery {
    /// # Errors
    ///
    /// Returns an error if the target cannot be queried.
    fn installed_apps(&self, target: &Target) -> Result<Vec<InstalledApp>>;
}

/// Orders a batch so every package follows the packages it depends on
pub trait DependencySorter {
    /// Returns the same packages, reordered
    ///
    /// # Errors
    ///
    /// Returns an error if no valid order exists.
    fn sort(&self, packages: &[AppPackage]) -> Result<Vec<AppPackage>>;
}
