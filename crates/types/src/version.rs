//! App version parsing and comparison
//!
//! App versions are dotted numeric tuples: `major.minor[.build[.revision]]`.
//! Comparison is component-wise and numeric, so `10.0` sorts above `9.0`.
//! Missing trailing components compare as zero, which makes `1.0` and
//! `1.0.0.0` the same release.

use appctl_errors::VersionError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const MIN_COMPONENTS: usize = 2;
const MAX_COMPONENTS: usize = 4;

/// A numeric app version with two to four components
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppVersion {
    parts: [u32; MAX_COMPONENTS],
    len: usize,
}

impl AppVersion {
    /// Create a four-component version
    #[must_use]
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            parts: [major, minor, build, revision],
            len: MAX_COMPONENTS,
        }
    }

    /// Parse a version string
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if the string is empty, has fewer than two or
    /// more than four components, or any component is not a non-negative
    /// integer.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::InvalidVersion {
                input: input.to_string(),
            });
        }

        let components: Vec<&str> = trimmed.split('.').collect();
        if !(MIN_COMPONENTS..=MAX_COMPONENTS).contains(&components.len()) {
            return Err(VersionError::ComponentCount {
                input: input.to_string(),
                count: components.len(),
            });
        }

        let mut parts = [0u32; MAX_COMPONENTS];
        for (slot, component) in parts.iter_mut().zip(&components) {
            // u32::from_str accepts a leading '+', which is not a version digit
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::InvalidComponent {
                    input: input.to_string(),
                    component: (*component).to_string(),
                });
            }
            *slot = component
                .parse()
                .map_err(|_| VersionError::InvalidComponent {
                    input: input.to_string(),
                    component: (*component).to_string(),
                })?;
        }

        Ok(Self {
            parts,
            len: components.len(),
        })
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.parts[0]
    }

    #[must_use]
    pub fn minor(&self) -> u32 {
        self.parts[1]
    }

    #[must_use]
    pub fn build(&self) -> u32 {
        self.parts[2]
    }

    #[must_use]
    pub fn revision(&self) -> u32 {
        self.parts[3]
    }

    /// Number of components the version was written with
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.len
    }
}

impl PartialEq for AppVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for AppVersion {}

impl Hash for AppVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<String> = self.parts[..self.len]
            .iter()
            .map(ToString::to_string)
            .collect();
        write!(f, "{}", strs.join("."))
    }
}

impl FromStr for AppVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AppVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AppVersion> for String {
    fn from(version: AppVersion) -> Self {
        version.to_string()
    }
}
