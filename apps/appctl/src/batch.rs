//! Batch manifests
//!
//! A batch is a TOML file naming the package files to install and, when the
//! target cannot be queried directly, a snapshot of what it already has:
//!
//! ```toml
//! target = "bc-sandbox"
//! snapshot = "installed.json"
//!
//! [[package]]
//! path = "Contoso_Sales_1.5.0.0.app"
//! id = "437dbf0e-84ff-417a-965d-ed2bb9650972"
//! name = "Sales"
//! publisher = "Contoso"
//! version = "1.5.0.0"
//! dependencies = ["63ca2fa4-4f03-4f2b-a480-172fef340d3f"]
//! ```
//!
//! Snapshot rows can also be given inline as `[[installed]]` tables. Package
//! paths and the snapshot path are relative to the manifest's directory.

use appctl_errors::{Error, PackageError, PlanError};
use appctl_planner::{parse_version, EnvironmentQuery, PackageReader};
use appctl_types::{AppId, AppPackage, InstalledApp, Target};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    snapshot: Option<PathBuf>,
    #[serde(default, rename = "package")]
    packages: Vec<RawPackage>,
    #[serde(default)]
    installed: Option<Vec<RawInstalled>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackage {
    path: PathBuf,
    id: String,
    name: String,
    publisher: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// One snapshot row; accepts the PascalCase keys container tooling prints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawInstalled {
    #[serde(alias = "app_id")]
    app_id: String,
    #[serde(alias = "name")]
    name: String,
    #[serde(alias = "publisher")]
    publisher: String,
    #[serde(alias = "version")]
    version: String,
    #[serde(alias = "is_installed", default = "default_true")]
    is_installed: bool,
    #[serde(alias = "is_published", default = "default_true")]
    is_published: bool,
}

fn default_true() -> bool {
    true
}

impl RawInstalled {
    fn into_installed(self) -> Result<InstalledApp, Error> {
        let version = parse_version(&self.name, &self.version)?;
        Ok(InstalledApp {
            app_id: AppId::new(&self.app_id),
            name: self.name,
            publisher: self.publisher,
            version,
            is_installed: self.is_installed,
            is_published: self.is_published,
        })
    }
}

/// A parsed batch manifest
#[derive(Debug, Clone)]
pub struct Batch {
    path: PathBuf,
    target: Option<String>,
    packages: Vec<AppPackage>,
    installed: Option<Vec<InstalledApp>>,
}

impl Batch {
    /// Read and validate a manifest
    ///
    /// Every version string is parsed here, so a malformed version anywhere
    /// in the batch or its snapshot fails before any planning happens.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::from(PackageError::NotFound {
                    path: path.display().to_string(),
                }),
                _ => Error::io_with_path(&e, path),
            })?;
        let raw: RawManifest = toml::from_str(&contents).map_err(|e| PackageError::InvalidBatch {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if raw.packages.is_empty() {
            return Err(PlanError::NoPackagesSpecified.into());
        }

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let installed = match (raw.snapshot, raw.installed) {
            (Some(_), Some(_)) => {
                return Err(PackageError::InvalidBatch {
                    path: path.display().to_string(),
                    message: "use either `snapshot` or [[installed]], not both".to_string(),
                }
                .into())
            }
            (Some(snapshot), None) => Some(load_snapshot(&base.join(snapshot)).await?),
            (None, Some(rows)) => Some(
                rows.into_iter()
                    .map(RawInstalled::into_installed)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (None, None) => None,
        };

        let packages = raw
            .packages
            .into_iter()
            .map(|package| {
                let version = parse_version(&package.name, &package.version)?;
                let mut app = AppPackage::new(package.id, package.name, package.publisher, version)
                    .with_path(base.join(package.path));
                for dependency in package.dependencies {
                    app = app.with_dependency(dependency);
                }
                Ok(app)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        tracing::debug!(
            path = %path.display(),
            packages = packages.len(),
            snapshot = installed.is_some(),
            "loaded batch manifest"
        );

        Ok(Self {
            path: path.to_path_buf(),
            target: raw.target,
            packages,
            installed,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Package file paths in manifest order
    #[must_use]
    pub fn package_paths(&self) -> Vec<PathBuf> {
        self.packages
            .iter()
            .filter_map(|package| package.path.clone())
            .collect()
    }

    /// Snapshot carried by the manifest, if any
    #[must_use]
    pub fn installed(&self) -> Option<&[InstalledApp]> {
        self.installed.as_deref()
    }
}

impl PackageReader for Batch {
    fn read_package(&self, path: &Path) -> Result<AppPackage, Error> {
        self.packages
            .iter()
            .find(|package| package.path.as_deref() == Some(path))
            .cloned()
            .ok_or_else(|| {
                PackageError::NotFound {
                    path: path.display().to_string(),
                }
                .into()
            })
    }
}

/// Parse a JSON snapshot: an array of rows, or a single row object
///
/// Blank input and `null` both mean nothing is installed.
pub fn parse_snapshot(json: &str) -> Result<Vec<InstalledApp>, Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| PackageError::InvalidSnapshot {
            message: e.to_string(),
        })?;

    let rows: Vec<RawInstalled> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        serde_json::Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map(|row| vec![row]),
    }
    .map_err(|e| PackageError::InvalidSnapshot {
        message: e.to_string(),
    })?;

    rows.into_iter().map(RawInstalled::into_installed).collect()
}

async fn load_snapshot(path: &Path) -> Result<Vec<InstalledApp>, Error> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PackageError::InvalidSnapshot {
            message: format!("{}: {e}", path.display()),
        })?;
    parse_snapshot(&contents)
}

/// Snapshot that was supplied up front rather than queried
#[derive(Debug, Clone)]
pub struct FixedSnapshot(pub Vec<InstalledApp>);

impl EnvironmentQuery for FixedSnapshot {
    fn installed_apps(&self, _target: &Target) -> Result<Vec<InstalledApp>, Error> {
        Ok(self.0.clone())
    }
}
