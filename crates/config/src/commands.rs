//! External command templates
//!
//! Each command is an argv list. Arguments may contain placeholders that are
//! substituted per call: `{target}`, `{path}`, `{app_id}`, `{name}`,
//! `{publisher}`, `{version}` and `{upgrade}` (`true`/`false`).

use serde::{Deserialize, Serialize};

/// `[commands]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Container used when `--target` is not given
    #[serde(default)]
    pub default_target: Option<String>,
    /// Publishes one app file into the target
    #[serde(default)]
    pub publish: Vec<String>,
    /// Removes one app release from the target
    #[serde(default)]
    pub unpublish: Vec<String>,
    /// Prints the target's installed apps as JSON on stdout
    #[serde(default)]
    pub query: Vec<String>,
}
