#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for appctl
//!
//! This crate provides the fundamental types shared by the planner, the
//! configuration layer and the CLI: app versions, app identity, installed
//! snapshots, plan entries and execution reports.

pub mod app;
pub mod plan;
pub mod reports;
pub mod version;

// Re-export commonly used types
pub use app::{AppId, AppPackage, InstalledApp, SupersededApp, Target};
pub use plan::{ContinueDecision, PlanAction, PlanEntry};
pub use reports::{
    EntryOutcome, EntryReport, ExecutionSummary, SupersededRecord, SupersededState,
};
pub use version::AppVersion;

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Tty,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Tty
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}

/// How the planner treats two packages with the same app id in one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse to build a plan
    #[default]
    Reject,
    /// Plan each package on its own
    Independent,
}

/// What to do after a publish fails, when no interactive policy is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Continue,
    Abort,
}
