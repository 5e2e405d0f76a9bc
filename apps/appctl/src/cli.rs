//! Command line interface definition

use appctl_types::ColorChoice;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// appctl - batch app installs for a target environment
#[derive(Parser)]
#[command(name = "appctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan and run batch app installs against a target environment")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the appctl log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Target environment (container) to plan and install against
    #[arg(long, global = true, value_name = "NAME")]
    pub target: Option<String>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show what installing a batch would do, without touching the target
    Plan {
        /// Batch manifest (TOML) listing the packages to install
        #[arg(long, short, value_name = "FILE")]
        batch: PathBuf,
    },

    /// Plan a batch and publish it to the target
    #[command(alias = "i")]
    Install {
        /// Batch manifest (TOML) listing the packages to install
        #[arg(long, short, value_name = "FILE")]
        batch: PathBuf,

        /// Leave superseded releases installed after an upgrade
        #[arg(long)]
        keep_superseded: bool,

        /// Stop at the first failed publish
        #[arg(long)]
        abort_on_failure: bool,

        /// Allow the plan to contain downgrades
        #[arg(long)]
        allow_downgrade: bool,

        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}
