//! appctl - batch app installs for a target environment
//!
//! Reads a batch manifest, plans it against what the target already has,
//! and publishes the plan through the configured external commands.

mod batch;
mod cli;
mod display;
mod error;
mod events;
mod logging;
mod process;

use crate::batch::{Batch, FixedSnapshot};
use crate::cli::{Cli, Commands};
use crate::display::{has_work, CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use crate::process::{CommandPublisher, CommandQuery, CommandTemplate};
use appctl_config::Config;
use appctl_errors::ConfigError;
use appctl_events::{EventReceiver, EventSender};
use appctl_planner::{
    policy_for, DeclaredDependencySorter, EnvironmentQuery, ExecuteOptions, InstallPlanner,
    PlanOptions,
};
use appctl_types::{
    ColorChoice, FailureMode, InstalledApp, OutputFormat, PlanAction, PlanEntry, Target,
};
use clap::Parser;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::PathBuf;
use tokio::select;
use tracing::{error, info, warn};

type BatchPlanner = InstallPlanner<Batch, Environment, DeclaredDependencySorter>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting appctl v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment, then flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);

    let format = if cli.global.json {
        OutputFormat::Json
    } else {
        config.general.default_output
    };
    let renderer = OutputRenderer::new(format, config.general.color);
    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, renderer.is_json());

    let (event_sender, mut event_receiver) = appctl_events::channel();

    let result = match cli.command {
        Commands::Plan { batch } => {
            let (_, target, entries) = prepare(
                &config,
                cli.global.target,
                batch,
                event_sender.clone(),
                &mut event_receiver,
                &mut event_handler,
            )
            .await?;
            CommandResult::Plan {
                target: target.to_string(),
                entries,
            }
        }
        Commands::Install { batch, yes, .. } => {
            let publisher = build_publisher(&config)?;
            let (planner, target, plan) = prepare(
                &config,
                cli.global.target,
                batch,
                event_sender.clone(),
                &mut event_receiver,
                &mut event_handler,
            )
            .await?;

            check_downgrades(&plan, config.planner.allow_downgrade)?;

            if !renderer.is_json() {
                renderer.render_plan(target.name(), &plan)?;
                println!();
            }
            if has_work(&plan) && !yes {
                confirm(renderer.is_json())?;
            }

            let mode = config.planner.on_failure;
            let (target, summary) = run_with_events(
                move || {
                    let mut publisher = publisher;
                    let mut policy = policy_for(mode);
                    let summary = planner.run(&target, &plan, &mut publisher, &mut *policy);
                    Ok((target, summary))
                },
                &mut event_receiver,
                &mut event_handler,
            )
            .await?;

            let failed = summary.failed;
            let aborted = summary.aborted;
            renderer.render_result(&CommandResult::Install {
                target: target.to_string(),
                summary,
            })?;

            if failed > 0 {
                return Err(CliError::Incomplete { failed, aborted });
            }
            info!("Command completed successfully");
            return Ok(());
        }
    };

    renderer.render_result(&result)?;
    info!("Command completed successfully");
    Ok(())
}

/// Load the batch, resolve the target, and build the plan off the async runtime
async fn prepare(
    config: &Config,
    target_flag: Option<String>,
    batch_path: PathBuf,
    event_sender: EventSender,
    receiver: &mut EventReceiver,
    handler: &mut EventHandler,
) -> Result<(BatchPlanner, Target, Vec<PlanEntry>), CliError> {
    let batch = Batch::load(&batch_path).await?;
    let target = resolve_target(target_flag, &batch, config)?;
    let environment = Environment::for_batch(&batch, config)?;
    let paths = batch.package_paths();

    let planner = InstallPlanner::new(batch, environment, DeclaredDependencySorter)
        .with_event_sender(event_sender)
        .with_plan_options(PlanOptions {
            duplicates: config.planner.duplicate_app_ids,
        })
        .with_execute_options(ExecuteOptions {
            unpublish_superseded: config.planner.unpublish_superseded,
        });

    run_with_events(
        move || {
            let plan = planner.prepare(&target, &paths)?;
            Ok((planner, target, plan))
        },
        receiver,
        handler,
    )
    .await
}

/// Run blocking work while draining events onto the terminal
async fn run_with_events<T, F>(
    work: F,
    receiver: &mut EventReceiver,
    handler: &mut EventHandler,
) -> Result<T, CliError>
where
    F: FnOnce() -> Result<T, CliError> + Send + 'static,
    T: Send + 'static,
{
    let mut task = tokio::task::spawn_blocking(work);

    loop {
        select! {
            joined = &mut task => {
                // Drain any remaining events
                while let Ok(event) = receiver.try_recv() {
                    handler.handle_event(event);
                }
                return joined.map_err(|e| {
                    CliError::Ops(appctl_errors::Error::internal(e.to_string()))
                })?;
            }

            event = receiver.recv() => {
                if let Some(event) = event {
                    handler.handle_event(event);
                }
            }
        }
    }
}

/// Where the installed-app snapshot comes from
#[derive(Debug)]
enum Environment {
    Snapshot(FixedSnapshot),
    Command(CommandQuery),
}

impl Environment {
    fn for_batch(batch: &Batch, config: &Config) -> Result<Self, CliError> {
        if let Some(installed) = batch.installed() {
            return Ok(Self::Snapshot(FixedSnapshot(installed.to_vec())));
        }
        match CommandTemplate::new(config.commands.query.clone()) {
            Some(template) => Ok(Self::Command(CommandQuery::new(template))),
            None => Err(ConfigError::MissingField {
                field: "commands.query".to_string(),
            }
            .into()),
        }
    }
}

impl EnvironmentQuery for Environment {
    fn installed_apps(&self, target: &Target) -> appctl_errors::Result<Vec<InstalledApp>> {
        match self {
            Self::Snapshot(snapshot) => snapshot.installed_apps(target),
            Self::Command(query) => query.installed_apps(target),
        }
    }
}

/// `--target`, then the batch's own target, then the configured default
fn resolve_target(flag: Option<String>, batch: &Batch, config: &Config) -> Result<Target, CliError> {
    flag.or_else(|| batch.target().map(str::to_string))
        .or_else(|| config.commands.default_target.clone())
        .filter(|name| !name.trim().is_empty())
        .map(Target::new)
        .ok_or_else(|| {
            warn!(batch = %batch.path().display(), "no target configured");
            ConfigError::MissingField {
                field: "target".to_string(),
            }
            .into()
        })
}

fn build_publisher(config: &Config) -> Result<CommandPublisher, CliError> {
    let publish = CommandTemplate::new(config.commands.publish.clone()).ok_or_else(|| {
        ConfigError::MissingField {
            field: "commands.publish".to_string(),
        }
    })?;
    let unpublish = CommandTemplate::new(config.commands.unpublish.clone());
    if unpublish.is_none() && config.planner.unpublish_superseded {
        warn!("no unpublish command configured; superseded releases will be reported as not removed");
    }
    Ok(CommandPublisher::new(publish, unpublish))
}

fn check_downgrades(plan: &[PlanEntry], allowed: bool) -> Result<(), CliError> {
    if allowed {
        return Ok(());
    }
    let downgrades: Vec<String> = plan
        .iter()
        .filter(|entry| entry.action == PlanAction::Downgrade)
        .map(ToString::to_string)
        .collect();
    if downgrades.is_empty() {
        Ok(())
    } else {
        Err(CliError::DowngradeRefused(downgrades))
    }
}

fn confirm(json_mode: bool) -> Result<(), CliError> {
    if json_mode || !Term::stderr().is_term() {
        return Err(CliError::InvalidArguments(
            "confirmation required; pass --yes to install without a prompt".to_string(),
        ));
    }
    let proceed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Proceed with installation?")
        .default(false)
        .interact()
        .map_err(|e| {
            CliError::Ops(appctl_errors::Error::internal(format!(
                "Failed to get user confirmation: {e}"
            )))
        })?;
    if proceed {
        Ok(())
    } else {
        Err(CliError::Declined)
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Commands::Install {
        keep_superseded,
        abort_on_failure,
        allow_downgrade,
        ..
    } = command
    {
        if *keep_superseded {
            config.planner.unpublish_superseded = false;
        }
        if *abort_on_failure {
            config.planner.on_failure = FailureMode::Abort;
        }
        if *allow_downgrade {
            config.planner.allow_downgrade = true;
        }
    }
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("appctl")
        .join("logs")
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let default_filter = if debug_enabled {
        "info,appctl=debug,appctl_planner=debug"
    } else {
        "warn"
    };
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter))
    };

    if debug_enabled {
        // Structured JSON logs to file
        let dir = log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }
        let log_file = dir.join(format!(
            "appctl-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(env_filter())
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // Keep stdout and stderr clean for JSON consumers
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter())
            .init();
    }
}
