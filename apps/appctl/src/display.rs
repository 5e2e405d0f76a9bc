//! Output rendering and formatting

use appctl_types::{
    ColorChoice, EntryOutcome, EntryReport, ExecutionSummary, OutputFormat, PlanAction, PlanEntry,
    SupersededState,
};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use serde::Serialize;
use std::io;

/// Result of a command, ready to render
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandResult {
    Plan {
        target: String,
        entries: Vec<PlanEntry>,
    },
    Install {
        target: String,
        summary: ExecutionSummary,
    },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    format: OutputFormat,
    color_choice: ColorChoice,
    term: Term,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat, color_choice: ColorChoice) -> Self {
        Self {
            format,
            color_choice,
            term: Term::stdout(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.is_json() {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Plan { target, entries } => self.render_plan(target, entries),
            CommandResult::Install { target, summary } => self.render_summary(target, summary),
        }
    }

    /// Render a plan before execution
    pub fn render_plan(&self, target: &str, entries: &[PlanEntry]) -> io::Result<()> {
        println!("Plan for {}", self.bold(target));
        println!();

        if self.format == OutputFormat::Plain {
            for (position, entry) in entries.iter().enumerate() {
                println!("{:>3}. {entry}", position + 1);
            }
        } else {
            println!("{}", plan_table(entries, |action| self.action_cell(action)));
        }

        if !has_work(entries) {
            println!();
            println!("Nothing to install.");
        }
        Ok(())
    }


    /// Render the execution summary and per-entry outcomes
    pub fn render_summary(&self, target: &str, summary: &ExecutionSummary) -> io::Result<()> {
        println!("Installation Summary ({})", self.bold(target));
        println!();
        println!("  Total:         {}", summary.total);
        println!(
            "  Succeeded:     {} ({} new, {} upgraded, {} downgraded)",
            summary.succeeded, summary.new_installs, summary.upgrades, summary.downgrades
        );
        println!("  Skipped:       {}", summary.skipped);
        println!("  Failed:        {}", summary.failed);
        if summary.not_attempted > 0 {
            println!("  Not attempted: {}", summary.not_attempted);
        }
        if summary.superseded_removed + summary.superseded_remove_failed > 0 {
            println!(
                "  Superseded:    {} removed, {} failed to remove",
                summary.superseded_removed, summary.superseded_remove_failed
            );
        }
        if summary.aborted {
            println!("  Aborted after first failure.");
        }
        println!();

        if summary.entries.is_empty() {
            return Ok(());
        }

        if self.format == OutputFormat::Plain {
            for report in &summary.entries {
                println!("  {}", outcome_line(report));
            }
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("App").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Action").add_attribute(Attribute::Bold),
            Cell::new("Outcome").add_attribute(Attribute::Bold),
            Cell::new("Superseded").add_attribute(Attribute::Bold),
        ]);

        for report in &summary.entries {
            table.add_row(vec![
                Cell::new(&report.name),
                Cell::new(report.version),
                self.action_cell(report.action),
                self.outcome_cell(&report.outcome),
                Cell::new(superseded_text(report)),
            ]);
        }
        println!("{table}");

        // Errors verbatim, below the table so they are not wrapped
        for report in &summary.entries {
            if let EntryOutcome::Failed(error) = &report.outcome {
                println!("{}: {error}", report.name);
            }
            if let Some(record) = &report.superseded {
                if let SupersededState::RemoveFailed(error) = &record.state {
                    println!("{} (superseded): {error}", record.app);
                }
            }
        }

        Ok(())
    }

    fn action_cell(&self, action: PlanAction) -> Cell {
        let cell = Cell::new(action);
        if !self.supports_color() {
            return cell;
        }
        match action {
            PlanAction::NewInstall => cell.fg(Color::Green),
            PlanAction::Upgrade => cell.fg(Color::Blue),
            PlanAction::Skip => cell,
            PlanAction::Downgrade => cell.fg(Color::Yellow),
        }
    }

    fn outcome_cell(&self, outcome: &EntryOutcome) -> Cell {
        let cell = Cell::new(outcome.label());
        if !self.supports_color() {
            return cell;
        }
        match outcome {
            EntryOutcome::Succeeded => cell.fg(Color::Green),
            EntryOutcome::Failed(_) => cell.fg(Color::Red),
            EntryOutcome::Skipped => cell,
            EntryOutcome::NotAttempted => cell.fg(Color::Yellow),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn superseded_text(report: &EntryReport) -> String {
    match &report.superseded {
        None => "-".to_string(),
        Some(record) => {
            let state = match record.state {
                SupersededState::Pending => "pending",
                SupersededState::Removed => "removed",
                SupersededState::RemoveFailed(_) => "remove failed",
            };
            format!("{} {state}", record.app.version)
        }
    }
}

fn outcome_line(report: &EntryReport) -> String {
    let mut line = format!(
        "{} {}: {} ({})",
        report.name,
        report.version,
        report.outcome.label(),
        report.action
    );
    if let EntryOutcome::Failed(error) = &report.outcome {
        line.push_str(&format!(": {error}"));
    }
    if report.superseded.is_some() {
        line.push_str(&format!("; superseded {}", superseded_text(report)));
    }
    line
}

/// Whether any entry needs a publish call
pub fn has_work(entries: &[PlanEntry]) -> bool {
    entries.iter().any(|entry| entry.action != PlanAction::Skip)
}

fn plan_table(entries: &[PlanEntry], action_cell: impl Fn(PlanAction) -> Cell) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("App").add_attribute(Attribute::Bold),
        Cell::new("Publisher").add_attribute(Attribute::Bold),
        Cell::new("Installed").add_attribute(Attribute::Bold),
        Cell::new("Candidate").add_attribute(Attribute::Bold),
        Cell::new("Action").add_attribute(Attribute::Bold),
    ]);

    for (position, entry) in entries.iter().enumerate() {
        let installed = entry
            .existing_version()
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(&entry.package.name),
            Cell::new(&entry.package.publisher),
            Cell::new(installed),
            Cell::new(entry.package.version),
            action_cell(entry.action),
        ]);
    }
    table
}
