//! Execution engine - adclictl executor with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{
    Action, ApplyError, ApplyReport, Catalog, ExecuteSummary, ProgressCallback, Providers,
    ResourceDiff, compute_diffs, execute as reconcile,
};

use super::differ::display_diff;

/// Options for a run (includes `yes` for confirmation skip)
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Simulate every change
    pub noop: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Print per-resource progress
    pub verbose: bool,
    /// Keep stdout free for machine-readable output
    pub quiet: bool,
}

/// Outcome of a run
#[derive(Debug)]
pub enum RunOutcome {
    /// The pass ran; the report may contain failures
    Applied(ApplyReport),
    /// The user declined the confirmation prompt
    Aborted,
}

/// Prints one line per reconciled resource
struct ConsoleProgress {
    verbose: bool,
    quiet: bool,
}

impl ProgressCallback for ConsoleProgress {
    fn on_resource_start(&mut self, id: &str, description: &str) {
        log::debug!("Reconciling {id}: {description}");
    }

    fn on_resource_complete(&mut self, id: &str, action: &Action) {
        if !self.quiet && (self.verbose || !matches!(action, Action::Unchanged)) {
            println!("    {} {}", crate::ui::action_symbol(action), id);
        }
    }
}

/// Probe, show the diff, confirm and reconcile
pub fn run(catalog: &Catalog, providers: Providers<'_>, opts: &RunOptions) -> Result<RunOutcome> {
    // A probe failure is reported again, per resource, by the pass itself
    let pending = match compute_diffs(catalog, providers) {
        Ok(diffs) => {
            if !opts.quiet {
                display_diff(&diffs);
            }
            !diffs.iter().all(ResourceDiff::is_in_sync)
        }
        Err(e) => {
            log::warn!("Could not compute the diff: {e:#}");
            true
        }
    };

    if pending && !opts.yes && !opts.noop && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(RunOutcome::Aborted);
    }

    if !opts.quiet {
        println!();
        let verb = if opts.noop { "Simulating" } else { "Applying" };
        println!(
            "  {} {verb} {} resources...",
            "→".cyan(),
            catalog.resources().len()
        );
    }

    let mut progress = ConsoleProgress {
        verbose: opts.verbose,
        quiet: opts.quiet,
    };
    let options = declarative::ExecuteOptions { noop: opts.noop };

    match reconcile(catalog, providers, &options, &mut progress) {
        Ok(report) => Ok(RunOutcome::Applied(report)),
        Err(ApplyError::Failed { report, .. }) => Ok(RunOutcome::Applied(*report)),
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
pub fn print_summary(report: &ApplyReport) {
    let summary: ExecuteSummary = report.summary();

    println!();
    if !summary.is_success() {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    } else if report.noop {
        println!("  {} Noop run - no changes made", "ℹ".blue());
    } else {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    }

    if summary.changed > 0 {
        println!("    • {} resources changed", summary.changed);
    }
    if summary.would_change > 0 {
        println!("    • {} resources would change", summary.would_change);
    }
    if summary.refreshed > 0 {
        println!("    • {} services restarted", summary.refreshed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
        for entry in report.entries.iter().filter(|e| e.action.is_failure()) {
            if let Some(message) = &entry.message {
                println!("      {} {}: {}", "✗".red(), entry.resource_id, message);
            }
        }
    }
}
