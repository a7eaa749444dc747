//! `report` - show the last recorded apply

use anyhow::Result;
use colored::Colorize;
use declarative::ApplyReport;

use crate::Context;
use crate::cli::{OutputFormat, ReportArgs};
use crate::state::LastRun;
use crate::ui;

/// Print every entry of a report
pub fn print_report(report: &ApplyReport) {
    for entry in &report.entries {
        println!(
            "  {} {:<30} {}",
            ui::action_symbol(&entry.action),
            entry.resource_id,
            ui::action_label(&entry.action)
        );
        for change in &entry.changes {
            println!("      • {change}");
        }
        if let Some(message) = &entry.message {
            println!("      {}", message.dimmed());
        }
    }
}

pub fn run(_ctx: &Context, args: ReportArgs) -> Result<()> {
    let Some(run) = LastRun::load()? else {
        if args.format == OutputFormat::Json {
            println!("null");
        } else {
            ui::info("No apply has been recorded yet");
        }
        return Ok(());
    };

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    ui::header("Last run");
    ui::kv(
        "finished",
        &run.finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    ui::kv("fqdn", &run.fqdn);
    ui::kv(
        "result",
        &if run.success {
            "success".green().to_string()
        } else {
            "failed".red().to_string()
        },
    );
    if run.report.noop {
        ui::kv("mode", "noop");
    }

    println!();
    print_report(&run.report);
    Ok(())
}
