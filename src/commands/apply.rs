//! `diff` and `apply` - probe and reconcile this machine

use anyhow::{Result, bail};
use declarative::compute_diffs;

use super::report::print_report;
use super::{Session, load};
use crate::Context;
use crate::cli::{ApplyArgs, IntentArgs, OutputFormat};
use crate::engine::{self, RunOptions, RunOutcome};
use crate::provider::System;
use crate::state::LastRun;
use crate::ui;

/// Show what `apply` would change
pub fn diff(_ctx: &Context, args: IntentArgs) -> Result<()> {
    let Session { catalog, .. } = load(&args)?;
    let system = System::detect()?;

    let diffs = compute_diffs(&catalog, system.providers())?;
    engine::display_diff(&diffs);
    Ok(())
}

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let Session {
        config,
        fqdn,
        catalog,
    } = load(&args.intent)?;
    let system = System::detect()?;
    let json = args.format == OutputFormat::Json;

    let opts = RunOptions {
        noop: config.intent.noop,
        yes: args.yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet || json,
    };

    let report = match engine::run(&catalog, system.providers(), &opts)? {
        RunOutcome::Applied(report) => report,
        RunOutcome::Aborted => return Ok(()),
    };

    let run = LastRun::new(&fqdn, report);
    match run.save() {
        Ok(path) => log::debug!("Recorded run in {}", path.display()),
        Err(e) if json => log::warn!("Could not record the run: {e:#}"),
        Err(e) => ui::warn(&format!("Could not record the run: {e:#}")),
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        if ctx.verbose > 0 {
            println!();
            print_report(&run.report);
        }
        engine::print_summary(&run.report);
    }

    if !run.success {
        let failed = run.report.failed();
        bail!("Failed to reconcile: {}", failed.join(", "));
    }
    Ok(())
}
