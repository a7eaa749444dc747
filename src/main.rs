mod cli;
mod commands;
mod config;
mod engine;
mod facts;
mod paths;
mod provider;
mod runner;
mod state;
mod templates;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Plan(args) => commands::plan::plan(&ctx, args),
        Command::Diff(args) => commands::apply::diff(&ctx, args),
        Command::Apply(args) => commands::apply::apply(&ctx, args),
        Command::Render(args) => commands::plan::render(&ctx, args),
        Command::Report(args) => commands::report::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "adclictl", &mut io::stdout());
            Ok(())
        }
    }
}
