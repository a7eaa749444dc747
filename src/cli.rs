use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adclictl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Install, configure and reconcile the adcli package, service and configuration", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the compiled resources, their ordering and notify edges
    Plan(PlanArgs),

    /// Show what would change on this machine (no changes are made)
    Diff(IntentArgs),

    /// Reconcile this machine with the desired configuration
    Apply(ApplyArgs),

    /// Print the rendered configuration file
    Render(IntentArgs),

    /// Show the report of the last apply
    Report(ReportArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Flags that build the desired configuration
///
/// Every flag overrides the matching key of the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct IntentArgs {
    /// Config file (TOML)
    #[arg(short, long, env = "ADCLICTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding custom templates
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Fully qualified domain name used in templates (defaults to `hostname -f`)
    #[arg(long)]
    pub fqdn: Option<String>,

    /// Install a specific package version
    #[arg(long = "version", value_name = "VERSION")]
    pub pkg_version: Option<String>,

    /// Remove the package, service and configuration
    #[arg(long, overrides_with = "no_absent")]
    pub absent: bool,

    /// Turn off --absent set in the config file
    #[arg(long, overrides_with = "absent", hide_short_help = true)]
    pub no_absent: bool,

    /// Stop the service and disable it at boot
    #[arg(long, overrides_with = "no_disable")]
    pub disable: bool,

    /// Turn off --disable set in the config file
    #[arg(long, overrides_with = "disable", hide_short_help = true)]
    pub no_disable: bool,

    /// Disable the service at boot, leave it running or stopped
    #[arg(long, overrides_with = "no_disableboot")]
    pub disableboot: bool,

    /// Turn off --disableboot set in the config file
    #[arg(long, overrides_with = "disableboot", hide_short_help = true)]
    pub no_disableboot: bool,

    /// Report what would change without changing anything
    #[arg(long, overrides_with = "no_noop")]
    pub noop: bool,

    /// Turn off --noop set in the config file
    #[arg(long, overrides_with = "noop", hide_short_help = true)]
    pub no_noop: bool,

    /// Template for the config file (e.g. `adcli/custom.conf`)
    #[arg(long)]
    pub template: Option<String>,

    /// Source URI for the config file
    #[arg(long)]
    pub source: Option<String>,

    /// Source URI for the whole config directory
    #[arg(long)]
    pub source_dir: Option<String>,

    /// Remove files in the config directory that are not in the source
    #[arg(long, overrides_with = "no_source_dir_purge")]
    pub source_dir_purge: bool,

    /// Turn off --source-dir-purge set in the config file
    #[arg(long, overrides_with = "source_dir_purge", hide_short_help = true)]
    pub no_source_dir_purge: bool,

    /// Class providing the config template (e.g. `adcli::spec`)
    #[arg(long)]
    pub my_class: Option<String>,

    /// Restart the service when its configuration changes
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub service_autorestart: Option<bool>,

    /// Never overwrite existing configuration, only report drift
    #[arg(long, overrides_with = "no_audit_only")]
    pub audit_only: bool,

    /// Turn off --audit-only set in the config file
    #[arg(long, overrides_with = "audit_only", hide_short_help = true)]
    pub no_audit_only: bool,

    /// Octal mode for the config file (e.g. 0640)
    #[arg(long, value_name = "MODE")]
    pub config_file_mode: Option<String>,

    /// Template option (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub options: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub intent: IntentArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub intent: IntentArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Output format for the final report
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Resolve a `--flag` / `--no-flag` pair; `None` when neither was given
pub fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}
