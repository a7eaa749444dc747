use anyhow::{Context, Result};
use std::process::{Command, Output, Stdio};

fn output(cmd: &str, args: &[&str]) -> Result<Output> {
    log::trace!("exec: {} {}", cmd, args.join(" "));
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))
}

/// Run a command and capture output
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = output(cmd, args)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {} {}: {}", cmd, args.join(" "), stderr.trim())
    }
}

/// Run a command for its side effect, failing with its stderr
pub fn run_checked(cmd: &str, args: &[&str]) -> Result<()> {
    run_capture(cmd, args).map(|_| ())
}

/// Run a command and capture stdout along with the exit status
///
/// For queries whose non-zero exit is an answer, not an error
/// (e.g. `systemctl is-active` on a stopped unit).
pub fn run_status(cmd: &str, args: &[&str]) -> Result<(bool, String)> {
    let output = output(cmd, args)?;
    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
    ))
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
