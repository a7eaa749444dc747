//! Machine facts used when rendering templates

use crate::runner;
use anyhow::{Result, bail};

/// Fully qualified domain name of this machine
///
/// Tries `hostname -f`, then plain `hostname`, then `/etc/hostname`.
pub fn fqdn() -> Result<String> {
    for args in [&["-f"][..], &[][..]] {
        match runner::run_capture("hostname", args) {
            Ok(name) if !name.is_empty() => return Ok(name),
            Ok(_) => {}
            Err(e) => log::debug!("hostname {}: {e:#}", args.join(" ")),
        }
    }

    if let Ok(name) = std::fs::read_to_string("/etc/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }

    bail!("Could not determine the fqdn of this machine; pass --fqdn")
}

/// The fqdn override if given, else the detected one
pub fn resolve_fqdn(overridden: Option<&str>) -> Result<String> {
    match overridden {
        Some(fqdn) => Ok(fqdn.to_string()),
        None => fqdn(),
    }
}
