//! Service provider - systemd via systemctl

use crate::runner;
use anyhow::Result;
use declarative::{ServiceProvider, ServiceStatus};

#[derive(Debug, Default)]
pub struct Systemd;

impl Systemd {
    pub fn new() -> Self {
        Self
    }

    fn systemctl(action: &str, name: &str) -> Result<()> {
        log::info!("systemctl {action} {name}");
        runner::run_checked("systemctl", &[action, name])
    }
}

/// `systemctl is-enabled` states that start the unit at boot
fn is_enabled_state(state: &str) -> bool {
    matches!(state, "enabled" | "enabled-runtime" | "static" | "alias")
}

impl ServiceProvider for Systemd {
    fn status(&self, name: &str) -> Result<ServiceStatus> {
        let (running, _) = runner::run_status("systemctl", &["is-active", "--quiet", name])?;
        let (_, state) = runner::run_status("systemctl", &["is-enabled", name])?;
        Ok(ServiceStatus {
            running,
            enabled: is_enabled_state(&state),
        })
    }

    fn start(&self, name: &str) -> Result<()> {
        Self::systemctl("start", name)
    }

    fn stop(&self, name: &str) -> Result<()> {
        Self::systemctl("stop", name)
    }

    fn enable(&self, name: &str) -> Result<()> {
        Self::systemctl("enable", name)
    }

    fn disable(&self, name: &str) -> Result<()> {
        Self::systemctl("disable", name)
    }

    fn restart(&self, name: &str) -> Result<()> {
        Self::systemctl("restart", name)
    }
}
