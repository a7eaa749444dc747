//! Last-run state
//!
//! Every `apply` records its report in `<state_dir>/last_run.json` so
//! `adclictl report` can show it later.

use crate::paths;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::ApplyReport;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "last_run.json";

/// Outcome of the most recent apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRun {
    pub finished_at: DateTime<Utc>,
    pub fqdn: String,
    /// Whether every resource converged
    pub success: bool,
    pub report: ApplyReport,
}

impl LastRun {
    pub fn new(fqdn: &str, report: ApplyReport) -> Self {
        let success = report.summary().is_success();
        Self {
            finished_at: Utc::now(),
            fqdn: fqdn.to_string(),
            success,
            report,
        }
    }

    /// Get the state file path
    pub fn state_file() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join(STATE_FILE))
    }

    /// Load the last run, `None` if nothing was recorded yet
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::state_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            log::debug!("State file does not exist: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let run = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(Some(run))
    }

    /// Save to the state directory
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::state_file()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize state to JSON")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }
}
