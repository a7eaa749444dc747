//! Apply report - the ordered outcome of a reconciliation pass

use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a resource during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Already in the desired state
    Unchanged,
    /// Changed to reach the desired state
    Changed,
    /// Would change, but the pass or resource is noop
    WouldChange,
    /// Restarted after a notifying file changed
    Refreshed,
    /// A probe or action failed
    Failed,
    /// Not attempted because a requirement failed
    Skipped,
}

impl Action {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::WouldChange => "would-change",
            Self::Refreshed => "refreshed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub resource_id: String,
    pub action: Action,
    /// Changes made or planned, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
    /// Error or reason, for failed and skipped entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReportEntry {
    pub fn new(resource_id: &str, action: Action) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            action,
            changes: Vec::new(),
            message: None,
        }
    }

    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Summary counts of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub unchanged: usize,
    pub changed: usize,
    pub would_change: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.changed + self.refreshed
    }

    /// Check if the pass was fully successful (no failures or skips)
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Total number of entries
    pub fn total(&self) -> usize {
        self.unchanged + self.changed + self.would_change + self.refreshed + self.failed + self.skipped
    }

    /// Add an entry's action to the summary
    pub fn add(&mut self, action: &Action) {
        match action {
            Action::Unchanged => self.unchanged += 1,
            Action::Changed => self.changed += 1,
            Action::WouldChange => self.would_change += 1,
            Action::Refreshed => self.refreshed += 1,
            Action::Failed => self.failed += 1,
            Action::Skipped => self.skipped += 1,
        }
    }
}

/// Ordered outcome of a pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub noop: bool,
    pub entries: Vec<ReportEntry>,
}

impl ApplyReport {
    pub fn new(noop: bool) -> Self {
        Self {
            noop,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Entry for a resource (the last one, if it was refreshed too)
    pub fn entry(&self, resource_id: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.resource_id == resource_id)
    }

    /// First entry for a resource, i.e. its own reconciliation
    pub fn action(&self, resource_id: &str) -> Option<&Action> {
        self.entries
            .iter()
            .find(|e| e.resource_id == resource_id)
            .map(|e| &e.action)
    }

    pub fn summary(&self) -> ExecuteSummary {
        let mut summary = ExecuteSummary::default();
        for entry in &self.entries {
            summary.add(&entry.action);
        }
        summary
    }

    /// Ids of failed resources
    pub fn failed(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.action.is_failure())
            .map(|e| e.resource_id.clone())
            .collect()
    }

    /// Check if every entry is unchanged
    pub fn is_unchanged(&self) -> bool {
        self.entries.iter().all(|e| e.action == Action::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_actions() {
        let mut report = ApplyReport::new(false);
        report.push(ReportEntry::new("Package[adcli]", Action::Changed));
        report.push(ReportEntry::new("Service[adcli]", Action::Failed).with_message("boom"));
        report.push(ReportEntry::new("File[adcli.conf]", Action::Skipped));
        report.push(ReportEntry::new("Service[adcli]", Action::Refreshed));

        let summary = report.summary();
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.total_changes(), 2);
        assert!(!summary.is_success());
        assert_eq!(report.failed(), vec!["Service[adcli]".to_string()]);
        assert_eq!(report.action("Service[adcli]"), Some(&Action::Failed));
        assert_eq!(
            report.entry("Service[adcli]").map(|e| &e.action),
            Some(&Action::Refreshed)
        );
        assert!(!report.is_unchanged());
    }

    #[test]
    fn actions_serialize_kebab_case() {
        let entry = ReportEntry::new("File[adcli.conf]", Action::WouldChange);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"resource_id":"File[adcli.conf]","action":"would-change"}"#
        );
        assert_eq!(Action::WouldChange.to_string(), "would-change");
    }
}
