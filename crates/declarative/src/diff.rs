//! Diff computation for resources
//!
//! A resource is probed through the providers, then compared with its
//! desired state. The comparison yields the ordered list of [`Change`]s
//! that would converge it; an empty list means the resource is in sync.

use crate::catalog::Catalog;
use crate::context::{FileState, Providers, ServiceStatus};
use crate::error::ConfigError;
use crate::resource::Resource;
use crate::types::{Ensure, FileContent, ResourceKind};
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

/// Observed state of a resource, as reported by its provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Package {
        installed: Option<String>,
    },
    Service(ServiceStatus),
    File {
        state: FileState,
        /// Bytes the file should hold, when it should exist
        desired: Option<Vec<u8>>,
    },
    Directory {
        exists: bool,
        in_sync: bool,
    },
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package { installed: None } => f.write_str("not installed"),
            Self::Package {
                installed: Some(v),
            } => write!(f, "installed {v}"),
            Self::Service(status) => write!(
                f,
                "{}, {}",
                if status.running { "running" } else { "stopped" },
                if status.enabled { "enabled" } else { "disabled" }
            ),
            Self::File { state, .. } => match state {
                FileState::Missing => f.write_str("missing"),
                FileState::File { content, .. } => {
                    write!(f, "file {}", short_digest(content))
                }
                FileState::Directory => f.write_str("directory"),
            },
            Self::Directory { exists: false, .. } => f.write_str("missing"),
            Self::Directory { in_sync, .. } => {
                f.write_str(if *in_sync { "in sync" } else { "out of sync" })
            }
        }
    }
}

/// A single converging action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    InstallPackage { version: Option<String> },
    RemovePackage,
    StartService,
    StopService,
    EnableService,
    DisableService,
    WriteFile { content: Vec<u8> },
    SetMode { mode: u32 },
    RemovePath,
    SyncDir {
        source: String,
        purge: bool,
        force: bool,
        keep: Vec<PathBuf>,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstallPackage { version: None } => f.write_str("install"),
            Self::InstallPackage { version: Some(v) } => write!(f, "install {v}"),
            Self::RemovePackage => f.write_str("remove package"),
            Self::StartService => f.write_str("start"),
            Self::StopService => f.write_str("stop"),
            Self::EnableService => f.write_str("enable at boot"),
            Self::DisableService => f.write_str("disable at boot"),
            Self::WriteFile { content } => write!(f, "write content {}", short_digest(content)),
            Self::SetMode { mode } => write!(f, "set mode {mode:04o}"),
            Self::RemovePath => f.write_str("remove"),
            Self::SyncDir { source, purge, .. } => {
                write!(f, "sync from {source}")?;
                if *purge {
                    f.write_str(" (purge)")?;
                }
                Ok(())
            }
        }
    }
}

/// Short blake3 digest for display
pub fn short_digest(content: &[u8]) -> String {
    let hex = blake3::hash(content).to_hex();
    format!("blake3:{}", &hex.as_str()[..12])
}

/// A diff between current and desired state of a resource
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    pub kind: ResourceKind,
    /// Human-readable description
    pub description: String,
    pub current: Observed,
    pub desired: Ensure,
    /// Ordered changes that converge the resource
    pub changes: Vec<Change>,
    /// Drift that is reported but deliberately not corrected
    pub notes: Vec<String>,
    /// Whether the resource itself is flagged noop
    pub noop: bool,
}

impl ResourceDiff {
    /// Probe a resource and diff it against its desired state
    pub fn from_resource(resource: &Resource, providers: Providers<'_>) -> Result<Self> {
        let current = probe(resource, providers)?;
        let (changes, notes) = plan_changes(resource, &current);
        Ok(Self {
            resource_id: resource.id(),
            kind: resource.kind,
            description: resource.description(),
            current,
            desired: resource.ensure.clone(),
            changes,
            notes,
            noop: resource.noop,
        })
    }

    /// Check if the resource is already in sync
    pub fn is_in_sync(&self) -> bool {
        self.changes.is_empty()
    }

    /// Check if this diff creates something that does not exist
    pub fn is_addition(&self) -> bool {
        match &self.current {
            Observed::Package { installed } => installed.is_none() && !self.changes.is_empty(),
            Observed::File { state, .. } => !state.exists() && !self.changes.is_empty(),
            Observed::Directory { exists, .. } => !exists && !self.changes.is_empty(),
            Observed::Service(_) => false,
        }
    }

    /// Check if this diff removes something
    pub fn is_removal(&self) -> bool {
        self.changes
            .iter()
            .any(|c| matches!(c, Change::RemovePackage | Change::RemovePath))
            && self.desired.is_absent()
    }

    /// Current and desired text of an inline file, for content diffs
    pub fn content_change(&self) -> Option<(String, String)> {
        let Observed::File { state, desired } = &self.current else {
            return None;
        };
        let desired = desired.as_ref()?;
        if !self
            .changes
            .iter()
            .any(|c| matches!(c, Change::WriteFile { .. }))
        {
            return None;
        }
        let current = match state {
            FileState::File { content, .. } => String::from_utf8_lossy(content).into_owned(),
            _ => String::new(),
        };
        Some((current, String::from_utf8_lossy(desired).into_owned()))
    }
}

/// Observe the current state of a resource
pub fn probe(resource: &Resource, providers: Providers<'_>) -> Result<Observed> {
    match resource.kind {
        ResourceKind::Package => Ok(Observed::Package {
            installed: providers
                .packages
                .installed_version(&resource.name)
                .with_context(|| format!("Failed to query package {}", resource.name))?,
        }),
        ResourceKind::Service => Ok(Observed::Service(
            providers
                .services
                .status(&resource.name)
                .with_context(|| format!("Failed to query service {}", resource.name))?,
        )),
        ResourceKind::File => probe_file(resource, providers),
    }
}

fn probe_file(resource: &Resource, providers: Providers<'_>) -> Result<Observed> {
    let spec = resource
        .file
        .as_ref()
        .with_context(|| format!("{} has no file settings", resource.id()))?;
    let state = providers
        .files
        .probe(&spec.path)
        .with_context(|| format!("Failed to inspect {}", spec.path.display()))?;

    if resource.ensure.is_absent() {
        return Ok(if resource.is_directory() {
            Observed::Directory {
                exists: state.exists(),
                in_sync: false,
            }
        } else {
            Observed::File {
                state,
                desired: None,
            }
        });
    }

    let content = spec
        .content
        .as_ref()
        .ok_or_else(|| ConfigError::MissingContent(resource.id()))?;

    match content {
        FileContent::Directory {
            source,
            purge,
            keep,
            ..
        } => {
            let exists = matches!(state, FileState::Directory);
            let in_sync = exists
                && providers
                    .files
                    .dir_in_sync(source, &spec.path, *purge, keep)
                    .with_context(|| format!("Failed to compare {} with {source}", spec.path.display()))?;
            Ok(Observed::Directory { exists, in_sync })
        }
        FileContent::Inline { text } => Ok(Observed::File {
            state,
            desired: Some(text.clone().into_bytes()),
        }),
        FileContent::Source { uri } => {
            let bytes = providers
                .files
                .fetch(uri)
                .with_context(|| format!("Failed to fetch {uri}"))?;
            Ok(Observed::File {
                state,
                desired: Some(bytes),
            })
        }
    }
}

/// Compute the changes that converge a resource from its observed state
///
/// Returns the ordered changes and any drift notes.
pub fn plan_changes(resource: &Resource, observed: &Observed) -> (Vec<Change>, Vec<String>) {
    let mut changes = Vec::new();
    let mut notes = Vec::new();

    match observed {
        Observed::Package { installed } => match &resource.ensure {
            Ensure::Absent => {
                if installed.is_some() {
                    changes.push(Change::RemovePackage);
                }
            }
            Ensure::Present => {
                if installed.is_none() {
                    changes.push(Change::InstallPackage { version: None });
                }
            }
            Ensure::Version(v) => {
                if installed.as_deref() != Some(v.as_str()) {
                    changes.push(Change::InstallPackage {
                        version: Some(v.clone()),
                    });
                }
            }
            other => notes.push(format!("ensure '{other}' does not apply to packages")),
        },
        Observed::Service(status) => {
            match resource.ensure {
                Ensure::Running if !status.running => changes.push(Change::StartService),
                Ensure::Stopped if status.running => changes.push(Change::StopService),
                _ => {}
            }
            match resource.enable {
                Some(true) if !status.enabled => changes.push(Change::EnableService),
                Some(false) if status.enabled => changes.push(Change::DisableService),
                _ => {}
            }
        }
        Observed::Directory { exists, in_sync } => {
            if resource.ensure.is_absent() {
                if *exists {
                    changes.push(Change::RemovePath);
                }
            } else if !in_sync {
                if let Some(FileContent::Directory {
                    source,
                    purge,
                    force,
                    keep,
                }) = resource.content()
                {
                    changes.push(Change::SyncDir {
                        source: source.clone(),
                        purge: *purge,
                        force: *force,
                        keep: keep.clone(),
                    });
                }
            }
        }
        Observed::File { state, desired } => {
            plan_file(resource, state, desired.as_deref(), &mut changes, &mut notes);
        }
    }

    (changes, notes)
}

fn plan_file(
    resource: &Resource,
    state: &FileState,
    desired: Option<&[u8]>,
    changes: &mut Vec<Change>,
    notes: &mut Vec<String>,
) {
    let (mode, replace) = resource
        .file
        .as_ref()
        .map_or((None, true), |spec| (spec.mode, spec.replace));

    let Some(desired) = desired else {
        if state.exists() {
            changes.push(Change::RemovePath);
        }
        return;
    };

    let write = Change::WriteFile {
        content: desired.to_vec(),
    };

    match state {
        FileState::Missing => {
            changes.push(write);
            if let Some(mode) = mode {
                changes.push(Change::SetMode { mode });
            }
        }
        FileState::Directory => {
            if replace {
                changes.push(Change::RemovePath);
                changes.push(write);
                if let Some(mode) = mode {
                    changes.push(Change::SetMode { mode });
                }
            } else {
                notes.push("a directory exists where the file belongs".to_string());
            }
        }
        FileState::File {
            content,
            mode: current_mode,
        } => {
            if content.as_slice() != desired {
                if replace {
                    changes.push(write);
                } else {
                    notes.push(format!(
                        "content differs ({} != {}), not replaced",
                        short_digest(content),
                        short_digest(desired)
                    ));
                }
            }
            if let Some(mode) = mode
                && *current_mode != Some(mode)
            {
                changes.push(Change::SetMode { mode });
            }
        }
    }
}

/// Compute diffs for every resource of a catalog
///
/// Returns only resources that have differences between current and desired
/// state. A probe failure aborts with the failing resource in the error.
pub fn compute_diffs(catalog: &Catalog, providers: Providers<'_>) -> Result<Vec<ResourceDiff>> {
    let mut diffs = Vec::new();
    for index in catalog.order() {
        let resource = &catalog.resources().as_slice()[*index];
        let diff = ResourceDiff::from_resource(resource, providers)
            .with_context(|| format!("Failed to diff {}", resource.id()))?;
        if !diff.is_in_sync() || !diff.notes.is_empty() {
            diffs.push(diff);
        }
    }
    Ok(diffs)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs.iter().filter(|d| !d.is_in_sync()) {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
