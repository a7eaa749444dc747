//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of a managed resource
///
/// The ordering of variants is the tie-break used when several resources
/// are ready at once: packages first, then services, then files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Package,
    Service,
    File,
}

impl ResourceKind {
    /// Capitalized name used in resource references (`Package[adcli]`)
    pub fn label(self) -> &'static str {
        match self {
            Self::Package => "Package",
            Self::Service => "Service",
            Self::File => "File",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Desired ensure value of a resource
///
/// A single value per resource, so the ensure states are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Installed / exists, any version
    Present,
    /// Removed / does not exist
    Absent,
    /// Installed at exactly this version
    Version(String),
    /// Service is running
    Running,
    /// Service is stopped
    Stopped,
    /// Neither asserted present nor absent; left untouched
    Unmanaged,
}

impl Ensure {
    /// Package ensure for an optional pinned version
    pub fn installed(version: Option<&str>) -> Self {
        match version {
            Some(v) => Self::Version(v.to_string()),
            None => Self::Present,
        }
    }

    /// Check if the value asserts presence
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present | Self::Version(_))
    }

    /// Check if the value asserts absence
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Check if the resource state is asserted at all
    pub fn is_managed(&self) -> bool {
        !matches!(self, Self::Unmanaged)
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
            Self::Version(v) => f.write_str(v),
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
            Self::Unmanaged => f.write_str("unmanaged"),
        }
    }
}

/// Where the content of a file resource comes from
///
/// Resolved once from the intent; the renderer turns it into [`FileContent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSource {
    /// Render a named template
    Template { reference: String },
    /// Render the template provided by a custom class (`a::b` → `a/b`)
    Class { reference: String },
    /// Opaque URI fetched by the file-delivery collaborator
    Source { uri: String },
    /// Directory synced from a URI
    SourceDir { uri: String, purge: bool },
    /// The built-in default template
    Default,
}

/// Resolved content of a file resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileContent {
    /// Content rendered locally
    Inline { text: String },
    /// Content delivered from an external source
    Source { uri: String },
    /// Directory synced from a source
    Directory {
        source: String,
        purge: bool,
        force: bool,
        /// Paths, relative to the directory, managed by other resources.
        /// The sync never copies over or purges them.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keep: Vec<PathBuf>,
    },
}

impl FileContent {
    /// Source URI, for source-backed files and directories
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Inline { .. } => None,
            Self::Source { uri } => Some(uri),
            Self::Directory { source, .. } => Some(source),
        }
    }

    /// Check if the content describes a directory
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}

/// Options for a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Simulate every resource, whatever its own noop flag says
    pub noop: bool,
}

/// Parse an octal permission string such as `"0644"` or `"755"`
pub fn parse_mode(mode: &str) -> Option<u32> {
    let trimmed = mode.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    u32::from_str_radix(digits, 8).ok()
}
