//! Error types for the declarative crate

use crate::report::ApplyReport;
use thiserror::Error;

/// Errors raised while compiling a catalog, before anything is applied
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A template reference could not be resolved
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A template used a placeholder with no binding
    #[error("template {template} uses unknown variable '{variable}'")]
    UnknownVariable { template: String, variable: String },

    /// The template store failed to load a template
    #[error("failed to load template {reference}: {source}")]
    TemplateLoad {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    /// File mode is not a valid octal permission string
    #[error("invalid file mode '{0}' (expected octal, e.g. 0644)")]
    InvalidMode(String),

    /// The dependency graph has a cycle
    #[error("dependency cycle involving {0}")]
    Cycle(String),

    /// A present file resource reached the applier without content
    #[error("{0} has no resolved content")]
    MissingContent(String),
}

/// Errors surfaced after a reconciliation pass
#[derive(Error, Debug)]
pub enum ApplyError {
    /// One or more resources failed; the partial report is attached
    #[error("{} resource(s) failed: {}", failed.len(), failed.join(", "))]
    Failed {
        failed: Vec<String>,
        report: Box<ApplyReport>,
    },
}

impl ApplyError {
    /// The partial report of the pass
    pub fn report(&self) -> &ApplyReport {
        match self {
            Self::Failed { report, .. } => report,
        }
    }
}

/// Result type for catalog compilation
pub type Result<T> = std::result::Result<T, ConfigError>;
