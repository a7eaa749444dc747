//! # Declarative
//!
//! A small declarative state reconciler for a package, its service and its
//! configuration files.
//!
//! ## Core Concepts
//!
//! - **Intent**: the desired configuration (absent / disable / disableboot /
//!   noop flags, version pin, content source, options)
//! - **Resource**: a package, service or file with a desired ensure state
//! - **Catalog**: resources derived from an intent, with rendered content,
//!   notify edges and a dependency order
//! - **Executor**: probes and converges each resource in order, restarting
//!   notified services at the end of the pass
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Catalog, ExecuteOptions, Intent, MemoryTemplates, Providers, apply};
//!
//! let intent = Intent {
//!     version: Some("1.0.42".into()),
//!     ..Intent::default()
//! };
//! let templates = MemoryTemplates::new().with_default("fqdn: {{ fqdn }}\n");
//! let catalog = Catalog::compile(&intent, "host.example.com", &templates)?;
//!
//! let providers = Providers::new(&packages, &services, &files);
//! let report = apply(&catalog, providers, &ExecuteOptions::default())?;
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`PackageProvider`]: package manager queries and actions
//! - [`ServiceProvider`]: service supervisor queries and actions
//! - [`FileProvider`]: file delivery, permissions and directory sync
//! - [`TemplateStore`]: template lookup
//! - [`ProgressCallback`]: receives progress updates
//!
//! This allows the crate to be used without hard dependencies on a
//! specific package manager, init system or UI.

pub mod catalog;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod graph;
pub mod intent;
pub mod report;
pub mod resolver;
pub mod resource;
pub mod template;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use catalog::Catalog;
pub use context::{
    ApplyContext, FileProvider, FileState, NoProgress, PackageProvider, ProgressCallback,
    Providers, ServiceProvider, ServiceStatus,
};
pub use diff::{Change, DiffSummary, Observed, ResourceDiff, compute_diffs, short_digest};
pub use error::{ApplyError, ConfigError};
pub use executor::{apply, execute};
pub use graph::{DependencyGraph, NotifyEdge, build_edges};
pub use intent::{Branch, Intent, Layout};
pub use report::{Action, ApplyReport, ExecuteSummary, ReportEntry};
pub use resolver::resolve;
pub use resource::{FileSpec, Resource, ResourceSet};
pub use template::{
    DirTemplates, MemoryTemplates, TemplateContext, TemplateStore, render, render_str,
};
pub use types::{ContentSource, Ensure, ExecuteOptions, FileContent, ResourceKind};
