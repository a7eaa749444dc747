//! Apply context and provider traits
//!
//! The reconciler never touches the system directly. Package managers,
//! service supervisors and file delivery are reached through these traits
//! so the engine can run against real backends or an in-memory fake.

use crate::report::Action;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Observed state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStatus {
    pub running: bool,
    pub enabled: bool,
}

/// Observed state of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    /// Nothing exists at the path
    Missing,
    /// A regular file
    File { content: Vec<u8>, mode: Option<u32> },
    /// A directory
    Directory,
}

impl FileState {
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}

/// Package manager collaborator
pub trait PackageProvider {
    /// Installed version, `None` if not installed
    fn installed_version(&self, name: &str) -> Result<Option<String>>;

    /// Install the package, at a specific version if given
    fn install(&self, name: &str, version: Option<&str>) -> Result<()>;

    /// Remove the package
    fn remove(&self, name: &str) -> Result<()>;
}

/// Service supervisor collaborator
pub trait ServiceProvider {
    fn status(&self, name: &str) -> Result<ServiceStatus>;
    fn start(&self, name: &str) -> Result<()>;
    fn stop(&self, name: &str) -> Result<()>;
    fn enable(&self, name: &str) -> Result<()>;
    fn disable(&self, name: &str) -> Result<()>;
    fn restart(&self, name: &str) -> Result<()>;
}

/// File delivery collaborator
pub trait FileProvider {
    /// Observe what exists at a path
    fn probe(&self, path: &Path) -> Result<FileState>;

    /// Fetch the bytes behind a source URI (read-only)
    fn fetch(&self, uri: &str) -> Result<Vec<u8>>;

    /// Write a regular file, creating parent directories
    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Set permission bits
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;

    /// Remove a file or directory tree
    fn remove(&self, path: &Path) -> Result<()>;

    /// Check whether a directory matches its source, ignoring `keep`
    fn dir_in_sync(
        &self,
        source: &str,
        path: &Path,
        purge: bool,
        keep: &[PathBuf],
    ) -> Result<bool>;

    /// Copy a source directory onto a path, removing unmanaged files when
    /// `purge` is set and replacing conflicting entries when `force` is set.
    /// Paths in `keep` (relative to `path`) are left untouched.
    fn sync_dir(
        &self,
        source: &str,
        path: &Path,
        purge: bool,
        force: bool,
        keep: &[PathBuf],
    ) -> Result<()>;
}

/// The collaborators used by one reconciliation pass
#[derive(Clone, Copy)]
pub struct Providers<'a> {
    pub packages: &'a dyn PackageProvider,
    pub services: &'a dyn ServiceProvider,
    pub files: &'a dyn FileProvider,
}

impl<'a> Providers<'a> {
    pub fn new(
        packages: &'a dyn PackageProvider,
        services: &'a dyn ServiceProvider,
        files: &'a dyn FileProvider,
    ) -> Self {
        Self {
            packages,
            services,
            files,
        }
    }
}

/// Progress callback for execution operations
///
/// Implement this trait to receive progress updates during a pass.
pub trait ProgressCallback {
    /// Called when starting to reconcile a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource has been reconciled
    fn on_resource_complete(&mut self, id: &str, action: &Action);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _action: &Action) {}
}

/// Context passed to per-resource apply operations
pub struct ApplyContext<'a> {
    /// Whether changes are simulated
    pub noop: bool,
    pub providers: Providers<'a>,
}

impl<'a> ApplyContext<'a> {
    pub fn new(noop: bool, providers: Providers<'a>) -> Self {
        Self { noop, providers }
    }
}
