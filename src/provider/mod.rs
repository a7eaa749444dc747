//! System providers - the real package manager, init system and filesystem
//!
//! Each provider shells out through [`crate::runner`] or touches the local
//! filesystem directly, and implements one of the collaborator traits of the
//! `declarative` crate.

pub mod file;
pub mod package;
pub mod service;

pub use file::LocalFiles;
pub use package::PackageManager;
pub use service::Systemd;

use anyhow::Result;
use declarative::Providers;

/// The providers of this machine
pub struct System {
    pub packages: PackageManager,
    pub services: Systemd,
    pub files: LocalFiles,
}

impl System {
    /// Detect the package manager and service supervisor
    pub fn detect() -> Result<Self> {
        let packages = PackageManager::detect()?;
        log::debug!("Using package manager: {}", packages.name());
        Ok(Self {
            packages,
            services: Systemd::new(),
            files: LocalFiles::new(),
        })
    }

    pub fn providers(&self) -> Providers<'_> {
        Providers::new(&self.packages, &self.services, &self.files)
    }
}
