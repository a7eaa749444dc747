//! In-memory system used by the unit tests

use crate::context::{FileProvider, FileState, PackageProvider, Providers, ServiceProvider, ServiceStatus};
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct MemorySystem {
    pub packages: RefCell<BTreeMap<String, String>>,
    pub services: RefCell<BTreeMap<String, ServiceStatus>>,
    pub files: RefCell<BTreeMap<PathBuf, FileState>>,
    pub sources: BTreeMap<String, Vec<u8>>,
    /// Directories that are in sync with their source
    pub synced_dirs: RefCell<BTreeSet<PathBuf>>,
    /// Mutating calls, in order
    pub calls: RefCell<Vec<String>>,
    /// Operations that fail, e.g. "install adcli"
    pub failing: BTreeSet<String>,
    /// Version installed when none is requested
    pub candidate: String,
}

impl MemorySystem {
    pub fn new() -> Self {
        Self {
            candidate: "1.0.0".to_string(),
            ..Self::default()
        }
    }

    pub fn providers(&self) -> Providers<'_> {
        Providers::new(self, self, self)
    }

    pub fn fail(mut self, op: &str) -> Self {
        self.failing.insert(op.to_string());
        self
    }

    pub fn with_source(mut self, uri: &str, content: &str) -> Self {
        self.sources.insert(uri.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn file_text(&self, path: &str) -> Option<String> {
        match self.files.borrow().get(Path::new(path)) {
            Some(FileState::File { content, .. }) => {
                Some(String::from_utf8_lossy(content).into_owned())
            }
            _ => None,
        }
    }

    fn record(&self, op: String) -> Result<()> {
        if self.failing.contains(&op) {
            bail!("{op} failed");
        }
        self.calls.borrow_mut().push(op);
        Ok(())
    }

    fn status_of(&self, name: &str) -> ServiceStatus {
        self.services.borrow().get(name).copied().unwrap_or_default()
    }
}

impl PackageProvider for MemorySystem {
    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        if self.failing.contains(&format!("query {name}")) {
            bail!("query {name} failed");
        }
        Ok(self.packages.borrow().get(name).cloned())
    }

    fn install(&self, name: &str, version: Option<&str>) -> Result<()> {
        self.record(format!("install {name}"))?;
        let version = version.unwrap_or(&self.candidate).to_string();
        self.packages.borrow_mut().insert(name.to_string(), version);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.record(format!("remove {name}"))?;
        self.packages.borrow_mut().remove(name);
        Ok(())
    }
}

impl ServiceProvider for MemorySystem {
    fn status(&self, name: &str) -> Result<ServiceStatus> {
        Ok(self.status_of(name))
    }

    fn start(&self, name: &str) -> Result<()> {
        self.record(format!("start {name}"))?;
        let mut status = self.status_of(name);
        status.running = true;
        self.services.borrow_mut().insert(name.to_string(), status);
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.record(format!("stop {name}"))?;
        let mut status = self.status_of(name);
        status.running = false;
        self.services.borrow_mut().insert(name.to_string(), status);
        Ok(())
    }

    fn enable(&self, name: &str) -> Result<()> {
        self.record(format!("enable {name}"))?;
        let mut status = self.status_of(name);
        status.enabled = true;
        self.services.borrow_mut().insert(name.to_string(), status);
        Ok(())
    }

    fn disable(&self, name: &str) -> Result<()> {
        self.record(format!("disable {name}"))?;
        let mut status = self.status_of(name);
        status.enabled = false;
        self.services.borrow_mut().insert(name.to_string(), status);
        Ok(())
    }

    fn restart(&self, name: &str) -> Result<()> {
        self.record(format!("restart {name}"))
    }
}

impl FileProvider for MemorySystem {
    fn probe(&self, path: &Path) -> Result<FileState> {
        Ok(self
            .files
            .borrow()
            .get(path)
            .cloned()
            .unwrap_or(FileState::Missing))
    }

    fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        match self.sources.get(uri) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("source not found: {uri}"),
        }
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.record(format!("write {}", path.display()))?;
        let mode = match self.files.borrow().get(path) {
            Some(FileState::File { mode, .. }) => *mode,
            _ => Some(0o644),
        };
        self.files.borrow_mut().insert(
            path.to_path_buf(),
            FileState::File {
                content: content.to_vec(),
                mode,
            },
        );
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.record(format!("chmod {mode:o} {}", path.display()))?;
        if let Some(FileState::File { mode: m, .. }) = self.files.borrow_mut().get_mut(path) {
            *m = Some(mode);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.record(format!("rm {}", path.display()))?;
        self.files.borrow_mut().remove(path);
        self.synced_dirs.borrow_mut().remove(path);
        Ok(())
    }

    fn dir_in_sync(
        &self,
        _source: &str,
        path: &Path,
        _purge: bool,
        _keep: &[PathBuf],
    ) -> Result<bool> {
        Ok(self.synced_dirs.borrow().contains(path))
    }

    fn sync_dir(
        &self,
        source: &str,
        path: &Path,
        purge: bool,
        _force: bool,
        _keep: &[PathBuf],
    ) -> Result<()> {
        let flag = if purge { " --purge" } else { "" };
        self.record(format!("sync {source} {}{flag}", path.display()))?;
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), FileState::Directory);
        self.synced_dirs.borrow_mut().insert(path.to_path_buf());
        Ok(())
    }
}
