//! File provider - local filesystem, with `file://` and `http(s)://` sources
//!
//! Directory sources must be local. A directory is in sync when every file
//! of the source exists at the target with the same content (compared by
//! blake3 hash) and, when purging, the target holds nothing else. Paths that
//! other resources manage are skipped both ways.

use anyhow::{Context, Result, bail};
use declarative::{FileProvider, FileState};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Maximum size of a downloaded source (16 MB)
const MAX_DOWNLOAD_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct LocalFiles;

impl LocalFiles {
    pub fn new() -> Self {
        Self
    }
}

/// Local path behind a source URI, `None` for remote sources
fn local_path(uri: &str) -> Option<PathBuf> {
    if let Some(path) = uri.strip_prefix("file://") {
        Some(PathBuf::from(path))
    } else if uri.starts_with('/') {
        Some(PathBuf::from(uri))
    } else {
        None
    }
}

fn is_http(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

fn download(url: &str) -> Result<Vec<u8>> {
    let agent = ureq::Agent::new_with_defaults();

    let mut response = agent
        .get(url)
        .header("User-Agent", "adclictl")
        .call()
        .with_context(|| format!("Failed to download {url}"))?;

    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD_SIZE)
        .read_to_vec()
        .with_context(|| format!("Failed to read response body from {url}"))?;

    Ok(bytes)
}

fn source_dir(uri: &str) -> Result<PathBuf> {
    let Some(path) = local_path(uri) else {
        bail!("Directory source must be a local path or file:// URI: {uri}");
    };
    if !path.is_dir() {
        bail!("Directory source not found: {}", path.display());
    }
    Ok(path)
}

/// Relative paths of everything under a directory
fn entries(root: &Path) -> Result<BTreeSet<PathBuf>> {
    let mut found = BTreeSet::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if let Ok(rel) = entry.path().strip_prefix(root) {
            found.insert(rel.to_path_buf());
        }
    }
    Ok(found)
}

/// Whether a relative entry is a kept path or lies below one
fn is_kept(rel: &Path, keep: &[PathBuf]) -> bool {
    keep.iter().any(|k| rel.starts_with(k))
}

/// Whether purging a relative entry would take a kept path with it
fn guards_kept(rel: &Path, keep: &[PathBuf]) -> bool {
    keep.iter().any(|k| k.starts_with(rel) || rel.starts_with(k))
}

fn same_content(a: &Path, b: &Path) -> Result<bool> {
    if !b.is_file() {
        return Ok(false);
    }
    let left = fs::read(a).with_context(|| format!("Failed to read {}", a.display()))?;
    let right = fs::read(b).with_context(|| format!("Failed to read {}", b.display()))?;
    Ok(blake3::hash(&left) == blake3::hash(&right))
}

fn remove_any(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .with_context(|| format!("Failed to remove {}", path.display()))
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> Option<u32> {
    None
}

impl FileProvider for LocalFiles {
    fn probe(&self, path: &Path) -> Result<FileState> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileState::Missing),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
            }
        };

        if meta.is_dir() {
            return Ok(FileState::Directory);
        }

        let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(FileState::File {
            content,
            mode: mode_of(&meta),
        })
    }

    fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        if let Some(path) = local_path(uri) {
            return fs::read(&path).with_context(|| format!("Failed to read source {}", path.display()));
        }
        if is_http(uri) {
            return download(uri);
        }
        bail!("Unsupported source URI: {uri}")
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        // Write next to the target and rename, so readers never see a partial file
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".adclictl-tmp");
        let tmp = PathBuf::from(tmp);

        let written = fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", tmp.display()))
            .and_then(|()| match fs::metadata(path) {
                Ok(meta) => fs::set_permissions(&tmp, meta.permissions())
                    .with_context(|| format!("Failed to copy permissions onto {}", tmp.display())),
                Err(_) => Ok(()),
            })
            .and_then(|()| {
                fs::rename(&tmp, path)
                    .with_context(|| format!("Failed to move {} into place", path.display()))
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        log::debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set mode {mode:o} on {}", path.display()))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, path: &Path, _mode: u32) -> Result<()> {
        log::warn!("File modes are not supported here, leaving {}", path.display());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if fs::symlink_metadata(path).is_err() {
            return Ok(());
        }
        remove_any(path)
    }

    fn dir_in_sync(
        &self,
        source: &str,
        path: &Path,
        purge: bool,
        keep: &[PathBuf],
    ) -> Result<bool> {
        let src = source_dir(source)?;
        if !path.is_dir() {
            return Ok(false);
        }

        let wanted = entries(&src)?;
        for rel in wanted.iter().filter(|rel| !is_kept(rel, keep)) {
            let from = src.join(rel);
            let to = path.join(rel);
            if from.is_dir() {
                if !to.is_dir() {
                    return Ok(false);
                }
            } else if !same_content(&from, &to)? {
                return Ok(false);
            }
        }

        if purge
            && entries(path)?
                .iter()
                .any(|rel| !wanted.contains(rel) && !guards_kept(rel, keep))
        {
            return Ok(false);
        }
        Ok(true)
    }

    fn sync_dir(
        &self,
        source: &str,
        path: &Path,
        purge: bool,
        force: bool,
        keep: &[PathBuf],
    ) -> Result<()> {
        let src = source_dir(source)?;

        if path.exists() && !path.is_dir() {
            if !force {
                bail!("{} exists and is not a directory", path.display());
            }
            remove_any(path)?;
        }
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;

        let wanted = entries(&src)?;
        for rel in &wanted {
            if is_kept(rel, keep) {
                log::debug!("Leaving managed {} alone", path.join(rel).display());
                continue;
            }
            let from = src.join(rel);
            let to = path.join(rel);

            if from.is_dir() {
                if to.exists() && !to.is_dir() {
                    if !force {
                        bail!("{} exists and is not a directory", to.display());
                    }
                    remove_any(&to)?;
                }
                fs::create_dir_all(&to)
                    .with_context(|| format!("Failed to create directory {}", to.display()))?;
                continue;
            }

            if to.is_dir() {
                if !force {
                    bail!("{} is a directory, expected a file", to.display());
                }
                remove_any(&to)?;
            }
            if !same_content(&from, &to)? {
                fs::copy(&from, &to).with_context(|| {
                    format!("Failed to copy {} to {}", from.display(), to.display())
                })?;
                log::debug!("Synced {}", to.display());
            }
        }

        if purge {
            // Reverse order removes children before their parents
            for rel in entries(path)?.iter().rev() {
                if wanted.contains(rel) || guards_kept(rel, keep) {
                    continue;
                }
                let stale = path.join(rel);
                if fs::symlink_metadata(&stale).is_ok() {
                    log::debug!("Purging {}", stale.display());
                    remove_any(&stale)?;
                }
            }
        }
        Ok(())
    }
}
