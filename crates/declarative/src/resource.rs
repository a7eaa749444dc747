//! Resource model for declarative state management
//!
//! A Resource is a single manageable entity (package, service or file)
//! together with the state it should converge to. Resources are plain data
//! derived from an [`Intent`](crate::intent::Intent); probing and changing
//! the system goes through the provider traits in [`crate::context`].

use crate::types::{ContentSource, Ensure, FileContent, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A declared resource and its desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Title, unique within its kind (e.g. "adcli", "adcli.conf")
    pub name: String,
    pub ensure: Ensure,
    /// Start at boot; only meaningful for services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    /// Simulate changes to this resource instead of applying them
    #[serde(default)]
    pub noop: bool,
    /// Settings that only apply to file resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSpec>,
}

/// File-specific desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: PathBuf,
    /// Declared content source
    pub source: ContentSource,
    /// Content resolved by the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FileContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    /// Overwrite an existing file whose content differs
    #[serde(default = "default_replace")]
    pub replace: bool,
}

fn default_replace() -> bool {
    true
}

impl Resource {
    /// A package resource
    pub fn package(name: &str, ensure: Ensure) -> Self {
        Self {
            kind: ResourceKind::Package,
            name: name.to_string(),
            ensure,
            enable: None,
            noop: false,
            file: None,
        }
    }

    /// A service resource
    pub fn service(name: &str, ensure: Ensure, enable: bool) -> Self {
        Self {
            kind: ResourceKind::Service,
            name: name.to_string(),
            ensure,
            enable: Some(enable),
            noop: false,
            file: None,
        }
    }

    /// A file (or directory) resource
    pub fn file(name: &str, path: impl AsRef<Path>, ensure: Ensure, source: ContentSource) -> Self {
        Self {
            kind: ResourceKind::File,
            name: name.to_string(),
            ensure,
            enable: None,
            noop: false,
            file: Some(FileSpec {
                path: path.as_ref().to_path_buf(),
                source,
                content: None,
                mode: None,
                replace: true,
            }),
        }
    }

    /// Reference string, e.g. `Service[adcli]`
    pub fn id(&self) -> String {
        format!("{}[{}]", self.kind, self.name)
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match (self.kind, &self.file) {
            (ResourceKind::File, Some(spec)) => {
                format!("{} {} ({})", self.id(), spec.path.display(), self.ensure)
            }
            _ => match self.enable {
                Some(enable) => format!("{} {} (enable: {})", self.id(), self.ensure, enable),
                None => format!("{} {}", self.id(), self.ensure),
            },
        }
    }

    /// Path of a file resource
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    /// Resolved content of a file resource
    pub fn content(&self) -> Option<&FileContent> {
        self.file.as_ref().and_then(|f| f.content.as_ref())
    }

    /// Check if this is a directory resource
    pub fn is_directory(&self) -> bool {
        self.file
            .as_ref()
            .is_some_and(|f| matches!(f.source, ContentSource::SourceDir { .. }))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// The resources derived from one intent
///
/// Declaration order is stable: package, service, config file, then the
/// optional config directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Find a resource by kind and title
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// First resource of a kind
    pub fn first(&self, kind: ResourceKind) -> Option<&Resource> {
        self.resources.iter().find(|r| r.kind == kind)
    }

    /// All resources of a kind, in declaration order
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Resource> {
        self.resources.iter_mut()
    }

    pub fn as_slice(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
