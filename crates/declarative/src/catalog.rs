//! Catalog - the compiled, immutable input of a reconciliation pass
//!
//! Compilation runs the whole derivation in one direction:
//! intent → resolver → renderer → notify edges → ordering graph.
//! Any [`ConfigError`] is raised here, before a single provider is called.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::graph::{DependencyGraph, NotifyEdge, build_edges};
use crate::intent::Intent;
use crate::resolver::{resolve, validate};
use crate::resource::{Resource, ResourceSet};
use crate::template::{TemplateContext, TemplateStore, render};
use crate::types::{FileContent, ResourceKind};

/// Resources, notify edges and application order
#[derive(Debug, Clone)]
pub struct Catalog {
    resources: ResourceSet,
    edges: BTreeSet<NotifyEdge>,
    graph: DependencyGraph,
    order: Vec<usize>,
}

impl Catalog {
    /// Compile an intent for a node
    pub fn compile(intent: &Intent, fqdn: &str, store: &dyn TemplateStore) -> Result<Self> {
        validate(intent)?;

        let mut resources = resolve(intent);

        {
            let ctx = TemplateContext::new(fqdn, &intent.options);
            for resource in resources.iter_mut() {
                if resource.ensure.is_absent() {
                    continue;
                }
                if let Some(spec) = resource.file.as_mut() {
                    spec.content = Some(render(&spec.source, &ctx, store)?);
                }
            }
        }

        keep_managed_paths(&mut resources);

        let edges = build_edges(&resources, intent.service_autorestart);
        Self::new(resources, edges)
    }

    /// Assemble a catalog from already-resolved parts
    pub fn new(resources: ResourceSet, edges: BTreeSet<NotifyEdge>) -> Result<Self> {
        for resource in &resources {
            if resource.kind == ResourceKind::File
                && !resource.ensure.is_absent()
                && resource.content().is_none()
            {
                return Err(ConfigError::MissingContent(resource.id()));
            }
        }

        let graph = DependencyGraph::from_resources(&resources)?;
        let order = graph.order(&resources)?;
        Ok(Self {
            resources,
            edges,
            graph,
            order,
        })
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn edges(&self) -> &BTreeSet<NotifyEdge> {
        &self.edges
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Resource indices in application order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Resources in application order
    pub fn ordered(&self) -> impl Iterator<Item = &Resource> {
        self.order.iter().map(|&i| &self.resources.as_slice()[i])
    }

    /// Find a resource by its id (`Kind[title]`)
    pub fn find(&self, id: &str) -> Option<(usize, &Resource)> {
        self.resources.iter().enumerate().find(|(_, r)| r.id() == id)
    }

    /// Services notified by a file
    pub fn notify_targets(&self, file_id: &str) -> impl Iterator<Item = &str> {
        self.edges
            .iter()
            .filter(move |e| e.file == file_id)
            .map(|e| e.service.as_str())
    }
}

/// Record, on every synced directory, the paths below it that other file
/// resources manage, so the sync neither overwrites nor purges them
fn keep_managed_paths(resources: &mut ResourceSet) {
    let managed: Vec<PathBuf> = resources
        .iter()
        .filter(|r| !r.is_directory())
        .filter_map(|r| r.path().map(Path::to_path_buf))
        .collect();

    for resource in resources.iter_mut() {
        let Some(spec) = resource.file.as_mut() else {
            continue;
        };
        if let Some(FileContent::Directory { keep, .. }) = spec.content.as_mut() {
            *keep = managed
                .iter()
                .filter_map(|p| p.strip_prefix(&spec.path).ok())
                .filter(|rel| !rel.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .collect();
        }
    }
}
