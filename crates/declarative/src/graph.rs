//! Dependency and notify graph for a resource set.
//!
//! Two relations are derived from the resources:
//! - require edges (package → service, package → each file) that order the
//!   pass and define failure chains
//! - notify edges (file → service) that schedule a service restart when a
//!   file changes

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::resource::{Resource, ResourceSet};
use crate::types::ResourceKind;

/// A file change triggers a restart of the service
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotifyEdge {
    /// Resource id of the file
    pub file: String,
    /// Resource id of the service
    pub service: String,
}

/// Build the notify edges for a resource set.
///
/// An edge exists for every non-absent file iff `service_autorestart` is set
/// and the service is neither absent nor unmanaged.
pub fn build_edges(resources: &ResourceSet, service_autorestart: bool) -> BTreeSet<NotifyEdge> {
    if !service_autorestart {
        return BTreeSet::new();
    }

    let mut edges = BTreeSet::new();
    for service in resources.of_kind(ResourceKind::Service) {
        if service.ensure.is_absent() || !service.ensure.is_managed() {
            continue;
        }
        for file in resources.of_kind(ResourceKind::File) {
            if file.ensure.is_absent() {
                continue;
            }
            edges.insert(NotifyEdge {
                file: file.id(),
                service: service.id(),
            });
        }
    }
    edges
}

/// Ordering graph over the resources of a set.
///
/// Nodes are indices into the resource set; an edge `a → b` means `b`
/// requires `a`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
}

impl DependencyGraph {
    /// Build the require edges for a resource set.
    ///
    /// Every service and file requires every package declared before it.
    pub fn from_resources(resources: &ResourceSet) -> Result<Self> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..resources.len()).map(|i| graph.add_node(i)).collect();

        let packages: Vec<usize> = resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == ResourceKind::Package)
            .map(|(i, _)| i)
            .collect();

        for (i, resource) in resources.iter().enumerate() {
            if resource.kind == ResourceKind::Package {
                continue;
            }
            for &p in &packages {
                graph.add_edge(nodes[p], nodes[i], ());
            }
        }

        let dag = Self { graph, nodes };
        dag.verify_acyclic(resources)?;
        Ok(dag)
    }

    /// Verify that the graph is acyclic
    pub fn verify_acyclic(&self, resources: &ResourceSet) -> Result<()> {
        toposort(&self.graph, None).map_err(|cycle| {
            let index = self.graph[cycle.node_id()];
            ConfigError::Cycle(
                resources
                    .as_slice()
                    .get(index)
                    .map_or_else(|| format!("#{index}"), Resource::id),
            )
        })?;
        Ok(())
    }

    /// Indices in application order.
    ///
    /// Kahn's algorithm; among ready resources the lowest kind rank goes
    /// first (package, service, file), then declaration order.
    pub fn order(&self, resources: &ResourceSet) -> Result<Vec<usize>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.neighbors_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let rank = |idx: NodeIndex| {
            let i = self.graph[idx];
            (resources.as_slice()[i].kind, i)
        };

        let mut ready: BTreeSet<(ResourceKind, usize)> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&idx, _)| rank(idx))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(next) = ready.pop_first() {
            let (_, i) = next;
            order.push(i);
            for succ in self.graph.neighbors_directed(self.nodes[i], Direction::Outgoing) {
                if let Some(d) = in_degree.get_mut(&succ) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(rank(succ));
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck = (0..self.nodes.len())
                .find(|i| !order.contains(i))
                .and_then(|i| resources.as_slice().get(i))
                .map_or_else(String::new, Resource::id);
            return Err(ConfigError::Cycle(stuck));
        }
        Ok(order)
    }

    /// Every resource that transitively requires `index`
    pub fn dependents(&self, index: usize) -> Vec<usize> {
        let start = self.nodes[index];
        let mut dfs = Dfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                out.push(self.graph[node]);
            }
        }
        out.sort_unstable();
        out
    }

    /// Direct requirements of `index`
    pub fn requirements(&self, index: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors_directed(self.nodes[index], Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;
    use crate::resolver::resolve;
    use crate::types::{ContentSource, Ensure};

    #[test]
    fn autorestart_links_files_to_service() {
        let intent = Intent {
            source_dir: Some("file:///srv/adcli".into()),
            ..Intent::default()
        };
        let edges = build_edges(&resolve(&intent), true);
        let expected: BTreeSet<NotifyEdge> = [
            NotifyEdge {
                file: "File[adcli.conf]".into(),
                service: "Service[adcli]".into(),
            },
            NotifyEdge {
                file: "File[adcli.dir]".into(),
                service: "Service[adcli]".into(),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(edges, expected);
    }

    #[test]
    fn no_edges_without_autorestart() {
        let intent = Intent {
            service_autorestart: false,
            ..Intent::default()
        };
        assert!(build_edges(&resolve(&intent), intent.service_autorestart).is_empty());
    }

    #[test]
    fn no_edges_for_unmanaged_service_or_absent_files() {
        let disableboot = Intent {
            disableboot: true,
            ..Intent::default()
        };
        assert!(build_edges(&resolve(&disableboot), true).is_empty());

        let absent = Intent {
            absent: true,
            ..Intent::default()
        };
        assert!(build_edges(&resolve(&absent), true).is_empty());
    }

    #[test]
    fn order_is_package_service_file() {
        let set = ResourceSet::new(vec![
            Resource::file("a.conf", "/tmp/a.conf", Ensure::Present, ContentSource::Default),
            Resource::service("a", Ensure::Running, true),
            Resource::package("a", Ensure::Present),
        ]);
        let graph = DependencyGraph::from_resources(&set).unwrap();
        assert_eq!(graph.order(&set).unwrap(), vec![2, 1, 0]);
        assert_eq!(graph.dependents(2), vec![0, 1]);
        assert!(graph.dependents(1).is_empty());
        assert_eq!(graph.requirements(0), vec![2]);
    }

    #[test]
    fn explicit_cycle_is_rejected() {
        let set = ResourceSet::new(vec![
            Resource::package("a", Ensure::Present),
            Resource::service("a", Ensure::Running, true),
        ]);
        let mut graph = DependencyGraph::from_resources(&set).unwrap();
        // package requires service, closing the loop
        graph.graph.add_edge(graph.nodes[1], graph.nodes[0], ());
        assert!(matches!(graph.verify_acyclic(&set), Err(ConfigError::Cycle(_))));
        assert!(matches!(graph.order(&set), Err(ConfigError::Cycle(_))));
    }
}
