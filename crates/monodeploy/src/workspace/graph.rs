//! Dependency graph construction, cycle rejection and dependency levels
//!
//! Builds a directed graph over workspace packages to answer three questions:
//! which consumers depend on a changed provider (propagation), whether the
//! workspace is a DAG (cycles are rejected before any manifest is written),
//! and which dependency level each package sits at (topological publishing).

use crate::core::error::WorkspaceError;
use crate::workspace::Workspace;
use crate::workspace::manifest::DependencyKind;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

/// Dependency graph over workspace packages
///
/// Edge direction is `consumer -> provider`, each edge labelled with the
/// dependency kind it came from.
pub struct PackageGraph {
  graph: DiGraph<String, DependencyKind>,
  node_map: HashMap<String, NodeIndex>,
}

impl PackageGraph {
  /// Build the graph from workspace manifests
  ///
  /// Only edges between workspace members are recorded; external dependencies
  /// play no role in propagation or ordering.
  pub fn from_workspace(workspace: &Workspace) -> Self {
    let mut graph = DiGraph::new();
    let mut node_map = HashMap::new();

    for package in workspace.packages() {
      let idx = graph.add_node(package.name.clone());
      node_map.insert(package.name.clone(), idx);
    }

    for package in workspace.packages() {
      let consumer_idx = node_map[&package.name];
      for (kind, dep_name, _range) in package.manifest.dependency_entries() {
        if let Some(&provider_idx) = node_map.get(dep_name) {
          graph.add_edge(consumer_idx, provider_idx, kind);
        }
      }
    }

    Self { graph, node_map }
  }

  /// Reject cycles among install-time edges
  ///
  /// Development edges are excluded: a dev-only cycle (a common fixture
  /// arrangement) does not affect published artifacts or publish order.
  pub fn assert_acyclic(&self) -> Result<(), WorkspaceError> {
    let filtered = self.filtered(&[DependencyKind::Runtime, DependencyKind::Peer, DependencyKind::Optional]);
    toposort(&filtered, None)
      .map(|_| ())
      .map_err(|cycle| WorkspaceError::DependencyCycle {
        package: filtered[cycle.node_id()].clone(),
      })
  }

  /// Consumers of a provider along the given edge kinds
  pub fn dependents_of(&self, name: &str, kinds: &[DependencyKind]) -> Vec<String> {
    let Some(&idx) = self.node_map.get(name) else {
      return Vec::new();
    };

    let mut dependents: Vec<String> = self
      .graph
      .edges_directed(idx, Direction::Incoming)
      .filter(|edge| kinds.contains(edge.weight()))
      .map(|edge| self.graph[edge.source()].clone())
      .collect();
    dependents.sort();
    dependents.dedup();
    dependents
  }

  /// Group a subset of packages by dependency level
  ///
  /// Level 0 contains packages whose in-subset providers are empty; level N
  /// packages only depend (within the subset) on packages of lower levels.
  /// Groups come back providers-first, members sorted by name.
  pub fn dependency_levels(&self, subset: &BTreeSet<String>, include_dev: bool) -> Result<Vec<Vec<String>>, WorkspaceError> {
    let mut kinds = vec![DependencyKind::Runtime, DependencyKind::Peer, DependencyKind::Optional];
    if include_dev {
      kinds.push(DependencyKind::Development);
    }

    let filtered = self.filtered(&kinds);
    let order = toposort(&filtered, None).map_err(|cycle| WorkspaceError::DependencyCycle {
      package: filtered[cycle.node_id()].clone(),
    })?;

    // Longest provider chain within the subset, walked providers-first.
    let mut level_of: HashMap<NodeIndex, usize> = HashMap::new();
    for idx in order.into_iter().rev() {
      if !subset.contains(&filtered[idx]) {
        continue;
      }
      let level = filtered
        .edges_directed(idx, Direction::Outgoing)
        .filter(|edge| subset.contains(&filtered[edge.target()]))
        .filter_map(|edge| level_of.get(&edge.target()))
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);
      level_of.insert(idx, level);
    }

    let depth = level_of.values().max().map(|max| max + 1).unwrap_or(0);
    let mut levels = vec![Vec::new(); depth];
    for (idx, level) in level_of {
      levels[level].push(filtered[idx].clone());
    }
    for group in &mut levels {
      group.sort();
    }
    Ok(levels)
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Copy of the graph keeping only edges of the given kinds
  fn filtered(&self, kinds: &[DependencyKind]) -> DiGraph<String, DependencyKind> {
    self.graph.filter_map(
      |_, node| Some(node.clone()),
      |_, kind| kinds.contains(kind).then_some(*kind),
    )
  }
}
