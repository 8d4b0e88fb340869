//! Dependency propagation: expand explicit strategies to dependents
//!
//! Breadth-first along reverse edges from the explicitly-changed packages.
//! A dependent that is not yet in the map receives a patch bump; an existing
//! entry is never lowered. Runtime and peer edges propagate, optional edges
//! do not, and development edges only get their ranges rewritten later.
//! Private dependents are bumped locally but never produce a release.

use crate::analyze::{StrategyMap, StrategyOrigin, VersionStrategy};
use crate::core::error::DeployResult;
use crate::version::bump::BumpLevel;
use crate::workspace::graph::PackageGraph;
use crate::workspace::manifest::DependencyKind;
use std::collections::VecDeque;
use tracing::debug;

const PROPAGATING_KINDS: [DependencyKind; 2] = [DependencyKind::Runtime, DependencyKind::Peer];

/// Expand the explicit map along reverse dependency edges, in place
///
/// Cycles are rejected before traversal; the walk enqueues each package at
/// most once per newly-inserted entry, so it reaches a fixed point in at most
/// V steps.
pub fn propagate(graph: &PackageGraph, strategies: &mut StrategyMap) -> DeployResult<()> {
  graph.assert_acyclic()?;

  let mut queue: VecDeque<String> = strategies.keys().cloned().collect();

  while let Some(provider) = queue.pop_front() {
    for dependent in graph.dependents_of(&provider, &PROPAGATING_KINDS) {
      if strategies.contains_key(&dependent) {
        // Existing entries already carry patch or higher; never lower them.
        continue;
      }
      debug!(package = %dependent, via = %provider, "propagating patch bump");
      let strategy = VersionStrategy::new(BumpLevel::Patch, Vec::new(), StrategyOrigin::Propagated)
        .expect("patch is never the no-op level");
      strategies.insert(dependent.clone(), strategy);
      queue.push_back(dependent);
    }
  }

  Ok(())
}
