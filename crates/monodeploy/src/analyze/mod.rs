//! Change analysis: commits + diffs to per-package version strategies

pub mod analyzer;
pub mod classifier;
pub mod propagate;

use crate::version::bump::BumpLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a strategy came from the diff or from dependency closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyOrigin {
  Explicit,
  Propagated,
}

/// Per-package record of how and why the version moves
///
/// A package absent from the map is unaffected; a strategy never carries
/// `BumpLevel::None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionStrategy {
  pub bump_level: BumpLevel,
  pub driving_commits: Vec<String>,
  pub origin: StrategyOrigin,
}

impl VersionStrategy {
  /// Build a strategy, refusing the no-op level
  pub fn new(bump_level: BumpLevel, driving_commits: Vec<String>, origin: StrategyOrigin) -> Option<Self> {
    (bump_level != BumpLevel::None).then_some(Self {
      bump_level,
      driving_commits,
      origin,
    })
  }
}

/// Affected package name → strategy, name-ordered for reproducible iteration
pub type StrategyMap = BTreeMap<String, VersionStrategy>;
