//! Version application: next versions, range rewriting, manifest writes
//!
//! Next versions derive from the registry tag map, never from what happens to
//! be on disk. Dependency ranges are rewritten with the operator they were
//! declared with; workspace-protocol specifiers stay untouched on disk while
//! the publish manifest receives the concrete range that gets packed.

use crate::analyze::StrategyMap;
use crate::core::config::MonodeployConfig;
use crate::core::error::{DeployResult, WorkspaceError};
use crate::registry::RegistryTagMap;
use crate::workspace::Workspace;
use crate::workspace::manifest::{DependencyKind, is_workspace_protocol};
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Outcome of applying strategies to the in-memory workspace
#[derive(Debug, Clone)]
pub struct AppliedVersions {
  /// Previous registry version per bumped package
  pub previous: BTreeMap<String, Version>,
  /// New version per bumped package
  pub next: BTreeMap<String, Version>,
  /// Every package whose on-disk manifest changed (bump or range rewrite)
  pub touched: BTreeSet<String>,
}

/// Compute the next version for every package in the strategy map
pub fn compute_new_versions(
  strategies: &StrategyMap,
  tags: &RegistryTagMap,
  config: &MonodeployConfig,
) -> AppliedVersions {
  let mut previous = BTreeMap::new();
  let mut next = BTreeMap::new();

  for (name, strategy) in strategies {
    let current = tags.current(name);
    let bumped = if config.prerelease {
      strategy.bump_level.apply_prerelease(&current, &config.prerelease_npm_tag)
    } else {
      strategy.bump_level.apply(&current)
    };
    debug!(package = %name, %current, next = %bumped, "computed next version");
    previous.insert(name.clone(), current);
    next.insert(name.clone(), bumped);
  }

  AppliedVersions {
    previous,
    next,
    touched: BTreeSet::new(),
  }
}

/// Update in-memory manifests: versions plus every dependency range that
/// points at a bumped package
pub fn apply_to_workspace(workspace: &mut Workspace, applied: &mut AppliedVersions) {
  let names: Vec<String> = workspace.names().map(str::to_string).collect();

  for name in &names {
    let Some(package) = workspace.package_mut(name) else { continue };
    let mut touched = false;

    if let Some(version) = applied.next.get(name) {
      package.manifest.version = version.to_string();
      package.publish_manifest.version = version.to_string();
      touched = true;
    }

    for kind in DependencyKind::ALL {
      let rewrites: Vec<(String, String, Option<String>)> = package
        .manifest
        .deps_of_kind(kind)
        .iter()
        .filter_map(|(dep_name, range)| {
          let new_version = applied.next.get(dep_name)?;
          let publish_range = rewrite_range(range, new_version)?;
          let disk_range = (!is_workspace_protocol(range)).then(|| publish_range.clone());
          Some((dep_name.clone(), publish_range, disk_range))
        })
        .collect();

      for (dep_name, publish_range, disk_range) in rewrites {
        package
          .publish_manifest
          .deps_of_kind_mut(kind)
          .insert(dep_name.clone(), publish_range);
        if let Some(disk_range) = disk_range {
          package.manifest.deps_of_kind_mut(kind).insert(dep_name, disk_range);
          touched = true;
        }
      }
    }

    if touched {
      applied.touched.insert(name.clone());
    }
  }
}

/// Persist the touched manifests atomically, one file at a time
pub fn write_manifests(workspace: &Workspace, applied: &AppliedVersions) -> DeployResult<Vec<std::path::PathBuf>> {
  let mut written = Vec::new();
  for name in &applied.touched {
    let Some(package) = workspace.package(name) else { continue };
    package
      .manifest
      .save_atomic(&package.manifest_path)
      .map_err(|e| WorkspaceError::ManifestWrite {
        package: name.clone(),
        reason: e.to_string(),
      })?;
    written.push(package.manifest_path.clone());
  }
  Ok(written)
}

/// Rewrite a declared range for a new provider version, keeping its operator
///
/// Returns `None` for range shapes the pipeline does not manage (`>=`,
/// wildcards and friends), which are left exactly as declared.
pub fn rewrite_range(range: &str, version: &Version) -> Option<String> {
  let inner = range.strip_prefix("workspace:").unwrap_or(range);
  match inner {
    "*" if is_workspace_protocol(range) => Some(version.to_string()),
    "^" => Some(format!("^{version}")),
    "~" => Some(format!("~{version}")),
    _ if inner.starts_with('^') => Some(format!("^{version}")),
    _ if inner.starts_with('~') => Some(format!("~{version}")),
    _ if inner.parse::<Version>().is_ok() => Some(version.to_string()),
    _ => None,
  }
}
