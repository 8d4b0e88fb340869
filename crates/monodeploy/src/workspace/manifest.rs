//! Package manifest model and atomic persistence
//!
//! A manifest is the package.json of one workspace package. The model keeps
//! the four dependency tables separate by kind and round-trips unknown fields
//! so that scripts, metadata and publisher-specific sections survive edits.

use crate::core::error::WorkspaceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Dependency spec kind, matching the manifest's four dependency tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
  Runtime,
  Development,
  Peer,
  Optional,
}

impl DependencyKind {
  /// All kinds, in manifest-table order
  pub const ALL: [DependencyKind; 4] = [
    DependencyKind::Runtime,
    DependencyKind::Development,
    DependencyKind::Peer,
    DependencyKind::Optional,
  ];
}

fn is_false(value: &bool) -> bool {
  !*value
}

/// In-memory model of a package manifest file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
  pub name: String,
  pub version: String,

  #[serde(default, skip_serializing_if = "is_false")]
  pub private: bool,

  /// Workspace member globs; only meaningful on the monorepo root manifest
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub workspaces: Vec<String>,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub dependencies: BTreeMap<String, String>,

  #[serde(default, rename = "devDependencies", skip_serializing_if = "BTreeMap::is_empty")]
  pub dev_dependencies: BTreeMap<String, String>,

  #[serde(default, rename = "peerDependencies", skip_serializing_if = "BTreeMap::is_empty")]
  pub peer_dependencies: BTreeMap<String, String>,

  #[serde(
    default,
    rename = "optionalDependencies",
    skip_serializing_if = "BTreeMap::is_empty"
  )]
  pub optional_dependencies: BTreeMap<String, String>,

  /// Everything else (scripts, publishConfig, metadata) passes through untouched
  #[serde(flatten)]
  pub rest: serde_json::Map<String, serde_json::Value>,
}

impl PackageManifest {
  /// Minimal manifest for a named package
  pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: version.into(),
      private: false,
      workspaces: Vec::new(),
      dependencies: BTreeMap::new(),
      dev_dependencies: BTreeMap::new(),
      peer_dependencies: BTreeMap::new(),
      optional_dependencies: BTreeMap::new(),
      rest: serde_json::Map::new(),
    }
  }

  /// Load and parse a manifest file
  pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
    let content = fs::read_to_string(path).map_err(|_| WorkspaceError::ManifestMissing {
      path: path.to_path_buf(),
    })?;
    serde_json::from_str(&content).map_err(|e| WorkspaceError::ManifestInvalid {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })
  }

  /// Serialize the manifest the way it is written to disk
  pub fn to_json_string(&self) -> String {
    let mut out = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
  }

  /// Write the manifest atomically: write-temp then rename within the package root
  pub fn save_atomic(&self, path: &Path) -> std::io::Result<()> {
    write_atomic(path, &self.to_json_string())
  }

  /// Dependency table for a kind
  pub fn deps_of_kind(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
    match kind {
      DependencyKind::Runtime => &self.dependencies,
      DependencyKind::Development => &self.dev_dependencies,
      DependencyKind::Peer => &self.peer_dependencies,
      DependencyKind::Optional => &self.optional_dependencies,
    }
  }

  /// Mutable dependency table for a kind
  pub fn deps_of_kind_mut(&mut self, kind: DependencyKind) -> &mut BTreeMap<String, String> {
    match kind {
      DependencyKind::Runtime => &mut self.dependencies,
      DependencyKind::Development => &mut self.dev_dependencies,
      DependencyKind::Peer => &mut self.peer_dependencies,
      DependencyKind::Optional => &mut self.optional_dependencies,
    }
  }

  /// Iterate every declared dependency as `(kind, name, range)`
  pub fn dependency_entries(&self) -> impl Iterator<Item = (DependencyKind, &str, &str)> {
    DependencyKind::ALL.into_iter().flat_map(move |kind| {
      self
        .deps_of_kind(kind)
        .iter()
        .map(move |(name, range)| (kind, name.as_str(), range.as_str()))
    })
  }
}

/// Write a file atomically via a sibling temp file and rename
pub fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
  use std::io::Write;
  tmp.write_all(content.as_bytes())?;
  tmp.persist(path).map_err(|e| e.error)?;
  Ok(())
}

/// Whether a dependency range uses the workspace protocol
pub fn is_workspace_protocol(range: &str) -> bool {
  range.starts_with("workspace:")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_manifest_with_all_tables() {
    let manifest: PackageManifest = serde_json::from_str(
      r#"{
        "name": "@scope/pkg-a",
        "version": "1.2.3",
        "dependencies": { "left-pad": "^1.0.0" },
        "devDependencies": { "jest": "~29.0.0" },
        "peerDependencies": { "react": "^18.0.0" },
        "optionalDependencies": { "fsevents": "2.3.2" },
        "scripts": { "build": "tsc" }
      }"#,
    )
    .unwrap();

    assert_eq!(manifest.name, "@scope/pkg-a");
    assert_eq!(manifest.version, "1.2.3");
    assert_eq!(manifest.dependencies["left-pad"], "^1.0.0");
    assert_eq!(manifest.dev_dependencies["jest"], "~29.0.0");
    assert_eq!(manifest.peer_dependencies["react"], "^18.0.0");
    assert_eq!(manifest.optional_dependencies["fsevents"], "2.3.2");
    assert!(manifest.rest.contains_key("scripts"));
  }

  #[test]
  fn test_roundtrip_preserves_unknown_fields() {
    let input = r#"{
      "name": "pkg",
      "version": "0.1.0",
      "publishConfig": { "access": "public" }
    }"#;
    let manifest: PackageManifest = serde_json::from_str(input).unwrap();
    let out = manifest.to_json_string();
    assert!(out.contains("publishConfig"));
  }

  #[test]
  fn test_dependency_entries_cover_every_kind() {
    let mut manifest = PackageManifest::new("pkg", "0.1.0");
    manifest.dependencies.insert("a".to_string(), "^1.0.0".to_string());
    manifest.dev_dependencies.insert("b".to_string(), "~2.0.0".to_string());
    manifest.peer_dependencies.insert("c".to_string(), "3.0.0".to_string());
    manifest
      .optional_dependencies
      .insert("d".to_string(), "workspace:*".to_string());

    let entries: Vec<_> = manifest.dependency_entries().collect();
    assert_eq!(entries.len(), 4);
    assert!(entries.contains(&(DependencyKind::Runtime, "a", "^1.0.0")));
    assert!(entries.contains(&(DependencyKind::Optional, "d", "workspace:*")));
  }

  #[test]
  fn test_workspace_protocol_detection() {
    assert!(is_workspace_protocol("workspace:*"));
    assert!(is_workspace_protocol("workspace:^1.2.3"));
    assert!(!is_workspace_protocol("^1.2.3"));
  }

  #[test]
  fn test_save_atomic_writes_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    let manifest = PackageManifest::new("pkg", "0.1.0");
    manifest.save_atomic(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with('\n'));
    let reloaded = PackageManifest::load(&path).unwrap();
    assert_eq!(reloaded, manifest);
  }
}
