//! Workspace model: package enumeration, manifests and path ownership
//!
//! The workspace is discovered from the monorepo root manifest, whose
//! `workspaces` globs name the member packages. Each member carries two
//! manifest values: the on-disk manifest (workspace-protocol specifiers
//! preserved) and the publish manifest (concrete rewritten ranges) that is
//! what actually gets packed for upload.

pub mod graph;
pub mod manifest;

use crate::core::error::WorkspaceError;
use manifest::PackageManifest;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One workspace package
#[derive(Debug, Clone)]
pub struct Package {
  /// Canonical name, scope included
  pub name: String,
  /// Package directory
  pub root: PathBuf,
  /// Path to the manifest file
  pub manifest_path: PathBuf,
  /// On-disk manifest; workspace-protocol specifiers stay as written
  pub manifest: PackageManifest,
  /// Manifest used for packing; diverges from `manifest` once ranges are rewritten
  pub publish_manifest: PackageManifest,
}

impl Package {
  /// Private packages never publish but participate in the graph
  pub fn is_private(&self) -> bool {
    self.manifest.private
  }

  /// Current on-disk version string
  pub fn version(&self) -> &str {
    &self.manifest.version
  }
}

/// The monorepo workspace
#[derive(Debug, Clone)]
pub struct Workspace {
  pub root: PathBuf,
  packages: BTreeMap<String, Package>,
}

impl Workspace {
  /// Enumerate workspace packages from the root manifest's member globs
  pub fn load(root: &Path) -> Result<Self, WorkspaceError> {
    let root_manifest = PackageManifest::load(&root.join("package.json"))?;

    let mut packages = BTreeMap::new();
    for pattern in &root_manifest.workspaces {
      let full_pattern = root.join(pattern).join("package.json");
      let full_pattern = full_pattern.to_string_lossy().into_owned();
      let matches = glob::glob(&full_pattern).map_err(|e| WorkspaceError::ManifestInvalid {
        path: root.join("package.json"),
        reason: format!("invalid workspaces glob '{pattern}': {e}"),
      })?;

      for entry in matches.flatten() {
        let manifest = PackageManifest::load(&entry)?;
        let package_root = entry
          .parent()
          .map(Path::to_path_buf)
          .unwrap_or_else(|| root.to_path_buf());

        let package = Package {
          name: manifest.name.clone(),
          root: package_root,
          manifest_path: entry,
          publish_manifest: manifest.clone(),
          manifest,
        };
        let name = package.name.clone();
        if packages.insert(name.clone(), package).is_some() {
          return Err(WorkspaceError::DuplicatePackage { name });
        }
      }
    }

    Ok(Self {
      root: root.to_path_buf(),
      packages,
    })
  }

  /// Build a workspace from pre-constructed packages (tests, embedders)
  pub fn from_packages(root: PathBuf, members: Vec<Package>) -> Result<Self, WorkspaceError> {
    let mut packages = BTreeMap::new();
    for package in members {
      let name = package.name.clone();
      if packages.insert(name.clone(), package).is_some() {
        return Err(WorkspaceError::DuplicatePackage { name });
      }
    }
    Ok(Self { root, packages })
  }

  pub fn package(&self, name: &str) -> Option<&Package> {
    self.packages.get(name)
  }

  pub fn package_mut(&mut self, name: &str) -> Option<&mut Package> {
    self.packages.get_mut(name)
  }

  /// Packages in name order
  pub fn packages(&self) -> impl Iterator<Item = &Package> {
    self.packages.values()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.packages.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.packages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }

  /// Resolve the package owning a repo-relative (or absolute) path
  ///
  /// Longest-prefix match over package roots, so nested package layouts
  /// attribute files to the innermost package. Paths outside any member
  /// resolve to `None`.
  pub fn owner_of_path(&self, path: &Path) -> Option<&Package> {
    let absolute = if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    };

    self
      .packages
      .values()
      .filter(|pkg| absolute.starts_with(&pkg.root))
      .max_by_key(|pkg| pkg.root.components().count())
  }

  /// Internal providers of a package: dependencies that are workspace members
  pub fn internal_dependencies<'a>(
    &'a self,
    package: &'a Package,
  ) -> impl Iterator<Item = (manifest::DependencyKind, &'a Package)> {
    package
      .manifest
      .dependency_entries()
      .filter_map(|(kind, name, _)| self.packages.get(name).map(|dep| (kind, dep)))
  }
}

#[cfg(test)]
mod tests {
  use super::manifest::DependencyKind;
  use super::*;

  fn make_package(name: &str, root: &str, version: &str) -> Package {
    let manifest = PackageManifest::new(name, version);
    Package {
      name: name.to_string(),
      root: PathBuf::from(root),
      manifest_path: PathBuf::from(root).join("package.json"),
      publish_manifest: manifest.clone(),
      manifest,
    }
  }

  fn make_workspace() -> Workspace {
    let mut pkg_b = make_package("pkg-b", "/repo/packages/pkg-b", "0.1.0");
    pkg_b
      .manifest
      .dependencies
      .insert("pkg-a".to_string(), "workspace:*".to_string());
    pkg_b.publish_manifest = pkg_b.manifest.clone();

    Workspace::from_packages(
      PathBuf::from("/repo"),
      vec![make_package("pkg-a", "/repo/packages/pkg-a", "0.1.0"), pkg_b],
    )
    .unwrap()
  }

  #[test]
  fn test_owner_of_relative_path() {
    let ws = make_workspace();
    let owner = ws.owner_of_path(Path::new("packages/pkg-a/src/index.js")).unwrap();
    assert_eq!(owner.name, "pkg-a");
  }

  #[test]
  fn test_path_outside_workspace_has_no_owner() {
    let ws = make_workspace();
    assert!(ws.owner_of_path(Path::new("README.md")).is_none());
    assert!(ws.owner_of_path(Path::new("tools/script.sh")).is_none());
  }

  #[test]
  fn test_longest_prefix_wins_for_nested_roots() {
    let ws = Workspace::from_packages(
      PathBuf::from("/repo"),
      vec![
        make_package("outer", "/repo/packages/outer", "1.0.0"),
        make_package("inner", "/repo/packages/outer/inner", "1.0.0"),
      ],
    )
    .unwrap();

    let owner = ws.owner_of_path(Path::new("packages/outer/inner/lib.js")).unwrap();
    assert_eq!(owner.name, "inner");
  }

  #[test]
  fn test_duplicate_names_rejected() {
    let result = Workspace::from_packages(
      PathBuf::from("/repo"),
      vec![
        make_package("dup", "/repo/a", "1.0.0"),
        make_package("dup", "/repo/b", "1.0.0"),
      ],
    );
    assert!(matches!(result, Err(WorkspaceError::DuplicatePackage { .. })));
  }

  #[test]
  fn test_internal_dependencies() {
    let ws = make_workspace();
    let pkg_b = ws.package("pkg-b").unwrap();
    let deps: Vec<_> = ws.internal_dependencies(pkg_b).collect();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].0, DependencyKind::Runtime);
    assert_eq!(deps[0].1.name, "pkg-a");
  }
}
