//! Shared fixtures for pipeline integration tests
//!
//! A three-package monorepo in a tempdir (`pkg-3` depends on `pkg-2`), a
//! scriptable source-control stub and a recording packer. The registry is
//! the library's own `MemoryRegistry`.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use monodeploy::core::config::MonodeployConfig;
use monodeploy::pipeline::DeployContext;
use monodeploy::publish::pack::Packer;
use monodeploy::registry::MemoryRegistry;
use monodeploy::vcs::{Commit, SourceControl};
use monodeploy::workspace::Package;
use semver::Version;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A monorepo rooted in a tempdir
pub struct TestWorkspace {
  _dir: TempDir,
  pub root: PathBuf,
}

impl TestWorkspace {
  /// Three packages, all at 0.0.1; `pkg-3` depends on `pkg-2` with `^0.0.1`
  pub fn new() -> Self {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path().to_path_buf();

    std::fs::write(
      root.join("package.json"),
      r#"{
  "name": "monorepo",
  "version": "0.0.0",
  "private": true,
  "workspaces": ["packages/*"]
}
"#,
    )
    .unwrap();

    let ws = Self { _dir: dir, root };
    ws.write_package("pkg-1", "0.0.1", &[], false);
    ws.write_package("pkg-2", "0.0.1", &[], false);
    ws.write_package("pkg-3", "0.0.1", &[("pkg-2", "^0.0.1")], false);
    ws
  }

  pub fn write_package(&self, name: &str, version: &str, deps: &[(&str, &str)], private: bool) {
    let pkg_dir = self.root.join("packages").join(name);
    std::fs::create_dir_all(&pkg_dir).unwrap();

    let mut manifest = serde_json::json!({
      "name": name,
      "version": version,
    });
    if private {
      manifest["private"] = serde_json::json!(true);
    }
    if !deps.is_empty() {
      let mut table = serde_json::Map::new();
      for (dep, range) in deps {
        table.insert(dep.to_string(), serde_json::json!(range));
      }
      manifest["dependencies"] = serde_json::Value::Object(table);
    }

    std::fs::write(
      pkg_dir.join("package.json"),
      serde_json::to_string_pretty(&manifest).unwrap() + "\n",
    )
    .unwrap();
  }

  pub fn manifest_text(&self, name: &str) -> String {
    std::fs::read_to_string(self.root.join("packages").join(name).join("package.json")).unwrap()
  }

  pub fn changelog_text(&self) -> Option<String> {
    std::fs::read_to_string(self.root.join("CHANGELOG.md")).ok()
  }
}

/// Scriptable SCM: a fixed commit range, recording all write operations
#[derive(Default)]
pub struct ScriptedScm {
  commits: Vec<Commit>,
  files: HashMap<String, Vec<PathBuf>>,
  pub tags: Mutex<BTreeMap<String, String>>,
  pub pushes: Mutex<Vec<(String, Vec<String>)>>,
  pub commits_made: Mutex<Vec<String>>,
  pub staged: Mutex<Vec<PathBuf>>,
  pub fail_push: bool,
}

pub const HEAD_SHA: &str = "headsha";

impl ScriptedScm {
  /// Each entry is one commit: `(message, changed paths)`
  pub fn new(entries: &[(&str, &[&str])]) -> Self {
    let mut commits = Vec::new();
    let mut files = HashMap::new();
    for (i, (message, paths)) in entries.iter().enumerate() {
      let sha = format!("sha-{i}");
      commits.push(Commit {
        sha: sha.clone(),
        message: message.to_string(),
      });
      files.insert(sha, paths.iter().map(PathBuf::from).collect());
    }
    Self {
      commits,
      files,
      ..Default::default()
    }
  }

  /// Pre-create a tag, as a previous run would have
  pub fn seed_tag(&self, name: &str, sha: &str) {
    self.tags.lock().unwrap().insert(name.to_string(), sha.to_string());
  }

  pub fn pushed_refs(&self) -> Vec<Vec<String>> {
    self.pushes.lock().unwrap().iter().map(|(_, refs)| refs.clone()).collect()
  }
}

#[async_trait]
impl SourceControl for ScriptedScm {
  async fn diff_files(&self, _base: &str, _head: &str) -> anyhow::Result<Vec<PathBuf>> {
    Ok(self.files.values().flatten().cloned().collect())
  }

  async fn log(&self, _base: &str, _head: &str) -> anyhow::Result<Vec<Commit>> {
    Ok(self.commits.clone())
  }

  async fn changed_files(&self, sha: &str) -> anyhow::Result<Vec<PathBuf>> {
    Ok(self.files.get(sha).cloned().unwrap_or_default())
  }

  async fn resolve_sha(&self, _reference: &str) -> anyhow::Result<String> {
    Ok(HEAD_SHA.to_string())
  }

  async fn add_paths(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
    self.staged.lock().unwrap().extend_from_slice(paths);
    Ok(())
  }

  async fn commit(&self, message: &str) -> anyhow::Result<()> {
    self.commits_made.lock().unwrap().push(message.to_string());
    Ok(())
  }

  async fn create_annotated_tag(&self, name: &str, _message: &str) -> anyhow::Result<()> {
    self.tags.lock().unwrap().insert(name.to_string(), HEAD_SHA.to_string());
    Ok(())
  }

  async fn push(&self, remote: &str, refs: &[String]) -> anyhow::Result<()> {
    if self.fail_push {
      anyhow::bail!("remote rejected the push");
    }
    self.pushes.lock().unwrap().push((remote.to_string(), refs.to_vec()));
    Ok(())
  }

  async fn tag_exists(&self, name: &str) -> anyhow::Result<Option<String>> {
    Ok(self.tags.lock().unwrap().get(name).cloned())
  }
}

/// Packer that records pack calls and can fail one package
#[derive(Default)]
pub struct RecordingPacker {
  pub packed: Mutex<Vec<String>>,
  pub fail_pack: Option<String>,
}

#[async_trait]
impl Packer for RecordingPacker {
  async fn prepublish(&self, _package: &Package) -> anyhow::Result<()> {
    Ok(())
  }

  async fn pack(&self, package: &Package) -> anyhow::Result<Vec<u8>> {
    if self.fail_pack.as_deref() == Some(package.name.as_str()) {
      anyhow::bail!("pack exploded");
    }
    self.packed.lock().unwrap().push(package.name.clone());
    Ok(package.publish_manifest.to_json_string().into_bytes())
  }

  async fn postpublish(&self, _package: &Package) -> anyhow::Result<()> {
    Ok(())
  }
}

/// Config pointing at the test workspace with a registry URL set
pub fn test_config(root: &Path) -> MonodeployConfig {
  MonodeployConfig {
    cwd: Some(root.to_path_buf()),
    registry_url: Some("https://registry.example.test".to_string()),
    ..Default::default()
  }
}

/// Registry with every fixture package published at 0.0.1 under `latest`
pub fn seeded_registry() -> Arc<MemoryRegistry> {
  let registry = Arc::new(MemoryRegistry::new());
  for name in ["pkg-1", "pkg-2", "pkg-3"] {
    registry.set_version(name, "latest", Version::new(0, 0, 1));
  }
  registry
}

pub fn build_context(
  config: MonodeployConfig,
  scm: Arc<ScriptedScm>,
  registry: Arc<MemoryRegistry>,
  packer: Arc<RecordingPacker>,
) -> DeployContext {
  DeployContext::new(config, scm, registry, packer)
}
