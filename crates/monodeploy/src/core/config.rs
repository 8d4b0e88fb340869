//! Configuration for monodeploy, stored in monodeploy.toml
//!
//! Every knob the pipeline recognises lives here. The CLI loads the file when
//! present, applies flag overrides, then calls [`MonodeployConfig::validate`]
//! before handing the config to the orchestrator.

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Registry access level for published packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
  #[default]
  Public,
  Restricted,
}

/// Git-related options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitOptions {
  /// Baseline revision for change analysis
  pub base_branch: String,
  /// Head revision for change analysis
  pub commit_sha: String,
  /// Remote to push the release commit and tags to
  pub remote: String,
  /// Whether to push at all
  pub push: bool,
}

impl Default for GitOptions {
  fn default() -> Self {
    Self {
      base_branch: "main".to_string(),
      commit_sha: "HEAD".to_string(),
      remote: "origin".to_string(),
      push: true,
    }
  }
}

/// Configuration for a monodeploy invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonodeployConfig {
  /// Workspace root; current directory when unset
  pub cwd: Option<PathBuf>,
  /// Suppress registry uploads, commits and tag pushes
  pub dry_run: bool,
  pub git: GitOptions,
  /// Named conventional-commits preset; `None` selects the default header heuristic
  pub conventional_changelog_config: Option<String>,
  /// Where to dump the applied strategies as JSON, when set
  pub changeset_filename: Option<PathBuf>,
  /// Repo changelog file, relative to the workspace root
  pub changelog_filename: PathBuf,
  pub access: AccessLevel,
  /// Registry base URL; `None` disables pack and upload entirely
  pub registry_url: Option<String>,
  /// Force-disable the registry even when a URL is configured
  pub no_registry: bool,
  /// Keep version bumps on disk after a successful run
  pub persist_versions: bool,
  /// Cap on simultaneous archive uploads
  pub max_concurrent_writes: usize,
  /// Cap on simultaneous per-package pipelines; 0 means unbounded
  pub jobs: usize,
  /// Publish dependency groups strictly before their dependents
  pub topological: bool,
  /// Include development edges when computing topological groups
  pub topological_dev: bool,
  /// Produce prerelease versions under the prerelease dist-tag
  pub prerelease: bool,
  /// Dist-tag used while in prerelease mode
  pub prerelease_npm_tag: String,
  /// Commit manifest and changelog updates as part of recording
  pub auto_commit: bool,
  /// Commit message template; the released package list is appended
  pub auto_commit_message: String,
  /// Plugin names to enable (registration itself is a library API)
  pub plugins: Vec<String>,
  /// Timeout in seconds applied to each external call
  pub timeout_secs: u64,
}

impl Default for MonodeployConfig {
  fn default() -> Self {
    Self {
      cwd: None,
      dry_run: false,
      git: GitOptions::default(),
      conventional_changelog_config: None,
      changeset_filename: None,
      changelog_filename: PathBuf::from("CHANGELOG.md"),
      access: AccessLevel::Public,
      registry_url: None,
      no_registry: false,
      persist_versions: false,
      max_concurrent_writes: 1,
      jobs: 0,
      topological: false,
      topological_dev: false,
      prerelease: false,
      prerelease_npm_tag: "next".to_string(),
      auto_commit: false,
      auto_commit_message: "chore: release [skip ci]".to_string(),
      plugins: Vec::new(),
      timeout_secs: 600,
    }
  }
}

impl MonodeployConfig {
  /// Load config from `monodeploy.toml` under the given directory
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    let config_path = dir.join("monodeploy.toml");
    let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Unreadable {
      path: config_path.clone(),
      reason: e.to_string(),
    })?;
    let config: MonodeployConfig = toml::from_str(&content).map_err(|e| ConfigError::Invalid {
      path: config_path,
      reason: e.to_string(),
    })?;
    Ok(config)
  }

  /// Check if a config file exists at the given directory
  pub fn exists(dir: &Path) -> bool {
    dir.join("monodeploy.toml").exists()
  }

  /// Validate option combinations before the pipeline starts
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_concurrent_writes == 0 {
      return Err(ConfigError::InvalidOption {
        option: "max_concurrent_writes".to_string(),
        reason: "must be at least 1".to_string(),
      });
    }
    if self.auto_commit && !self.persist_versions {
      return Err(ConfigError::InvalidOption {
        option: "auto_commit".to_string(),
        reason: "requires persist_versions, otherwise the committed manifests would be rolled back".to_string(),
      });
    }
    if self.prerelease && self.prerelease_npm_tag == "latest" {
      return Err(ConfigError::InvalidOption {
        option: "prerelease_npm_tag".to_string(),
        reason: "prerelease versions may not be published under 'latest'".to_string(),
      });
    }
    if self.timeout_secs == 0 {
      return Err(ConfigError::InvalidOption {
        option: "timeout_secs".to_string(),
        reason: "must be at least 1 second".to_string(),
      });
    }
    Ok(())
  }

  /// Dist-tag the pipeline publishes and resolves versions under
  pub fn dist_tag(&self) -> &str {
    if self.prerelease {
      &self.prerelease_npm_tag
    } else {
      "latest"
    }
  }

  /// Whether pack/upload run at all for this invocation
  pub fn registry_enabled(&self) -> bool {
    self.registry_url.is_some() && !self.no_registry
  }
}
