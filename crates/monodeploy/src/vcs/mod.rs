//! Source-control abstraction for the release pipeline
//!
//! The pipeline only ever talks to source control through [`SourceControl`];
//! the git implementation lives in [`git`]. Relative paths returned from the
//! diff operations are resolved against the workspace root by the caller.

pub mod git;

use async_trait::async_trait;
use std::path::PathBuf;

/// One commit in the analyzed range
#[derive(Debug, Clone)]
pub struct Commit {
  pub sha: String,
  pub message: String,
}

impl Commit {
  /// First line of the commit message
  pub fn summary(&self) -> &str {
    self.message.lines().next().unwrap_or("")
  }
}

/// Operations the release pipeline needs from source control
///
/// All operations are fallible; adapter internals report through `anyhow`
/// and the pipeline maps failures onto its own error kinds.
#[async_trait]
pub trait SourceControl: Send + Sync {
  /// Paths changed between two revisions, relative to the workspace root
  async fn diff_files(&self, base: &str, head: &str) -> anyhow::Result<Vec<PathBuf>>;

  /// Commits between two revisions
  async fn log(&self, base: &str, head: &str) -> anyhow::Result<Vec<Commit>>;

  /// Paths changed by a single commit
  async fn changed_files(&self, sha: &str) -> anyhow::Result<Vec<PathBuf>>;

  /// Resolve a ref to a full commit SHA
  async fn resolve_sha(&self, reference: &str) -> anyhow::Result<String>;

  /// Stage the given paths
  async fn add_paths(&self, paths: &[PathBuf]) -> anyhow::Result<()>;

  /// Create a commit from the staged paths
  async fn commit(&self, message: &str) -> anyhow::Result<()>;

  /// Create an annotated tag at HEAD
  async fn create_annotated_tag(&self, name: &str, message: &str) -> anyhow::Result<()>;

  /// Push the given refs to a remote as one atomic operation
  async fn push(&self, remote: &str, refs: &[String]) -> anyhow::Result<()>;

  /// SHA of the commit a tag points at, if the tag exists
  async fn tag_exists(&self, name: &str) -> anyhow::Result<Option<String>>;
}
