//! Release recording: commit, annotated tags, atomic push
//!
//! Runs only after the scheduler succeeded. Tag creation walks releases in
//! lexicographic package order and is idempotent: a tag that already points
//! at the release commit is reused, anything else is a conflict. The push is
//! one atomic operation carrying the release commit (when auto-commit is on)
//! and every created tag; partial-tag states are never observable.

use crate::core::config::MonodeployConfig;
use crate::core::error::RecordError;
use crate::vcs::SourceControl;
use semver::Version;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// One released package, as handed to tags, changesets and plugins
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseDescriptor {
  pub name: String,
  pub previous_version: Version,
  pub new_version: Version,
  pub changelog_fragment: String,
  pub tag_name: String,
}

impl ReleaseDescriptor {
  pub fn new(name: impl Into<String>, previous_version: Version, new_version: Version, changelog_fragment: String) -> Self {
    let name = name.into();
    let tag_name = format!("{name}@{new_version}");
    Self {
      name,
      previous_version,
      new_version,
      changelog_fragment,
      tag_name,
    }
  }
}

/// What recording actually did
#[derive(Debug, Clone, Default)]
pub struct RecordOutcome {
  /// Tags pushed to the remote, in creation order
  pub pushed_tags: Vec<String>,
  /// Whether a release commit was created
  pub committed: bool,
}

/// Recording failure plus enough context for the abort ladder
#[derive(Debug)]
pub struct RecordFailure {
  pub error: RecordError,
  /// Any tag created before the failure forces ABORT_POSTPUBLISH handling
  pub tags_created: bool,
}

/// Commit staged edits, create per-package annotated tags and push
pub async fn record_releases(
  scm: &dyn SourceControl,
  config: &MonodeployConfig,
  releases: &[ReleaseDescriptor],
  staged_paths: &[PathBuf],
) -> Result<RecordOutcome, RecordFailure> {
  if releases.is_empty() {
    return Ok(RecordOutcome::default());
  }

  if config.dry_run {
    for release in releases {
      info!(tag = %release.tag_name, "dry-run: would push tag");
    }
    return Ok(RecordOutcome::default());
  }

  let fail = |error: RecordError, tags_created: bool| RecordFailure { error, tags_created };

  let mut committed = false;
  if config.auto_commit && !staged_paths.is_empty() {
    scm
      .add_paths(staged_paths)
      .await
      .map_err(|e| fail(RecordError::Commit { reason: e.to_string() }, false))?;
    scm
      .commit(&render_commit_message(&config.auto_commit_message, releases))
      .await
      .map_err(|e| fail(RecordError::Commit { reason: e.to_string() }, false))?;
    committed = true;
  }

  let head = scm
    .resolve_sha("HEAD")
    .await
    .map_err(|e| fail(RecordError::Commit { reason: e.to_string() }, false))?;

  let mut created_tags: Vec<String> = Vec::new();
  for release in releases {
    let tag = &release.tag_name;
    match scm.tag_exists(tag).await {
      Ok(Some(existing_sha)) if existing_sha == head => {
        debug!(tag = %tag, "tag already present at release commit, reusing");
        created_tags.push(tag.clone());
      }
      Ok(Some(_)) => {
        return Err(fail(RecordError::TagConflict { tag: tag.clone() }, !created_tags.is_empty()));
      }
      Ok(None) => {
        scm.create_annotated_tag(tag, tag).await.map_err(|e| {
          fail(
            RecordError::Tag {
              tag: tag.clone(),
              reason: e.to_string(),
            },
            !created_tags.is_empty(),
          )
        })?;
        created_tags.push(tag.clone());
      }
      Err(e) => {
        return Err(fail(
          RecordError::Tag {
            tag: tag.clone(),
            reason: e.to_string(),
          },
          !created_tags.is_empty(),
        ));
      }
    }
  }

  let mut pushed_tags = Vec::new();
  if config.git.push {
    let mut refs: Vec<String> = Vec::new();
    if committed {
      refs.push(format!("HEAD:{}", config.git.base_branch));
    }
    refs.extend(created_tags.iter().map(|tag| format!("refs/tags/{tag}")));

    scm.push(&config.git.remote, &refs).await.map_err(|e| {
      fail(
        RecordError::Push {
          remote: config.git.remote.clone(),
          reason: e.to_string(),
        },
        true,
      )
    })?;
    pushed_tags = created_tags;
    info!(remote = %config.git.remote, tags = pushed_tags.len(), "pushed release refs");
  }

  Ok(RecordOutcome {
    pushed_tags,
    committed,
  })
}

/// Commit message template plus the released package list
fn render_commit_message(template: &str, releases: &[ReleaseDescriptor]) -> String {
  let mut message = template.to_string();
  message.push_str("\n\n");
  for release in releases {
    message.push_str(&format!("- {}\n", release.tag_name));
  }
  message
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::collections::BTreeMap;
  use std::sync::Mutex;

  #[derive(Default)]
  struct RecordingScm {
    tags: Mutex<BTreeMap<String, String>>,
    pushes: Mutex<Vec<(String, Vec<String>)>>,
    commits: Mutex<Vec<String>>,
    staged: Mutex<Vec<PathBuf>>,
  }

  #[async_trait]
  impl SourceControl for RecordingScm {
    async fn diff_files(&self, _base: &str, _head: &str) -> anyhow::Result<Vec<PathBuf>> {
      Ok(vec![])
    }

    async fn log(&self, _base: &str, _head: &str) -> anyhow::Result<Vec<crate::vcs::Commit>> {
      Ok(vec![])
    }

    async fn changed_files(&self, _sha: &str) -> anyhow::Result<Vec<PathBuf>> {
      Ok(vec![])
    }

    async fn resolve_sha(&self, _reference: &str) -> anyhow::Result<String> {
      Ok("abc123".to_string())
    }

    async fn add_paths(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
      self.staged.lock().unwrap().extend_from_slice(paths);
      Ok(())
    }

    async fn commit(&self, message: &str) -> anyhow::Result<()> {
      self.commits.lock().unwrap().push(message.to_string());
      Ok(())
    }

    async fn create_annotated_tag(&self, name: &str, _message: &str) -> anyhow::Result<()> {
      self.tags.lock().unwrap().insert(name.to_string(), "abc123".to_string());
      Ok(())
    }

    async fn push(&self, remote: &str, refs: &[String]) -> anyhow::Result<()> {
      self.pushes.lock().unwrap().push((remote.to_string(), refs.to_vec()));
      Ok(())
    }

    async fn tag_exists(&self, name: &str) -> anyhow::Result<Option<String>> {
      Ok(self.tags.lock().unwrap().get(name).cloned())
    }
  }

  fn release(name: &str, prev: &str, next: &str) -> ReleaseDescriptor {
    ReleaseDescriptor::new(name, prev.parse().unwrap(), next.parse().unwrap(), String::new())
  }

  #[tokio::test]
  async fn test_tags_created_and_pushed() {
    let scm = RecordingScm::default();
    let config = MonodeployConfig::default();
    let releases = vec![release("pkg-1", "0.0.1", "0.1.0"), release("pkg-2", "0.0.1", "0.0.2")];

    let outcome = record_releases(&scm, &config, &releases, &[]).await.unwrap();
    assert_eq!(outcome.pushed_tags, vec!["pkg-1@0.1.0", "pkg-2@0.0.2"]);
    assert!(!outcome.committed);

    let pushes = scm.pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "origin");
    assert_eq!(pushes[0].1, vec!["refs/tags/pkg-1@0.1.0", "refs/tags/pkg-2@0.0.2"]);
  }

  #[tokio::test]
  async fn test_dry_run_is_a_no_op() {
    let scm = RecordingScm::default();
    let config = MonodeployConfig {
      dry_run: true,
      ..Default::default()
    };
    let releases = vec![release("pkg-1", "0.0.1", "0.1.0")];

    let outcome = record_releases(&scm, &config, &releases, &[]).await.unwrap();
    assert!(outcome.pushed_tags.is_empty());
    assert!(scm.tags.lock().unwrap().is_empty());
    assert!(scm.pushes.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_existing_tag_at_head_is_reused() {
    let scm = RecordingScm::default();
    scm
      .tags
      .lock()
      .unwrap()
      .insert("pkg-1@0.1.0".to_string(), "abc123".to_string());

    let config = MonodeployConfig::default();
    let releases = vec![release("pkg-1", "0.0.1", "0.1.0")];

    let outcome = record_releases(&scm, &config, &releases, &[]).await.unwrap();
    assert_eq!(outcome.pushed_tags, vec!["pkg-1@0.1.0"]);
  }

  #[tokio::test]
  async fn test_conflicting_tag_fails() {
    let scm = RecordingScm::default();
    scm
      .tags
      .lock()
      .unwrap()
      .insert("pkg-1@0.1.0".to_string(), "other-sha".to_string());

    let config = MonodeployConfig::default();
    let releases = vec![release("pkg-1", "0.0.1", "0.1.0")];

    let failure = record_releases(&scm, &config, &releases, &[]).await.unwrap_err();
    assert!(matches!(failure.error, RecordError::TagConflict { .. }));
    assert!(!failure.tags_created);
  }

  #[tokio::test]
  async fn test_auto_commit_renders_package_list() {
    let scm = RecordingScm::default();
    let config = MonodeployConfig {
      auto_commit: true,
      persist_versions: true,
      ..Default::default()
    };
    let releases = vec![release("pkg-1", "0.0.1", "0.1.0")];
    let staged = vec![PathBuf::from("packages/pkg-1/package.json")];

    let outcome = record_releases(&scm, &config, &releases, &staged).await.unwrap();
    assert!(outcome.committed);

    let commits = scm.commits.lock().unwrap();
    assert_eq!(commits.len(), 1);
    assert!(commits[0].starts_with("chore: release [skip ci]"));
    assert!(commits[0].contains("- pkg-1@0.1.0"));

    let pushes = scm.pushes.lock().unwrap();
    assert_eq!(pushes[0].1[0], "HEAD:main");
  }

  #[tokio::test]
  async fn test_push_disabled_keeps_tags_local() {
    let scm = RecordingScm::default();
    let config = MonodeployConfig {
      git: crate::core::config::GitOptions {
        push: false,
        ..Default::default()
      },
      ..Default::default()
    };
    let releases = vec![release("pkg-1", "0.0.1", "0.1.0")];

    let outcome = record_releases(&scm, &config, &releases, &[]).await.unwrap();
    assert!(outcome.pushed_tags.is_empty());
    assert_eq!(scm.tags.lock().unwrap().len(), 1);
    assert!(scm.pushes.lock().unwrap().is_empty());
  }
}
