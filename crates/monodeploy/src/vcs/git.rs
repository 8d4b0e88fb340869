//! Git implementation of the source-control contract
//!
//! Hybrid backend: gix (gitoxide) for repository discovery and ref/tag
//! resolution, the `git` binary for diff, log and the write operations.

use crate::vcs::{Commit, SourceControl};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Git adapter rooted at the repository working directory
pub struct GitAdapter {
  root: PathBuf,
}

impl GitAdapter {
  /// Discover the repository containing `path`
  pub fn open(path: &Path) -> Result<Self> {
    let repo = gix::discover(path).with_context(|| format!("no git repository found at {}", path.display()))?;
    let root = repo
      .work_dir()
      .context("repository has no working directory")?
      .to_path_buf();
    Ok(Self { root })
  }

  /// Repository working directory
  pub fn root(&self) -> &Path {
    &self.root
  }

  async fn git(&self, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
      .current_dir(&self.root)
      .args(args)
      .output()
      .await
      .with_context(|| format!("failed to execute git {}", args.first().unwrap_or(&"")))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

#[async_trait]
impl SourceControl for GitAdapter {
  async fn diff_files(&self, base: &str, head: &str) -> Result<Vec<PathBuf>> {
    let range = format!("{base}...{head}");
    let stdout = self.git(&["diff", "--name-only", &range]).await?;
    Ok(
      stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect(),
    )
  }

  async fn log(&self, base: &str, head: &str) -> Result<Vec<Commit>> {
    // %x00 separates commits, %x01 separates sha from message. Full messages
    // matter: subjects alone would hide BREAKING CHANGE footers.
    let range = format!("{base}..{head}");
    let stdout = self.git(&["log", "--format=%H%x01%B%x00", &range]).await?;
    Ok(
      stdout
        .split('\0')
        .filter_map(|record| {
          let (sha, message) = record.trim().split_once('\u{1}')?;
          Some(Commit {
            sha: sha.trim().to_string(),
            message: message.trim().to_string(),
          })
        })
        .filter(|commit| !commit.sha.is_empty())
        .collect(),
    )
  }

  async fn changed_files(&self, sha: &str) -> Result<Vec<PathBuf>> {
    let stdout = self
      .git(&["diff-tree", "--no-commit-id", "--name-only", "-r", "--root", sha])
      .await?;
    Ok(
      stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect(),
    )
  }

  async fn resolve_sha(&self, reference: &str) -> Result<String> {
    let stdout = self.git(&["rev-parse", "--verify", reference]).await?;
    Ok(stdout.trim().to_string())
  }

  async fn add_paths(&self, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
      return Ok(());
    }
    let mut args = vec!["add".to_string(), "--".to_string()];
    for path in paths {
      args.push(path.to_string_lossy().into_owned());
    }
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    self.git(&arg_refs).await?;
    Ok(())
  }

  async fn commit(&self, message: &str) -> Result<()> {
    self.git(&["commit", "-m", message]).await?;
    Ok(())
  }

  async fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
    self.git(&["tag", "-a", name, "-m", message]).await?;
    Ok(())
  }

  async fn push(&self, remote: &str, refs: &[String]) -> Result<()> {
    if refs.is_empty() {
      return Ok(());
    }
    let mut args = vec!["push".to_string(), "--atomic".to_string(), remote.to_string()];
    args.extend(refs.iter().cloned());
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    self.git(&arg_refs).await?;
    Ok(())
  }

  async fn tag_exists(&self, name: &str) -> Result<Option<String>> {
    let repo = gix::open(&self.root).context("failed to reopen repository")?;
    match repo.find_reference(&format!("refs/tags/{name}")) {
      Ok(reference) => {
        let id = reference
          .into_fully_peeled_id()
          .with_context(|| format!("failed to peel tag '{name}'"))?;
        Ok(Some(id.to_string()))
      }
      Err(_) => Ok(None),
    }
  }
}
