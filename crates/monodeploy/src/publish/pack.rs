//! Archive production behind the `Packer` seam
//!
//! The scheduler drives `prepublish -> pack -> upload -> postpublish`; the
//! archive format and lifecycle-script execution live behind this trait. The
//! npm implementation stages the package into a temp directory with the
//! publish manifest swapped in, so the archive never contains
//! workspace-protocol specifiers.

use crate::workspace::Package;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Lifecycle and archive production for one package
#[async_trait]
pub trait Packer: Send + Sync {
  /// Run the package's prepublish lifecycle step
  async fn prepublish(&self, package: &Package) -> Result<()>;

  /// Produce the archive from the package's publish manifest
  async fn pack(&self, package: &Package) -> Result<Vec<u8>>;

  /// Run the package's postpublish lifecycle step
  async fn postpublish(&self, package: &Package) -> Result<()>;
}

/// Packer shelling out to the npm CLI
pub struct NpmPacker;

impl NpmPacker {
  async fn run_script(&self, package: &Package, script: &str) -> Result<()> {
    let output = Command::new("npm")
      .current_dir(&package.root)
      .args(["run", script, "--if-present"])
      .output()
      .await
      .with_context(|| format!("failed to execute npm run {script}"))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      bail!("npm run {} failed for {}: {}", script, package.name, stderr.trim());
    }
    Ok(())
  }
}

#[async_trait]
impl Packer for NpmPacker {
  async fn prepublish(&self, package: &Package) -> Result<()> {
    self.run_script(package, "prepublishOnly").await
  }

  async fn pack(&self, package: &Package) -> Result<Vec<u8>> {
    // Stage into a temp dir with the rewritten manifest; npm pack must never
    // see the on-disk workspace-protocol specifiers.
    let staging = tempfile::Builder::new()
      .prefix("monodeploy-pack-")
      .tempdir()
      .context("failed to create staging directory")?;

    let staged_root = staging.path().join("package");
    copy_package_tree(&package.root, &staged_root)
      .with_context(|| format!("failed to stage {} for packing", package.name))?;
    package
      .publish_manifest
      .save_atomic(&staged_root.join("package.json"))
      .context("failed to write publish manifest")?;

    let dest = staging.path().join("out");
    fs::create_dir_all(&dest).context("failed to create pack destination")?;

    let output = Command::new("npm")
      .current_dir(&staged_root)
      .args(["pack", "--pack-destination"])
      .arg(&dest)
      .output()
      .await
      .context("failed to execute npm pack")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      bail!("npm pack failed for {}: {}", package.name, stderr.trim());
    }

    let tarball_name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let tarball_path = dest.join(&tarball_name);
    debug!(package = %package.name, tarball = %tarball_name, "packed archive");

    fs::read(&tarball_path).with_context(|| format!("failed to read packed archive {tarball_name}"))
  }

  async fn postpublish(&self, package: &Package) -> Result<()> {
    self.run_script(package, "postpublish").await
  }
}

/// Copy a package directory, skipping installed modules and VCS metadata
fn copy_package_tree(from: &Path, to: &Path) -> std::io::Result<()> {
  fs::create_dir_all(to)?;
  for entry in fs::read_dir(from)? {
    let entry = entry?;
    let name = entry.file_name();
    if name == "node_modules" || name == ".git" {
      continue;
    }
    let source = entry.path();
    let target = to.join(&name);
    if entry.file_type()?.is_dir() {
      copy_package_tree(&source, &target)?;
    } else {
      fs::copy(&source, &target)?;
    }
  }
  Ok(())
}
