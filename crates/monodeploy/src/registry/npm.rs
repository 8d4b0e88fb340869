//! npm registry adapter backed by the npm CLI
//!
//! Version lookup shells out to `npm view`, uploads go through `npm publish`
//! on a temp tarball. Authentication comes from the user's npmrc; stderr is
//! scrubbed through [`redact_credentials`] before it can reach an error
//! message. Retrying 5xx responses is npm's job, not ours.

use crate::core::config::AccessLevel;
use crate::registry::{Registry, redact_credentials};
use crate::workspace::manifest::PackageManifest;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use semver::Version;
use std::io::Write;
use tokio::process::Command;
use tracing::debug;

/// Registry adapter invoking the npm CLI
pub struct NpmRegistry {
  registry_url: String,
}

impl NpmRegistry {
  pub fn new(registry_url: impl Into<String>) -> Self {
    Self {
      registry_url: registry_url.into(),
    }
  }

  async fn npm(&self, args: &[&str]) -> Result<std::process::Output> {
    Command::new("npm")
      .args(args)
      .args(["--registry", self.registry_url.as_str()])
      .output()
      .await
      .context("failed to execute npm")
  }
}

#[async_trait]
impl Registry for NpmRegistry {
  async fn fetch_version(&self, name: &str, dist_tag: &str) -> Result<Option<Version>> {
    let spec = format!("{name}@{dist_tag}");
    let output = self.npm(&["view", &spec, "version", "--json"]).await?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      // npm reports E404 for packages that were never published.
      if stderr.contains("E404") || stderr.contains("404") {
        return Ok(None);
      }
      bail!("npm view {} failed: {}", spec, redact_credentials(stderr.trim()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
      return Ok(None);
    }

    let raw: String = serde_json::from_str(stdout).with_context(|| format!("unexpected npm view output for {spec}"))?;
    let version = raw.parse().with_context(|| format!("invalid version '{raw}' for {name}"))?;
    Ok(Some(version))
  }

  async fn publish(
    &self,
    name: &str,
    archive: &[u8],
    manifest: &PackageManifest,
    dist_tag: &str,
    access: AccessLevel,
  ) -> Result<()> {
    let mut tarball = tempfile::Builder::new()
      .prefix("monodeploy-")
      .suffix(".tgz")
      .tempfile()
      .context("failed to create temp tarball")?;
    tarball.write_all(archive).context("failed to write temp tarball")?;

    let tarball_path = tarball.path().to_string_lossy().into_owned();
    let access_flag = match access {
      AccessLevel::Public => "public",
      AccessLevel::Restricted => "restricted",
    };

    debug!(package = name, version = %manifest.version, dist_tag, "uploading archive");

    let output = self
      .npm(&["publish", &tarball_path, "--tag", dist_tag, "--access", access_flag])
      .await?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      bail!(
        "npm publish {}@{} failed: {}",
        name,
        manifest.version,
        redact_credentials(stderr.trim())
      );
    }

    Ok(())
  }
}
