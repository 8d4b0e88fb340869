//! Manifest snapshot and restore
//!
//! Before any manifest mutation the orchestrator snapshots every file that
//! may be touched, keyed uniquely per invocation. Restore rewrites the exact
//! prior bytes, so a rolled-back run leaves manifests byte-identical.

use crate::workspace::manifest::write_atomic;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// In-memory snapshot of manifest files
#[derive(Debug)]
pub struct ManifestBackup {
  key: String,
  entries: HashMap<PathBuf, String>,
}

impl ManifestBackup {
  /// Snapshot the given manifest files
  pub fn snapshot<'a>(paths: impl IntoIterator<Item = &'a Path>) -> std::io::Result<Self> {
    let key = format!("{}-{}", std::process::id(), chrono::Utc::now().timestamp_millis());
    let mut entries = HashMap::new();
    for path in paths {
      let content = fs::read_to_string(path)?;
      entries.insert(path.to_path_buf(), content);
    }
    debug!(key = %key, files = entries.len(), "snapshotted manifests");
    Ok(Self { key, entries })
  }

  /// Unique backup key for this invocation
  pub fn key(&self) -> &str {
    &self.key
  }

  /// Number of files held
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Write every snapshotted file back to its original path
  pub fn restore(&self) -> std::io::Result<()> {
    for (path, content) in &self.entries {
      write_atomic(path, content)?;
    }
    debug!(key = %self.key, files = self.entries.len(), "restored manifests");
    Ok(())
  }

  /// Drop the snapshot without touching disk
  pub fn discard(self) {
    debug!(key = %self.key, "discarded manifest backup");
  }
}
