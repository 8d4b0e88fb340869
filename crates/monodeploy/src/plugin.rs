//! Plugin host: ordered lifecycle hooks
//!
//! Hooks run sequentially in registration order after the release is
//! recorded (or after the recording no-op in dry-run). By that point the
//! release is durable, so a failing hook is logged and summarised but never
//! aborts the pipeline.

use crate::core::error::PluginError;
use crate::record::ReleaseDescriptor;
use async_trait::async_trait;
use tracing::warn;

/// A plugin supplying handlers for named hook points
#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &str;

  /// Invoked once per pipeline run with every release descriptor
  async fn on_release_available(&self, releases: &[ReleaseDescriptor]) -> anyhow::Result<()>;
}

/// Ordered registry of plugins
#[derive(Default)]
pub struct PluginHost {
  plugins: Vec<Box<dyn Plugin>>,
}

impl PluginHost {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a plugin; invocation order is registration order
  pub fn register(&mut self, plugin: Box<dyn Plugin>) {
    self.plugins.push(plugin);
  }

  pub fn len(&self) -> usize {
    self.plugins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.plugins.is_empty()
  }

  /// Fire `on_release_available`, collecting failures for the summary
  pub async fn notify_release_available(&self, releases: &[ReleaseDescriptor]) -> Vec<PluginError> {
    let mut failures = Vec::new();
    for plugin in &self.plugins {
      if let Err(e) = plugin.on_release_available(releases).await {
        let failure = PluginError {
          plugin: plugin.name().to_string(),
          hook: "on_release_available".to_string(),
          reason: e.to_string(),
        };
        warn!(plugin = plugin.name(), error = %failure, "plugin hook failed");
        failures.push(failure);
      }
    }
    failures
  }
}
