//! Publish scheduler: bounded-concurrency per-package pipelines
//!
//! Drives `prepublish -> pack -> upload -> postpublish` for every releasing
//! package. Two semaphores bound the work: `jobs` caps simultaneous package
//! pipelines, `max_concurrent_writes` caps simultaneous uploads. In
//! topological mode, dependency groups run with a barrier between them; a
//! group's failures are collected, in-flight work is awaited, and a single
//! aggregated failure surfaces to the orchestrator.

pub mod pack;

use crate::core::config::{AccessLevel, MonodeployConfig};
use crate::core::error::{DeployError, DeployResult, PublishError};
use crate::registry::Registry;
use crate::ui::progress::PublishProgress;
use crate::workspace::graph::PackageGraph;
use crate::workspace::{Package, Workspace};
use pack::Packer;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Scheduler inputs shared by every package task
#[derive(Clone)]
struct SchedulerShared {
  registry: Arc<dyn Registry>,
  packer: Arc<dyn Packer>,
  jobs: Arc<Semaphore>,
  writes: Arc<Semaphore>,
  cancel: Arc<AtomicBool>,
  progress: Option<Arc<PublishProgress>>,
  dry_run: bool,
  registry_enabled: bool,
  dist_tag: String,
  access: AccessLevel,
  timeout: Duration,
}

/// Publish every releasing package under the configured bounds
pub async fn publish_packages(
  registry: Arc<dyn Registry>,
  packer: Arc<dyn Packer>,
  config: &MonodeployConfig,
  workspace: &Workspace,
  graph: &PackageGraph,
  names: &BTreeSet<String>,
  cancel: Arc<AtomicBool>,
  show_progress: bool,
) -> DeployResult<()> {
  if names.is_empty() {
    return Ok(());
  }

  let progress = show_progress.then(|| Arc::new(PublishProgress::new(names.len(), "Publishing packages")));

  let groups: Vec<Vec<String>> = if config.topological {
    graph.dependency_levels(names, config.topological_dev)?
  } else {
    vec![names.iter().cloned().collect()]
  };

  let jobs_permits = if config.jobs == 0 {
    Semaphore::MAX_PERMITS
  } else {
    config.jobs
  };

  let shared = SchedulerShared {
    registry,
    packer,
    jobs: Arc::new(Semaphore::new(jobs_permits)),
    writes: Arc::new(Semaphore::new(config.max_concurrent_writes)),
    cancel,
    progress,
    dry_run: config.dry_run,
    registry_enabled: config.registry_enabled(),
    dist_tag: config.dist_tag().to_string(),
    access: config.access,
    timeout: Duration::from_secs(config.timeout_secs),
  };

  for group in groups {
    debug!(packages = ?group, "starting publish group");

    let mut handles: Vec<JoinHandle<Result<(), (String, String)>>> = Vec::new();
    for name in &group {
      let Some(package) = workspace.package(name) else {
        continue;
      };
      let package = package.clone();
      let shared = shared.clone();
      handles.push(tokio::spawn(publish_one(package, shared)));
    }

    // Barrier: the next group may not start until this one fully settles.
    let mut failures: Vec<(String, String)> = Vec::new();
    for joined in futures::future::join_all(handles).await {
      match joined {
        Ok(Ok(())) => {}
        Ok(Err(failure)) => failures.push(failure),
        Err(join_error) => failures.push(("<scheduler>".to_string(), join_error.to_string())),
      }
    }

    if shared.cancel.load(Ordering::Relaxed) {
      return Err(DeployError::Publish(PublishError::Cancelled));
    }
    if !failures.is_empty() {
      failures.sort();
      return Err(DeployError::Publish(PublishError::Aggregate { failures }));
    }
  }

  Ok(())
}

/// The per-package pipeline: prepublish, pack, upload, postpublish
async fn publish_one(package: Package, shared: SchedulerShared) -> Result<(), (String, String)> {
  let _job = shared
    .jobs
    .acquire()
    .await
    .map_err(|e| (package.name.clone(), e.to_string()))?;

  if shared.cancel.load(Ordering::Relaxed) {
    return Err((package.name.clone(), "cancelled".to_string()));
  }

  if !shared.registry_enabled {
    // No registry: the package still counts as released for versioning,
    // changelog and tagging, but nothing is packed or uploaded.
    debug!(package = %package.name, "registry disabled, skipping pack and upload");
    if let Some(progress) = &shared.progress {
      progress.inc();
    }
    return Ok(());
  }

  let fail = |stage: &str, reason: String| (package.name.clone(), format!("{stage}: {reason}"));

  with_timeout(shared.timeout, shared.packer.prepublish(&package))
    .await
    .map_err(|reason| fail("prepublish", reason))?;

  let archive = with_timeout(shared.timeout, shared.packer.pack(&package))
    .await
    .map_err(|reason| fail("pack", reason))?;

  if shared.dry_run {
    debug!(package = %package.name, "dry-run, skipping upload");
  } else {
    let _write = shared
      .writes
      .acquire()
      .await
      .map_err(|e| (package.name.clone(), e.to_string()))?;

    if shared.cancel.load(Ordering::Relaxed) {
      return Err((package.name.clone(), "cancelled".to_string()));
    }

    with_timeout(
      shared.timeout,
      shared.registry.publish(
        &package.name,
        &archive,
        &package.publish_manifest,
        &shared.dist_tag,
        shared.access,
      ),
    )
    .await
    .map_err(|reason| fail("upload", reason))?;

    info!(package = %package.name, version = %package.publish_manifest.version, "uploaded");
  }

  with_timeout(shared.timeout, shared.packer.postpublish(&package))
    .await
    .map_err(|reason| fail("postpublish", reason))?;

  if let Some(progress) = &shared.progress {
    progress.inc();
  }
  Ok(())
}

async fn with_timeout<T>(
  limit: Duration,
  fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, String> {
  match tokio::time::timeout(limit, fut).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(e.to_string()),
    Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
  }
}
