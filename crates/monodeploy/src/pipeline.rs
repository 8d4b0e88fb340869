//! Pipeline orchestration and the failure/rollback protocol
//!
//! One supervisor drives the phases in order:
//!
//! ANALYZE -> PROPAGATE -> APPLY -> PUBLISH -> RECORD -> NOTIFY
//!
//! Failures before APPLY abort with nothing mutated. Once manifests are
//! written, every failure restores them from the snapshot. A RECORD failure
//! after a tag was created cannot un-upload archives; it restores manifests
//! and surfaces the "published, unrecorded" outcome loudly.

use crate::analyze::StrategyMap;
use crate::analyze::analyzer::ChangeAnalyzer;
use crate::analyze::classifier::CommitClassifier;
use crate::analyze::propagate::propagate;
use crate::changelog;
use crate::core::config::MonodeployConfig;
use crate::core::error::{ConfigError, DeployError, DeployResult, PluginError, PublishError, RecordError, WorkspaceError};
use crate::plugin::PluginHost;
use crate::publish::pack::Packer;
use crate::publish::publish_packages;
use crate::record::{ReleaseDescriptor, record_releases};
use crate::registry::{Registry, RegistryTagMap};
use crate::vcs::SourceControl;
use crate::version::apply::{apply_to_workspace, compute_new_versions, write_manifests};
use crate::version::backup::ManifestBackup;
use crate::workspace::Workspace;
use crate::workspace::graph::PackageGraph;
use semver::Version;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Everything a pipeline run needs: config plus the external collaborators
pub struct DeployContext {
  pub config: MonodeployConfig,
  pub scm: Arc<dyn SourceControl>,
  pub registry: Arc<dyn Registry>,
  pub packer: Arc<dyn Packer>,
  pub plugins: PluginHost,
  /// Set by a signal watcher; observed between suspension points
  pub cancel: Arc<AtomicBool>,
  /// Draw a progress bar during the publish phase
  pub show_progress: bool,
}

impl DeployContext {
  pub fn new(
    config: MonodeployConfig,
    scm: Arc<dyn SourceControl>,
    registry: Arc<dyn Registry>,
    packer: Arc<dyn Packer>,
  ) -> Self {
    Self {
      config,
      scm,
      registry,
      packer,
      plugins: PluginHost::new(),
      cancel: Arc::new(AtomicBool::new(false)),
      show_progress: false,
    }
  }
}

/// Result of a pipeline run
#[derive(Debug, Default, Serialize)]
pub struct DeploySummary {
  /// Applied strategies per affected package (private ones included)
  pub strategies: StrategyMap,
  /// Released packages, lexicographic by name
  pub releases: Vec<ReleaseDescriptor>,
  /// Tags actually pushed; always empty in dry-run
  pub pushed_tags: Vec<String>,
  /// Whether version bumps stayed on disk
  pub persisted: bool,
  /// Hook failures, reported but never fatal
  #[serde(skip)]
  pub plugin_failures: Vec<PluginError>,
}

/// Run the release pipeline to completion
pub async fn run(ctx: &DeployContext) -> DeployResult<DeploySummary> {
  let config = &ctx.config;
  config.validate()?;
  let classifier = CommitClassifier::from_config(config.conventional_changelog_config.as_deref())?;

  let root = match &config.cwd {
    Some(path) => path.clone(),
    None => std::env::current_dir().map_err(|e| anyhow::anyhow!("failed to resolve current directory: {e}"))?,
  };
  let mut workspace = Workspace::load(&root)?;

  let base = resolve_ref(ctx.scm.as_ref(), &config.git.base_branch).await?;
  let head = resolve_ref(ctx.scm.as_ref(), &config.git.commit_sha).await?;

  // ANALYZE
  let mut strategies = {
    let analyzer = ChangeAnalyzer::new(&workspace, &classifier);
    analyzer.analyze(ctx.scm.as_ref(), &base, &head).await?
  };
  if strategies.is_empty() {
    info!("no affected packages, nothing to release");
    return Ok(DeploySummary::default());
  }

  // PROPAGATE
  let graph = PackageGraph::from_workspace(&workspace);
  propagate(&graph, &mut strategies)?;
  info!(affected = strategies.len(), "resolved version strategies");

  let tags = resolve_current_versions(ctx, &workspace, &strategies).await?;
  let mut applied = compute_new_versions(&strategies, &tags, config);

  // APPLY: snapshot first, then mutate, then write
  let backup = ManifestBackup::snapshot(workspace.packages().map(|p| p.manifest_path.as_path()))
    .map_err(|e| anyhow::anyhow!("failed to snapshot manifests: {e}"))?;

  apply_to_workspace(&mut workspace, &mut applied);
  let written_manifests = match write_manifests(&workspace, &applied) {
    Ok(paths) => paths,
    Err(e) => {
      restore_or_log(&backup);
      return Err(e);
    }
  };

  if ctx.cancel.load(Ordering::Relaxed) {
    restore_or_log(&backup);
    return Err(DeployError::Publish(PublishError::Cancelled));
  }

  // Changelog fragments and release descriptors; private packages bump
  // locally but never release.
  let today = chrono::Utc::now().date_naive();
  let mut releases: Vec<ReleaseDescriptor> = Vec::new();
  let mut fragments: Vec<String> = Vec::new();
  for (name, strategy) in &strategies {
    let package = workspace
      .package(name)
      .expect("strategies only name workspace packages");
    if package.is_private() {
      continue;
    }
    let fragment = changelog::render_fragment(&applied.next[name], strategy, today);
    releases.push(ReleaseDescriptor::new(
      name.clone(),
      applied.previous[name].clone(),
      applied.next[name].clone(),
      fragment.clone(),
    ));
    fragments.push(fragment);
  }

  let changelog_path = root.join(&config.changelog_filename);
  if !config.dry_run
    && let Err(e) = changelog::update_changelog_file(&changelog_path, &fragments)
  {
    restore_or_log(&backup);
    return Err(anyhow::anyhow!("failed to update {}: {e}", changelog_path.display()).into());
  }

  // PUBLISH
  let release_names: BTreeSet<String> = releases.iter().map(|r| r.name.clone()).collect();
  if let Err(e) = publish_packages(
    ctx.registry.clone(),
    ctx.packer.clone(),
    config,
    &workspace,
    &graph,
    &release_names,
    ctx.cancel.clone(),
    ctx.show_progress,
  )
  .await
  {
    restore_or_log(&backup);
    return Err(e);
  }

  // RECORD
  let mut staged: Vec<PathBuf> = written_manifests;
  if !config.dry_run && !fragments.is_empty() {
    staged.push(changelog_path.clone());
  }
  let outcome = match record_releases(ctx.scm.as_ref(), config, &releases, &staged).await {
    Ok(outcome) => outcome,
    Err(failure) => {
      restore_or_log(&backup);
      let err = if failure.tags_created {
        error!("release is published but unrecorded; uploaded archives are not rolled back");
        RecordError::PublishedUnrecorded {
          reason: failure.error.to_string(),
        }
      } else {
        failure.error
      };
      return Err(err.into());
    }
  };

  // Success: honor persist_versions (dry-run never persists)
  let persisted = config.persist_versions && !config.dry_run;
  if persisted {
    backup.discard();
  } else {
    backup
      .restore()
      .map_err(|e| anyhow::anyhow!("failed to restore manifests after completion: {e}"))?;
  }

  let summary = DeploySummary {
    strategies,
    releases,
    pushed_tags: outcome.pushed_tags,
    persisted,
    plugin_failures: Vec::new(),
  };

  if let Some(changeset) = &config.changeset_filename {
    let path = if changeset.is_absolute() {
      changeset.clone()
    } else {
      root.join(changeset)
    };
    match serde_json::to_string_pretty(&summary) {
      Ok(json) => {
        if let Err(e) = std::fs::write(&path, json + "\n") {
          warn!(path = %path.display(), error = %e, "failed to write changeset file");
        }
      }
      Err(e) => warn!(error = %e, "failed to serialize changeset"),
    }
  }

  // NOTIFY: releases are durable, hook failures only make the summary
  let plugin_failures = ctx.plugins.notify_release_available(&summary.releases).await;

  Ok(DeploySummary {
    plugin_failures,
    ..summary
  })
}

async fn resolve_ref(scm: &dyn SourceControl, reference: &str) -> DeployResult<String> {
  scm
    .resolve_sha(reference)
    .await
    .map_err(|e| {
      DeployError::Config(ConfigError::UnresolvableRef {
        reference: reference.to_string(),
        reason: e.to_string(),
      })
    })
}

/// Registry tag map for the affected packages, manifest versions when the
/// registry is disabled
pub(crate) async fn resolve_current_versions(
  ctx: &DeployContext,
  workspace: &Workspace,
  strategies: &StrategyMap,
) -> DeployResult<RegistryTagMap> {
  if ctx.config.registry_enabled() {
    let map = RegistryTagMap::fetch(
      ctx.registry.as_ref(),
      strategies.keys().map(String::as_str),
      ctx.config.dist_tag(),
    )
    .await?;
    return Ok(map);
  }

  let mut versions = BTreeMap::new();
  for name in strategies.keys() {
    let package = workspace
      .package(name)
      .ok_or_else(|| WorkspaceError::UnknownPackage { name: name.clone() })?;
    let version: Version = package.version().parse().map_err(|e| WorkspaceError::ManifestInvalid {
      path: package.manifest_path.clone(),
      reason: format!("invalid version '{}': {e}", package.version()),
    })?;
    versions.insert(name.clone(), version);
  }
  Ok(RegistryTagMap::from_versions(versions))
}

/// Restore the snapshot while already handling a failure
fn restore_or_log(backup: &ManifestBackup) {
  if let Err(e) = backup.restore() {
    error!(key = backup.key(), error = %e, "failed to restore manifest snapshot");
  }
}
