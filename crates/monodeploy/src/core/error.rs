//! Error types for monodeploy with per-kind exit codes
//!
//! Every pipeline failure surfaces through [`DeployError`], which categorizes
//! the failure the way the orchestrator's abort ladder needs it: configuration
//! problems before anything ran, workspace/analysis problems before any disk
//! mutation, publish problems that require a manifest restore, and record
//! problems after artifacts are already durable.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the monodeploy binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Success
  Success = 0,
  /// User-facing failure (analysis, publish, record)
  Failure = 1,
  /// Configuration error
  ConfigError = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for monodeploy
#[derive(Debug, Error)]
pub enum DeployError {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),

  #[error("workspace error: {0}")]
  Workspace(#[from] WorkspaceError),

  #[error("analysis error: {0}")]
  Analysis(#[from] AnalysisError),

  #[error("publish error: {0}")]
  Publish(#[from] PublishError),

  #[error("record error: {0}")]
  Record(#[from] RecordError),

  #[error("plugin error: {0}")]
  Plugin(#[from] PluginError),

  /// Generic error with context from adapter internals
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl DeployError {
  /// Exit code for this error per the CLI contract
  pub fn exit_code(&self) -> ExitCode {
    match self {
      DeployError::Config(_) => ExitCode::ConfigError,
      _ => ExitCode::Failure,
    }
  }
}

/// Invalid options or unresolvable refs, fatal before analysis
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid option '{option}': {reason}")]
  InvalidOption { option: String, reason: String },

  #[error("unknown conventional-commits preset '{name}'")]
  UnknownPreset { name: String },

  #[error("failed to read config from {path}: {reason}")]
  Unreadable { path: PathBuf, reason: String },

  #[error("invalid config in {path}: {reason}")]
  Invalid { path: PathBuf, reason: String },

  #[error("unresolvable git ref '{reference}': {reason}")]
  UnresolvableRef { reference: String, reason: String },
}

/// Missing or malformed manifests and graph defects, fatal before APPLY
#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("no package manifest found at {path}")]
  ManifestMissing { path: PathBuf },

  #[error("malformed package manifest at {path}: {reason}")]
  ManifestInvalid { path: PathBuf, reason: String },

  #[error("package '{name}' is not part of the workspace")]
  UnknownPackage { name: String },

  #[error("duplicate package name '{name}' in workspace")]
  DuplicatePackage { name: String },

  #[error("dependency cycle detected involving '{package}'")]
  DependencyCycle { package: String },

  #[error("failed to write manifest for '{package}': {reason}")]
  ManifestWrite { package: String, reason: String },
}

/// Source-control failure during diff/log, fatal before APPLY
#[derive(Debug, Error)]
pub enum AnalysisError {
  #[error("source control '{operation}' failed: {reason}")]
  SourceControl { operation: String, reason: String },

  #[error("registry version lookup failed for '{package}': {reason}")]
  RegistryLookup { package: String, reason: String },
}

/// Pack or upload failure, triggers a manifest restore
#[derive(Debug, Error)]
pub enum PublishError {
  #[error("failed to pack '{package}': {reason}")]
  Pack { package: String, reason: String },

  #[error("failed to upload '{package}': {reason}")]
  Upload { package: String, reason: String },

  #[error("'{operation}' timed out for '{package}'")]
  Timeout { package: String, operation: String },

  #[error("publish cancelled")]
  Cancelled,

  #[error("{} package(s) failed to publish: {}", failures.len(), format_failures(failures))]
  Aggregate { failures: Vec<(String, String)> },
}

fn format_failures(failures: &[(String, String)]) -> String {
  failures
    .iter()
    .map(|(name, reason)| format!("{name} ({reason})"))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Commit, tag or push failure, triggers ABORT_POSTPUBLISH when tags exist
#[derive(Debug, Error)]
pub enum RecordError {
  #[error("failed to commit release artifacts: {reason}")]
  Commit { reason: String },

  #[error("tag '{tag}' already exists and points at a different commit")]
  TagConflict { tag: String },

  #[error("failed to create tag '{tag}': {reason}")]
  Tag { tag: String, reason: String },

  #[error("failed to push to '{remote}': {reason}")]
  Push { remote: String, reason: String },

  /// Archives are already on the registry; the release is durable but has no
  /// matching tags/commit on the remote.
  #[error("packages were published but the release could not be recorded: {reason}")]
  PublishedUnrecorded { reason: String },
}

/// Hook failure, non-fatal and summarised
#[derive(Debug, Error)]
#[error("plugin '{plugin}' failed in '{hook}': {reason}")]
pub struct PluginError {
  pub plugin: String,
  pub hook: String,
  pub reason: String,
}

/// Result type alias for monodeploy
pub type DeployResult<T> = Result<T, DeployError>;
