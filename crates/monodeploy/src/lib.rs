//! monodeploy: automated versioning and publishing for package monorepos
//!
//! Given the commit history and file diff since a baseline revision, the
//! pipeline determines which packages changed, computes a semantic-version
//! bump per package (propagating patch bumps to dependents), updates
//! manifests and the changelog, publishes archives to a registry under
//! bounded concurrency, and records the release as annotated tags pushed
//! atomically to the remote.
//!
//! The external collaborators (source control, registry, archive packing)
//! sit behind traits; [`pipeline::run`] composes everything with the
//! failure/rollback protocol.

pub mod analyze;
pub mod changelog;
pub mod commands;
pub mod core;
pub mod pipeline;
pub mod plugin;
pub mod publish;
pub mod record;
pub mod registry;
pub mod ui;
pub mod vcs;
pub mod version;
pub mod workspace;

// Re-export commonly used items
pub use analyze::classifier::{AngularPreset, CommitClassifier, ConventionalPreset};
pub use analyze::{StrategyMap, StrategyOrigin, VersionStrategy};
pub use crate::core::config::{AccessLevel, GitOptions, MonodeployConfig};
pub use crate::core::error::{DeployError, DeployResult, ExitCode};
pub use pipeline::{DeployContext, DeploySummary};
pub use plugin::{Plugin, PluginHost};
pub use publish::pack::{NpmPacker, Packer};
pub use record::ReleaseDescriptor;
pub use registry::npm::NpmRegistry;
pub use registry::{MemoryRegistry, Registry, RegistryTagMap};
pub use vcs::SourceControl;
pub use vcs::git::GitAdapter;
pub use version::bump::BumpLevel;
pub use workspace::{Package, Workspace};
