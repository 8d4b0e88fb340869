//! End-to-end pipeline scenarios over the three-package fixture
//!
//! `pkg-3` depends on `pkg-2`; every package starts at 0.0.1 on the registry.

mod common;

use common::{RecordingPacker, ScriptedScm, TestWorkspace, build_context, seeded_registry, test_config};
use monodeploy::pipeline;
use monodeploy::registry::MemoryRegistry;
use monodeploy::StrategyOrigin;
use monodeploy::version::bump::BumpLevel;
use semver::Version;
use std::sync::Arc;

#[tokio::test]
async fn scenario_1_single_feature_commit() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[(
    "feat: some new feature!",
    &["packages/pkg-1/src/index.js"],
  )]));
  let packer = Arc::new(RecordingPacker::default());
  let mut config = test_config(&ws.root);
  config.persist_versions = true;

  let ctx = build_context(config, scm.clone(), seeded_registry(), packer.clone());
  let summary = pipeline::run(&ctx).await.unwrap();

  assert_eq!(summary.strategies.len(), 1);
  assert_eq!(summary.strategies["pkg-1"].bump_level, BumpLevel::Minor);
  assert_eq!(summary.releases.len(), 1);
  assert_eq!(summary.releases[0].new_version, Version::new(0, 1, 0));
  assert_eq!(summary.pushed_tags, vec!["pkg-1@0.1.0"]);

  // pkg-2 and pkg-3 stay untouched on disk.
  assert!(ws.manifest_text("pkg-1").contains("\"version\": \"0.1.0\""));
  assert!(ws.manifest_text("pkg-2").contains("\"version\": \"0.0.1\""));
  assert!(ws.manifest_text("pkg-3").contains("\"version\": \"0.0.1\""));
}

#[tokio::test]
async fn scenario_2_breaking_change_propagates() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[(
    "feat: X\n\nBREAKING CHANGE: y",
    &["packages/pkg-2/src/index.js"],
  )]));
  let packer = Arc::new(RecordingPacker::default());
  let mut config = test_config(&ws.root);
  config.persist_versions = true;

  let ctx = build_context(config, scm.clone(), seeded_registry(), packer.clone());
  let summary = pipeline::run(&ctx).await.unwrap();

  assert_eq!(summary.strategies.len(), 2);
  assert_eq!(summary.strategies["pkg-2"].bump_level, BumpLevel::Major);
  assert_eq!(summary.strategies["pkg-3"].bump_level, BumpLevel::Patch);
  assert_eq!(summary.strategies["pkg-3"].origin, StrategyOrigin::Propagated);
  assert!(!summary.strategies.contains_key("pkg-1"));

  assert_eq!(summary.pushed_tags, vec!["pkg-2@1.0.0", "pkg-3@0.0.2"]);

  // The dependent's range follows the new major (caret operator preserved).
  assert!(ws.manifest_text("pkg-3").contains("\"pkg-2\": \"^1.0.0\""));
}

#[tokio::test]
async fn scenario_3_independent_commits_keep_their_levels() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[
    ("feat: a", &["packages/pkg-1/src/index.js"]),
    ("fix: b", &["packages/pkg-2/src/index.js"]),
  ]));
  let packer = Arc::new(RecordingPacker::default());

  let ctx = build_context(test_config(&ws.root), scm.clone(), seeded_registry(), packer.clone());
  let summary = pipeline::run(&ctx).await.unwrap();

  let next: std::collections::BTreeMap<&str, String> = summary
    .releases
    .iter()
    .map(|r| (r.name.as_str(), r.new_version.to_string()))
    .collect();
  assert_eq!(next["pkg-1"], "0.1.0");
  assert_eq!(next["pkg-2"], "0.0.2");
  assert_eq!(next["pkg-3"], "0.0.2");

  // The propagated release re-lists no upstream commits.
  let pkg_3 = summary.releases.iter().find(|r| r.name == "pkg-3").unwrap();
  assert!(!pkg_3.changelog_fragment.contains("- a"));
  assert!(!pkg_3.changelog_fragment.contains("- b"));
  assert_eq!(summary.strategies["pkg-3"].origin, StrategyOrigin::Propagated);

  // Explicit releases carry only their own commits.
  let pkg_1 = summary.releases.iter().find(|r| r.name == "pkg-1").unwrap();
  assert!(pkg_1.changelog_fragment.contains("- a"));
  assert!(!pkg_1.changelog_fragment.contains("- b"));
}

#[tokio::test]
async fn scenario_4_no_diff_releases_nothing() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[]));
  let packer = Arc::new(RecordingPacker::default());
  let registry = seeded_registry();

  let ctx = build_context(test_config(&ws.root), scm.clone(), registry.clone(), packer.clone());
  let summary = pipeline::run(&ctx).await.unwrap();

  assert!(summary.strategies.is_empty());
  assert!(summary.releases.is_empty());
  assert!(summary.pushed_tags.is_empty());
  assert!(registry.uploads().is_empty());
  assert!(scm.tags.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_5_first_publish_starts_from_zero() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[("feat: x", &["packages/pkg-1/src/index.js"])]));
  let packer = Arc::new(RecordingPacker::default());
  let registry = Arc::new(MemoryRegistry::new()); // nothing published yet

  let ctx = build_context(test_config(&ws.root), scm.clone(), registry.clone(), packer.clone());
  let summary = pipeline::run(&ctx).await.unwrap();

  assert_eq!(summary.releases.len(), 1);
  assert_eq!(summary.releases[0].previous_version, Version::new(0, 0, 0));
  assert_eq!(summary.releases[0].new_version, Version::new(0, 1, 0));
  assert_eq!(summary.pushed_tags, vec!["pkg-1@0.1.0"]);
}

#[tokio::test]
async fn scenario_6_dry_run_matches_but_pushes_nothing() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[(
    "feat: some new feature!",
    &["packages/pkg-1/src/index.js"],
  )]));
  let packer = Arc::new(RecordingPacker::default());
  let registry = seeded_registry();
  let mut config = test_config(&ws.root);
  config.dry_run = true;

  let ctx = build_context(config, scm.clone(), registry.clone(), packer.clone());
  let summary = pipeline::run(&ctx).await.unwrap();

  // Same analysis as the real run...
  assert_eq!(summary.strategies.len(), 1);
  assert_eq!(summary.strategies["pkg-1"].bump_level, BumpLevel::Minor);
  assert_eq!(summary.releases[0].new_version, Version::new(0, 1, 0));

  // ...but no side effect anywhere.
  assert!(summary.pushed_tags.is_empty());
  assert!(registry.uploads().is_empty());
  assert!(scm.tags.lock().unwrap().is_empty());
  assert!(scm.pushes.lock().unwrap().is_empty());
  assert!(ws.manifest_text("pkg-1").contains("\"version\": \"0.0.1\""));
  assert!(ws.changelog_text().is_none());

  // Pack still ran, so packaging errors would have surfaced.
  assert_eq!(packer.packed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn changelog_written_with_sentinel_and_sections() {
  let ws = TestWorkspace::new();
  let scm = Arc::new(ScriptedScm::new(&[(
    "feat: add fast path",
    &["packages/pkg-1/src/index.js"],
  )]));
  let packer = Arc::new(RecordingPacker::default());

  let ctx = build_context(test_config(&ws.root), scm.clone(), seeded_registry(), packer.clone());
  pipeline::run(&ctx).await.unwrap();

  let changelog = ws.changelog_text().expect("changelog created");
  assert!(changelog.contains("<!-- MONODEPLOY:BELOW -->"));
  assert!(changelog.contains("## 0.1.0"));
  assert!(changelog.contains("### Features"));
  assert!(changelog.contains("add fast path"));
}
