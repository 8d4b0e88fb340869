//! Change analyzer: commit range + file diffs to explicit strategies
//!
//! Every commit in the range is classified on its own and attributed to the
//! packages its diff touches; a package hit by several commits keeps the
//! maximum level and the union of their messages. Private packages and paths
//! outside any workspace member are dropped.

use crate::analyze::classifier::CommitClassifier;
use crate::analyze::{StrategyMap, StrategyOrigin, VersionStrategy};
use crate::core::error::{AnalysisError, DeployResult};
use crate::vcs::SourceControl;
use crate::version::bump::BumpLevel;
use crate::workspace::Workspace;
use std::collections::BTreeSet;
use tracing::debug;

/// Analyzer combining source control, the workspace and the classifier
pub struct ChangeAnalyzer<'a> {
  workspace: &'a Workspace,
  classifier: &'a CommitClassifier,
}

impl<'a> ChangeAnalyzer<'a> {
  pub fn new(workspace: &'a Workspace, classifier: &'a CommitClassifier) -> Self {
    Self { workspace, classifier }
  }

  /// Explicit strategy map for the changes between `base` and `head`
  pub async fn analyze(&self, scm: &dyn SourceControl, base: &str, head: &str) -> DeployResult<StrategyMap> {
    let scm_err = |operation: &str| {
      let operation = operation.to_string();
      move |e: anyhow::Error| AnalysisError::SourceControl {
        operation,
        reason: e.to_string(),
      }
    };

    let range_paths = scm.diff_files(base, head).await.map_err(scm_err("diff"))?;
    if range_paths.is_empty() {
      debug!("empty diff, nothing to analyze");
      return Ok(StrategyMap::new());
    }

    let commits = scm.log(base, head).await.map_err(scm_err("log"))?;
    debug!(commits = commits.len(), files = range_paths.len(), "analyzing commit range");

    let mut strategies = StrategyMap::new();
    for commit in &commits {
      let level = self.classifier.classify(std::slice::from_ref(&commit.message));
      if level == BumpLevel::None {
        continue;
      }

      let files = scm.changed_files(&commit.sha).await.map_err(scm_err("diff"))?;
      let mut touched: BTreeSet<&str> = BTreeSet::new();
      for path in &files {
        match self.workspace.owner_of_path(path) {
          Some(package) if !package.is_private() => {
            touched.insert(package.name.as_str());
          }
          Some(package) => {
            debug!(package = %package.name, "skipping private package");
          }
          None => {
            debug!(path = %path.display(), "path outside any workspace package");
          }
        }
      }

      for name in touched {
        match strategies.get_mut(name) {
          Some(existing) => {
            existing.bump_level = existing.bump_level.combine(level);
            existing.driving_commits.push(commit.message.clone());
          }
          None => {
            let strategy = VersionStrategy::new(level, vec![commit.message.clone()], StrategyOrigin::Explicit)
              .expect("level checked against None above");
            strategies.insert(name.to_string(), strategy);
          }
        }
      }
    }

    Ok(strategies)
  }
}
