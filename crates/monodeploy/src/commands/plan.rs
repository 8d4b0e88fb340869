//! Release planning: analysis without side effects
//!
//! Runs ANALYZE and PROPAGATE, resolves current registry versions and prints
//! what a real run would do, as a table or as JSON for CI.

use crate::analyze::analyzer::ChangeAnalyzer;
use crate::analyze::classifier::CommitClassifier;
use crate::analyze::propagate::propagate;
use crate::analyze::StrategyOrigin;
use crate::core::error::DeployResult;
use crate::pipeline::DeployContext;
use crate::version::apply::compute_new_versions;
use crate::version::bump::BumpLevel;
use crate::workspace::Workspace;
use crate::workspace::graph::PackageGraph;
use serde::{Deserialize, Serialize};

/// Planned outcome for a single package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePlan {
  pub name: String,
  pub current_version: String,
  pub next_version: String,
  pub bump_level: BumpLevel,
  pub origin: StrategyOrigin,
  pub private: bool,
}

/// Complete plan for the commit range
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleasePlan {
  pub packages: Vec<PackagePlan>,
}

impl ReleasePlan {
  /// Output as human-readable table
  pub fn format_table(&self) -> String {
    let mut output = String::from("📦 Release Plan\n\n");

    if self.packages.is_empty() {
      output.push_str("No packages need to be released.\n");
      return output;
    }

    output.push_str("Package                   Current      Next         Bump     Origin\n");
    output.push_str("────────────────────────────────────────────────────────────────────\n");

    for plan in &self.packages {
      let origin = match plan.origin {
        StrategyOrigin::Explicit => "explicit",
        StrategyOrigin::Propagated => "propagated",
      };
      let suffix = if plan.private { " (private)" } else { "" };
      output.push_str(&format!(
        "{:<25} {:<12} {:<12} {:<8} {}{}\n",
        plan.name,
        plan.current_version,
        plan.next_version,
        format!("{:?}", plan.bump_level).to_lowercase(),
        origin,
        suffix,
      ));
    }

    output
  }

  /// Output as JSON for CI
  pub fn to_json(&self) -> DeployResult<String> {
    Ok(serde_json::to_string_pretty(self).map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}"))?)
  }
}

/// Generate a release plan without touching disk or the remote
pub async fn generate_plan(ctx: &DeployContext) -> DeployResult<ReleasePlan> {
  let config = &ctx.config;
  config.validate()?;
  let classifier = CommitClassifier::from_config(config.conventional_changelog_config.as_deref())?;

  let root = match &config.cwd {
    Some(path) => path.clone(),
    None => std::env::current_dir().map_err(|e| anyhow::anyhow!("failed to resolve current directory: {e}"))?,
  };
  let workspace = Workspace::load(&root)?;

  let analyzer = ChangeAnalyzer::new(&workspace, &classifier);
  let mut strategies = analyzer
    .analyze(ctx.scm.as_ref(), &config.git.base_branch, &config.git.commit_sha)
    .await?;
  if strategies.is_empty() {
    return Ok(ReleasePlan::default());
  }

  let graph = PackageGraph::from_workspace(&workspace);
  propagate(&graph, &mut strategies)?;

  let tags = crate::pipeline::resolve_current_versions(ctx, &workspace, &strategies).await?;
  let applied = compute_new_versions(&strategies, &tags, config);

  let packages = strategies
    .iter()
    .map(|(name, strategy)| PackagePlan {
      name: name.clone(),
      current_version: applied.previous[name].to_string(),
      next_version: applied.next[name].to_string(),
      bump_level: strategy.bump_level,
      origin: strategy.origin,
      private: workspace.package(name).is_some_and(|p| p.is_private()),
    })
    .collect();

  Ok(ReleasePlan { packages })
}

/// Run the plan command (CLI entry point)
pub async fn run_plan(ctx: &DeployContext, json: bool) -> DeployResult<()> {
  let plan = generate_plan(ctx).await?;

  if json {
    println!("{}", plan.to_json()?);
  } else {
    println!("{}", plan.format_table());
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_plan_table() {
    let plan = ReleasePlan::default();
    assert!(plan.format_table().contains("No packages need to be released"));
  }

  #[test]
  fn test_plan_table_lists_packages() {
    let plan = ReleasePlan {
      packages: vec![PackagePlan {
        name: "pkg-1".to_string(),
        current_version: "0.0.1".to_string(),
        next_version: "0.1.0".to_string(),
        bump_level: BumpLevel::Minor,
        origin: StrategyOrigin::Explicit,
        private: false,
      }],
    };

    let table = plan.format_table();
    assert!(table.contains("pkg-1"));
    assert!(table.contains("0.0.1"));
    assert!(table.contains("0.1.0"));
    assert!(table.contains("explicit"));
  }

  #[test]
  fn test_plan_json_roundtrip() {
    let plan = ReleasePlan {
      packages: vec![PackagePlan {
        name: "pkg-1".to_string(),
        current_version: "0.0.1".to_string(),
        next_version: "0.0.2".to_string(),
        bump_level: BumpLevel::Patch,
        origin: StrategyOrigin::Propagated,
        private: true,
      }],
    };

    let json = plan.to_json().unwrap();
    assert!(json.contains("\"name\": \"pkg-1\""));
    let parsed: ReleasePlan = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.packages.len(), 1);
    assert_eq!(parsed.packages[0].bump_level, BumpLevel::Patch);
  }
}
