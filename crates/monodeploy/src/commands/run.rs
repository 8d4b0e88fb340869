//! The deploy command: drive the pipeline and report what happened

use crate::changelog;
use crate::core::error::DeployResult;
use crate::pipeline::{self, DeployContext, DeploySummary};
use similar::{ChangeTag, TextDiff};
use std::fs;

/// Run the full release pipeline and print a summary (CLI entry point)
pub async fn run_deploy(ctx: &DeployContext) -> DeployResult<DeploySummary> {
  let summary = pipeline::run(ctx).await?;

  if summary.strategies.is_empty() {
    println!("ℹ️  No packages affected, nothing to release");
    return Ok(summary);
  }

  println!("📦 Released {} package(s)", summary.releases.len());
  println!();
  for release in &summary.releases {
    println!(
      "   {} ({} → {})  tag: {}",
      release.name, release.previous_version, release.new_version, release.tag_name
    );
  }
  println!();

  if ctx.config.dry_run {
    println!("💡 This was a dry-run; no archive was uploaded and no tag was pushed.");
    println!();
    show_changelog_preview(ctx, &summary);
  } else if summary.pushed_tags.is_empty() {
    println!("🏷️  Tags created locally (push disabled)");
  } else {
    println!("🏷️  Pushed tags:");
    for tag in &summary.pushed_tags {
      println!("   - {tag}");
    }
  }

  if !summary.plugin_failures.is_empty() {
    println!();
    println!("⚠️  {} plugin hook(s) failed:", summary.plugin_failures.len());
    for failure in &summary.plugin_failures {
      println!("   - {failure}");
    }
  }

  Ok(summary)
}

/// Show the changelog edit a real run would make
fn show_changelog_preview(ctx: &DeployContext, summary: &DeploySummary) {
  let root = match &ctx.config.cwd {
    Some(path) => path.clone(),
    None => match std::env::current_dir() {
      Ok(path) => path,
      Err(_) => return,
    },
  };
  let path = root.join(&ctx.config.changelog_filename);
  let existing = fs::read_to_string(&path).ok();

  let fragments: Vec<String> = summary
    .releases
    .iter()
    .map(|release| release.changelog_fragment.clone())
    .collect();
  if fragments.is_empty() {
    return;
  }
  let updated = changelog::splice(existing.as_deref(), &fragments.join("\n"));

  show_diff(
    &ctx.config.changelog_filename.to_string_lossy(),
    existing.as_deref().unwrap_or(""),
    &updated,
  );
}

/// Print a unified diff between old and new content
fn show_diff(filename: &str, old: &str, new: &str) {
  if old == new {
    println!("   (no changes to {filename})");
    return;
  }

  println!("   📝 {filename}");
  println!("   {}", "─".repeat(60));

  let diff = TextDiff::from_lines(old, new);
  const MAX_LINES: usize = 40;

  for (line_count, change) in diff.iter_all_changes().enumerate() {
    if line_count >= MAX_LINES {
      println!("   ... ({} more lines)", diff.iter_all_changes().count() - line_count);
      break;
    }

    let (sign, color) = match change.tag() {
      ChangeTag::Delete => ("- ", "\x1b[31m"),
      ChangeTag::Insert => ("+ ", "\x1b[32m"),
      ChangeTag::Equal => ("  ", "\x1b[0m"),
    };

    print!("   {}{}{}\x1b[0m", color, sign, change);
  }

  println!();
}
