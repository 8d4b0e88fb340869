//! Changelog rendering and sentinel splicing
//!
//! Each released package gets a fragment grouped by commit type. Fragments
//! are spliced into the repo changelog immediately after the sentinel line,
//! leaving everything before and after it untouched. A missing changelog is
//! created with a default header.

use crate::analyze::{StrategyOrigin, VersionStrategy};
use crate::analyze::classifier::CommitClassifier;
use crate::version::bump::BumpLevel;
use crate::workspace::manifest::write_atomic;
use chrono::NaiveDate;
use semver::Version;
use std::fs;
use std::path::Path;

/// Marker delimiting the insertion point in the changelog file
pub const SENTINEL: &str = "<!-- MONODEPLOY:BELOW -->";

const DEFAULT_HEADER: &str = "# Changelog\n";

/// Render the changelog fragment for one released package
///
/// Propagated entries get a stub line rather than re-listing upstream
/// commits.
pub fn render_fragment(version: &Version, strategy: &VersionStrategy, date: NaiveDate) -> String {
  let mut fragment = format!("## {} ({})\n", version, date.format("%Y-%m-%d"));

  if strategy.origin == StrategyOrigin::Propagated {
    fragment.push_str("\n- Version bump to pick up updated dependencies.\n");
    return fragment;
  }

  let classifier = CommitClassifier::new();
  let mut features = Vec::new();
  let mut fixes = Vec::new();
  let mut performance = Vec::new();
  let mut breaking = Vec::new();

  for message in &strategy.driving_commits {
    let entry = commit_summary(message);
    match classifier.classify_message(message) {
      BumpLevel::Major => breaking.push(entry),
      BumpLevel::Minor => features.push(entry),
      BumpLevel::Patch => {
        if header_is_perf(message) {
          performance.push(entry);
        } else {
          fixes.push(entry);
        }
      }
      BumpLevel::None => {}
    }
  }

  for (title, entries) in [
    ("Features", features),
    ("Bug Fixes", fixes),
    ("Performance", performance),
    ("BREAKING CHANGES", breaking),
  ] {
    if entries.is_empty() {
      continue;
    }
    fragment.push_str(&format!("\n### {title}\n\n"));
    for entry in entries {
      fragment.push_str(&format!("- {entry}\n"));
    }
  }

  fragment
}

/// Insert new content immediately after the sentinel
///
/// When no file content exists yet, a default header and sentinel are
/// produced around the content.
pub fn splice(existing: Option<&str>, content: &str) -> String {
  match existing {
    Some(text) if text.contains(SENTINEL) => {
      let (before, after) = text.split_once(SENTINEL).expect("sentinel presence checked");
      format!("{before}{SENTINEL}\n\n{}\n{after}", content.trim_end())
    }
    Some(text) => {
      // No sentinel: prepend one so later runs have an anchor.
      format!("{DEFAULT_HEADER}\n{SENTINEL}\n\n{}\n{text}", content.trim_end())
    }
    None => format!("{DEFAULT_HEADER}\n{SENTINEL}\n\n{}\n", content.trim_end()),
  }
}

/// Splice the fragments into the changelog file on disk
pub fn update_changelog_file(path: &Path, fragments: &[String]) -> std::io::Result<()> {
  if fragments.is_empty() {
    return Ok(());
  }
  let existing = fs::read_to_string(path).ok();
  let content = fragments.join("\n");
  let updated = splice(existing.as_deref(), &content);
  write_atomic(path, &updated)
}

/// First line of a commit with its conventional prefix stripped
fn commit_summary(message: &str) -> String {
  let header = message.lines().next().unwrap_or("").trim();
  match header.split_once(':') {
    Some((prefix, description)) if !prefix.contains(' ') => description.trim().to_string(),
    _ => header.to_string(),
  }
}

fn header_is_perf(message: &str) -> bool {
  message
    .lines()
    .next()
    .and_then(|header| header.split(':').next())
    .map(|t| t.split('(').next().unwrap_or(t).trim_end_matches('!') == "perf")
    .unwrap_or(false)
}
