//! Commit classification: message text to bump level
//!
//! Two modes. The default mode is a header heuristic over each message. The
//! conventional mode delegates counting to a named preset and maps the counts
//! onto a single level for the whole commit set.

use crate::core::error::ConfigError;
use crate::version::bump::BumpLevel;

/// Counts a conventional-commits preset reports over a commit set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresetCounts {
  pub breaking: usize,
  pub features: usize,
  pub patches: usize,
}

/// A named conventional-commits ruleset
pub trait ConventionalPreset: Send + Sync {
  fn name(&self) -> &str;

  /// Count breaking changes, features and patches across the messages
  fn count(&self, messages: &[String]) -> PresetCounts;
}

/// The angular-style preset: feat/fix/perf types plus breaking markers
pub struct AngularPreset;

impl ConventionalPreset for AngularPreset {
  fn name(&self) -> &str {
    "angular"
  }

  fn count(&self, messages: &[String]) -> PresetCounts {
    let mut counts = PresetCounts::default();
    for message in messages {
      if has_breaking_marker(message) {
        counts.breaking += 1;
        continue;
      }
      match header_type(message) {
        Some("feat") => counts.features += 1,
        Some("fix") | Some("perf") => counts.patches += 1,
        _ => {}
      }
    }
    counts
  }
}

/// Commit classifier in one of the two configured modes
pub struct CommitClassifier {
  preset: Option<Box<dyn ConventionalPreset>>,
}

impl CommitClassifier {
  /// Default header-heuristic mode
  pub fn new() -> Self {
    Self { preset: None }
  }

  /// Conventional mode with an explicit preset
  pub fn with_preset(preset: Box<dyn ConventionalPreset>) -> Self {
    Self { preset: Some(preset) }
  }

  /// Build from the `conventional_changelog_config` option
  pub fn from_config(preset_name: Option<&str>) -> Result<Self, ConfigError> {
    match preset_name {
      None => Ok(Self::new()),
      Some("angular") | Some("conventionalcommits") => Ok(Self::with_preset(Box::new(AngularPreset))),
      Some(name) => Err(ConfigError::UnknownPreset { name: name.to_string() }),
    }
  }

  /// Classify a single message (default-mode rules)
  pub fn classify_message(&self, message: &str) -> BumpLevel {
    if has_breaking_marker(message) {
      return BumpLevel::Major;
    }
    match header_type(message) {
      Some("feat") => BumpLevel::Minor,
      Some("fix") | Some("perf") => BumpLevel::Patch,
      _ => BumpLevel::None,
    }
  }

  /// Classify a commit set: the per-commit maximum
  pub fn classify(&self, messages: &[String]) -> BumpLevel {
    match &self.preset {
      Some(preset) => {
        let counts = preset.count(messages);
        if counts.breaking > 0 {
          BumpLevel::Major
        } else if counts.features > 0 {
          BumpLevel::Minor
        } else if counts.patches > 0 {
          BumpLevel::Patch
        } else {
          BumpLevel::None
        }
      }
      None => messages
        .iter()
        .map(|message| self.classify_message(message))
        .max()
        .unwrap_or(BumpLevel::None),
    }
  }
}

impl Default for CommitClassifier {
  fn default() -> Self {
    Self::new()
  }
}

/// `BREAKING CHANGE` anywhere in the message, or `!:` in the header
fn has_breaking_marker(message: &str) -> bool {
  if message.contains("BREAKING CHANGE") {
    return true;
  }
  message.lines().next().is_some_and(|header| header.contains("!:"))
}

/// Conventional type of the header, scope stripped: `feat(api): x` → `feat`
fn header_type(message: &str) -> Option<&str> {
  let header = message.lines().next()?;
  let raw_type = header.split(':').next()?;
  let raw_type = raw_type.split('(').next()?.trim().trim_end_matches('!');
  (!raw_type.is_empty() && !raw_type.contains(' ')).then_some(raw_type)
}
