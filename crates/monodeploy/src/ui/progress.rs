//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars; the bar lives behind a
//! mutex so concurrent publish tasks can report completion.

use linya::{Bar, Progress};
use std::sync::Mutex;

/// Progress bar covering the publish phase
pub struct PublishProgress {
  inner: Mutex<(Progress, Bar)>,
}

impl PublishProgress {
  /// Create a bar for the given number of packages
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      inner: Mutex::new((progress, bar)),
    }
  }

  /// Mark one package pipeline as finished
  pub fn inc(&self) {
    let mut guard = self.inner.lock().expect("progress bar poisoned");
    let (progress, bar) = &mut *guard;
    progress.inc_and_draw(bar, 1);
  }
}
