// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

use std::cmp::max;

/// Number of decisive matches between two notifications unless configured
pub const DEFAULT_THRESHOLD: usize = 5;

/// Counts decisive matches and fires once every `threshold` of them
#[derive(Debug, Clone)]
pub struct NotificationTrigger {
  pending: usize,
  threshold: usize
}

impl Default for NotificationTrigger {
  fn default() -> Self {
    NotificationTrigger::new(DEFAULT_THRESHOLD)
  }
}

impl NotificationTrigger {
  /// A threshold of 0 behaves like 1, i.e. every decisive match fires
  pub fn new(threshold: usize) -> Self {
    NotificationTrigger {
      pending: 0,
      threshold: max(1, threshold)
    }
  }

  pub fn pending(&self) -> usize {
    self.pending
  }

  /// Records one decisive match, invoking `fire` and resetting the counter
  /// when the threshold is reached. Returns whether `fire` was called.
  pub fn on_decisive_match<F>(&mut self, fire: F) -> bool
  where
    F: FnOnce()
  {
    self.pending += 1;

    if self.pending < self.threshold {
      return false;
    }

    fire();
    self.pending = 0;

    true
  }
}
