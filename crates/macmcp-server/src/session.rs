/*! Session lifecycle state machine (spec §4.7/§4.8). */

use std::time::Duration;

/// `unInitialized -> initialized -> shuttingDown -> terminated`, enforced by the
/// server loop before a method is ever routed into the tool registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  UnInitialized,
  Initialized,
  ShuttingDown,
  Terminated,
}

impl SessionState {
  /// Whether `method` may run in this state.
  #[must_use]
  pub fn accepts(self, method: &str) -> bool {
    match self {
      Self::UnInitialized => method == "initialize",
      Self::Initialized => method != "initialize",
      Self::ShuttingDown | Self::Terminated => false,
    }
  }
}

/// Process-lifetime configuration threaded through every tool invocation (spec §10.2).
#[derive(Debug, Clone)]
pub struct Config {
  /// Default `maxDepth` for a capture when a tool call doesn't override it.
  pub max_depth: usize,
  /// Per-platform-call deadline (spec §5).
  pub request_timeout: Duration,
  /// Default delay between an interactive action and its `after` snapshot (spec §5).
  pub change_detection_delay: Duration,
}

/// Hard ceiling `changeDetectionDelay` is clamped to regardless of caller request (spec §5).
pub const CHANGE_DETECTION_DELAY_CEILING: Duration = Duration::from_secs(5);

impl Default for Config {
  fn default() -> Self {
    Self {
      max_depth: macmcp_core::snapshot::DEFAULT_MAX_DEPTH,
      request_timeout: Duration::from_millis(5000),
      change_detection_delay: Duration::from_millis(200),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uninitialized_only_accepts_initialize() {
    assert!(SessionState::UnInitialized.accepts("initialize"));
    assert!(!SessionState::UnInitialized.accepts("tools/call"));
  }

  #[test]
  fn initialized_rejects_reinitialize() {
    assert!(!SessionState::Initialized.accepts("initialize"));
    assert!(SessionState::Initialized.accepts("tools/call"));
    assert!(SessionState::Initialized.accepts("ping"));
  }

  #[test]
  fn shutting_down_accepts_nothing() {
    assert!(!SessionState::ShuttingDown.accepts("ping"));
    assert!(!SessionState::Terminated.accepts("ping"));
  }
}
