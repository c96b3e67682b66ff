/*!
The wire error taxonomy (spec §7) and its Rust realization.

[`McpError`] is the single enum every fallible operation in this crate returns.
Each variant maps 1:1 to a stable machine code a client can branch on; the
`Display` message is free-form and may change between releases. Platform
boundaries (see [`crate::platform`]) translate their own narrower error types
into this one and never let a raw OS code escape past them.
*/

use serde_json::{json, Value as Json};

/// Crate-wide result alias, mirroring the teacher's `AllioResult<T>` convention.
pub type McpResult<T> = Result<T, McpError>;

/// The stable error taxonomy of spec §7.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
  #[error("malformed path `{path}`: {reason}")]
  MalformedPath { path: String, reason: String },

  #[error("malformed arguments at `{pointer}`: {reason}")]
  MalformedArgs { pointer: String, reason: String },

  #[error("unknown tool `{name}`")]
  UnknownTool { name: String },

  #[error("invalid scope `{scope}`")]
  InvalidScope { scope: String },

  #[error("no element matched `{path}`")]
  NotFound { path: String },

  #[error("`{path}` matches {} candidates", candidates.len())]
  Ambiguous { path: String, candidates: Vec<String> },

  #[error("element `{path}` is disabled")]
  Disabled { path: String },

  #[error("accessibility permission denied")]
  PermissionDenied,

  #[error("platform call timed out after {millis}ms")]
  PlatformTimeout { millis: u64 },

  #[error("platform failure: {detail}")]
  PlatformFailure { detail: String },

  #[error("application not found: {hint}")]
  ApplicationNotFound { hint: String },

  #[error("failed to launch `{bundle_id}`: {reason}")]
  LaunchFailed { bundle_id: String, reason: String },

  #[error("window not found: {hint}")]
  WindowNotFound { hint: String },

  #[error("menu not found: {hint}")]
  MenuNotFound { hint: String },

  #[error("input failed: {reason}")]
  InputFailed { reason: String },

  #[error("screen capture failed: {reason}")]
  CaptureFailed { reason: String },

  #[error("clipboard unavailable: {reason}")]
  ClipboardUnavailable { reason: String },

  /// Surfaced as a warning in response metadata, not a failure (§7).
  #[error("change report truncated at {cap} entries")]
  ChangeDetectionTruncated { cap: usize },

  #[error("request cancelled")]
  Cancelled,

  /// Catch-all. Handlers SHOULD never surface this deliberately — it means a bug.
  #[error("internal error: {0}")]
  InternalError(String),
}

impl McpError {
  /// The stable machine code for this variant (spec §7 / §6.2).
  #[must_use]
  pub const fn code(&self) -> &'static str {
    match self {
      Self::MalformedPath { .. } => "MalformedPath",
      Self::MalformedArgs { .. } => "MalformedArgs",
      Self::UnknownTool { .. } => "UnknownTool",
      Self::InvalidScope { .. } => "InvalidScope",
      Self::NotFound { .. } => "NotFound",
      Self::Ambiguous { .. } => "Ambiguous",
      Self::Disabled { .. } => "Disabled",
      Self::PermissionDenied => "PermissionDenied",
      Self::PlatformTimeout { .. } => "PlatformTimeout",
      Self::PlatformFailure { .. } => "PlatformFailure",
      Self::ApplicationNotFound { .. } => "ApplicationNotFound",
      Self::LaunchFailed { .. } => "LaunchFailed",
      Self::WindowNotFound { .. } => "WindowNotFound",
      Self::MenuNotFound { .. } => "MenuNotFound",
      Self::InputFailed { .. } => "InputFailed",
      Self::CaptureFailed { .. } => "CaptureFailed",
      Self::ClipboardUnavailable { .. } => "ClipboardUnavailable",
      Self::ChangeDetectionTruncated { .. } => "ChangeDetectionTruncated",
      Self::Cancelled => "Cancelled",
      Self::InternalError(_) => "InternalError",
    }
  }

  /// The `{ "code": ..., "message": ... }` wire shape of spec §6.2.
  #[must_use]
  pub fn to_rpc_data(&self) -> Json {
    json!({ "code": self.code(), "message": self.to_string() })
  }

  /// Candidate full-paths for an `Ambiguous` error, empty for every other variant.
  #[must_use]
  pub fn candidates(&self) -> &[String] {
    match self {
      Self::Ambiguous { candidates, .. } => candidates,
      _ => &[],
    }
  }
}

/// Narrow internal error surfaced by [`crate::platform::AccessibilityProvider`].
///
/// Mirrors the raw accessibility result codes (spec §6.1); converted into
/// [`McpError`] at the C1 trait boundary and never propagated past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AxError {
  /// The attribute exists on this role but has no value right now. Benign (§4.2).
  #[error("no value")]
  NoValue,
  /// The platform does not support this attribute on this element. Benign (§4.2).
  #[error("attribute unsupported")]
  AttributeUnsupported,
  /// The platform could not complete the request (transient or structural).
  #[error("cannot complete")]
  CannotComplete,
  /// The accessibility permission has not been granted to this process.
  #[error("permission denied")]
  PermissionDenied,
  /// The call did not return within the configured per-call deadline (§5).
  #[error("timeout")]
  Timeout,
}

impl AxError {
  /// `AttributeUnsupported`/`NoValue` are treated as "no children"/"absent", never
  /// retried-forever, but ARE eligible for the bounded retry described in §9.
  #[must_use]
  pub const fn is_benign(self) -> bool {
    matches!(self, Self::NoValue | Self::AttributeUnsupported)
  }

  /// §9's decided retry policy: retry only the two benign codes, never this one.
  #[must_use]
  pub const fn is_retryable(self) -> bool {
    self.is_benign()
  }
}

impl From<AxError> for McpError {
  fn from(e: AxError) -> Self {
    match e {
      AxError::PermissionDenied => Self::PermissionDenied,
      AxError::Timeout => Self::PlatformTimeout { millis: 5000 },
      AxError::NoValue | AxError::AttributeUnsupported | AxError::CannotComplete => {
        Self::PlatformFailure { detail: e.to_string() }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_matches_variant() {
    let e = McpError::NotFound { path: "macos://ui/AXButton".into() };
    assert_eq!(e.code(), "NotFound");
  }

  #[test]
  fn rpc_data_carries_code_and_message() {
    let e = McpError::Ambiguous {
      path: "macos://ui/AXApplication/AXButton[@AXTitle=\"OK\"]".into(),
      candidates: vec!["a".into(), "b".into()],
    };
    let data = e.to_rpc_data();
    assert_eq!(data["code"], "Ambiguous");
    assert!(data["message"].as_str().unwrap().contains('2'));
  }

  #[test]
  fn benign_ax_errors_are_retryable_permission_denied_is_not() {
    assert!(AxError::NoValue.is_retryable());
    assert!(AxError::AttributeUnsupported.is_retryable());
    assert!(!AxError::PermissionDenied.is_retryable());
    assert!(!AxError::CannotComplete.is_retryable());
  }

  #[test]
  fn ax_permission_denied_maps_to_mcp_permission_denied() {
    let e: McpError = AxError::PermissionDenied.into();
    assert_eq!(e.code(), "PermissionDenied");
  }
}
