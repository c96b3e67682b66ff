/*!
Tool registry and dispatcher (C7, spec §4.6): a name -> {description, JSON-Schema,
handler} table, looked up and invoked by the server loop for every `tools/call`.
*/

use crate::platform_thread::PlatformThread;
use crate::session::Config;
use crate::tools;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use macmcp_core::McpError;
use serde::Serialize;
use serde_json::{json, Value as Json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One item of a tool result: JSON-carrying text, or a base64-encoded image (spec §6.2).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
  Text { text: String },
  Image {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
  },
}

impl ContentItem {
  #[must_use]
  pub fn json(value: &Json) -> Self {
    Self::Text { text: value.to_string() }
  }

  #[must_use]
  pub fn png(bytes: &[u8]) -> Self {
    Self::Image { data: BASE64.encode(bytes), mime_type: "image/png".into() }
  }
}

/// The result of one `tools/call` invocation (spec §6.2).
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
  pub content: Vec<ContentItem>,
  #[serde(rename = "isError")]
  pub is_error: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Json>,
}

impl ToolCallResult {
  #[must_use]
  pub fn ok(value: Json) -> Self {
    Self { content: vec![ContentItem::json(&value)], is_error: false, metadata: None }
  }

  #[must_use]
  pub fn with_metadata(mut self, metadata: Json) -> Self {
    self.metadata = Some(metadata);
    self
  }

  #[must_use]
  pub fn image(bytes: &[u8]) -> Self {
    Self { content: vec![ContentItem::png(bytes)], is_error: false, metadata: None }
  }
}

/// Per-invocation collaborators and cancellation signal handed to every handler
/// (spec §4.6: "a context that carries a request-scoped cancellation signal and the
/// shared services").
pub struct ToolContext<'a> {
  pub platform: &'a PlatformThread,
  pub config: &'a Config,
  pub cancelled: Arc<AtomicBool>,
}

impl ToolContext<'_> {
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::Relaxed)
  }

  #[must_use]
  pub fn deadline(&self) -> Duration {
    self.config.request_timeout
  }
}

type Handler = fn(&ToolContext<'_>, &Json) -> Result<ToolCallResult, McpError>;

/// One published tool: its name, human description, argument JSON-Schema (advertised
/// via `tools/list`), and its handler.
pub struct ToolSpec {
  pub name: &'static str,
  pub description: &'static str,
  pub schema: fn() -> Json,
  pub handler: Handler,
}

/// The read-only-after-startup table of every published tool (spec §4.6).
#[derive(Default)]
pub struct Registry {
  tools: Vec<ToolSpec>,
}

impl Registry {
  #[must_use]
  pub fn new() -> Self {
    Self { tools: tools::build_tools() }
  }

  pub fn list(&self) -> impl Iterator<Item = &ToolSpec> {
    self.tools.iter()
  }

  /// Looks up `name` and invokes its handler; `UnknownTool` if no such tool is
  /// registered (spec §4.6 step 1).
  pub fn dispatch(&self, ctx: &ToolContext<'_>, name: &str, args: &Json) -> Result<ToolCallResult, McpError> {
    let spec = self
      .tools
      .iter()
      .find(|t| t.name == name)
      .ok_or_else(|| McpError::UnknownTool { name: name.to_owned() })?;
    (spec.handler)(ctx, args)
  }
}

impl std::fmt::Debug for Registry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Registry").field("tool_count", &self.tools.len()).finish()
  }
}

/// Tool argument extraction helpers. Rather than a general-purpose JSON-Schema
/// validator, each handler pulls its own fields through these, which fail the same
/// way schema validation would (`MalformedArgs` naming the offending pointer) — the
/// schema advertised via `tools/list` and the validation a handler actually performs
/// describe the same contract.
pub fn pointer(field: &str) -> String {
  format!("/{field}")
}

pub fn require_str<'a>(args: &'a Json, field: &str) -> Result<&'a str, McpError> {
  args.get(field).and_then(Json::as_str).ok_or_else(|| McpError::MalformedArgs {
    pointer: pointer(field),
    reason: format!("expected a string at `{field}`"),
  })
}

pub fn optional_str<'a>(args: &'a Json, field: &str) -> Option<&'a str> {
  args.get(field).and_then(Json::as_str)
}

pub fn require_f64(args: &Json, field: &str) -> Result<f64, McpError> {
  args.get(field).and_then(Json::as_f64).ok_or_else(|| McpError::MalformedArgs {
    pointer: pointer(field),
    reason: format!("expected a number at `{field}`"),
  })
}

pub fn optional_f64(args: &Json, field: &str) -> Option<f64> {
  args.get(field).and_then(Json::as_f64)
}

pub fn optional_u64(args: &Json, field: &str) -> Option<u64> {
  args.get(field).and_then(Json::as_u64)
}

pub fn optional_bool(args: &Json, field: &str) -> Option<bool> {
  args.get(field).and_then(Json::as_bool)
}

pub fn optional_usize(args: &Json, field: &str) -> Option<usize> {
  optional_u64(args, field).and_then(|n| usize::try_from(n).ok())
}

/// A JSON-Schema argument description too small to warrant its own constant; used by
/// every tool's `schema` function in [`tools`].
#[must_use]
pub fn schema(properties: Json, required: &[&str]) -> Json {
  json!({
    "type": "object",
    "properties": properties,
    "required": required,
  })
}
