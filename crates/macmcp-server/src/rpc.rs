/*!
JSON-RPC 2.0 wire types and the line-framed stdio server loop (C8, spec §4.7/§6.2).

Framing is one JSON object per input line, with no length header. A line that
fails to parse yields a JSON-RPC parse error and does not terminate the loop;
a handler error never terminates the loop either — only a closed stdin or an
explicit `shutdown` does. `initialize` must precede every other method;
`shutdown` moves the session straight to [`SessionState::Terminated`] since
this loop handles one request at a time and never has a second in flight to
drain.
*/

use crate::platform_thread::PlatformThread;
use crate::registry::{Registry, ToolContext};
use crate::session::{Config, SessionState};
use log::{debug, warn};
use macmcp_core::McpError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::io::{BufRead, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC 2.0 error codes (spec §6.2: "the error shape is the standard
// JSON-RPC error object"); `data` carries our own `{code, message}` taxonomy.
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;

/// Every method this server answers; anything else is `METHOD_NOT_FOUND`.
const KNOWN_METHODS: &[&str] =
  &["initialize", "shutdown", "tools/list", "tools/call", "resources/list", "resources/read", "ping"];

#[derive(Debug, Deserialize)]
struct RpcRequest {
  #[serde(default)]
  id: Option<Json>,
  method: String,
  #[serde(default)]
  params: Json,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
  jsonrpc: &'static str,
  id: Json,
  #[serde(skip_serializing_if = "Option::is_none")]
  result: Option<Json>,
  #[serde(skip_serializing_if = "Option::is_none")]
  error: Option<RpcErrorBody>,
}

#[derive(Debug, Serialize)]
struct RpcErrorBody {
  code: i64,
  message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  data: Option<Json>,
}

fn ok_response(id: Json, result: Json) -> RpcResponse {
  RpcResponse { jsonrpc: JSONRPC_VERSION, id, result: Some(result), error: None }
}

fn err_response(id: Json, code: i64, message: impl Into<String>, data: Option<Json>) -> RpcResponse {
  RpcResponse { jsonrpc: JSONRPC_VERSION, id, result: None, error: Some(RpcErrorBody { code, message: message.into(), data }) }
}

fn mcp_err_response(id: Json, e: McpError) -> RpcResponse {
  err_response(id, INTERNAL_ERROR, e.to_string(), Some(e.to_rpc_data()))
}

/// Reads one JSON-RPC request per line from `input` and writes one response per
/// non-notification request to `output`, until `input` closes or `shutdown` runs.
/// Platform work never happens on this thread directly; every handler reaches the
/// platform only through `ctx.platform.call` (spec §4.7: "implementations MUST NOT
/// call the platform synchronously from the JSON-RPC I/O task").
pub fn run_stdio_loop(
  input: impl BufRead,
  mut output: impl Write,
  registry: &Registry,
  platform: &PlatformThread,
  config: &Config,
) -> std::io::Result<()> {
  let mut state = SessionState::UnInitialized;

  for line in input.lines() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }

    let response = handle_line(&line, registry, platform, config, &mut state);
    if let Some(response) = response {
      let text = serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":{INTERNAL_ERROR},"message":"failed to serialize response: {e}"}}}}"#)
      });
      writeln!(output, "{text}")?;
      output.flush()?;
    }

    if state == SessionState::Terminated {
      break;
    }
  }
  Ok(())
}

fn handle_line(
  line: &str,
  registry: &Registry,
  platform: &PlatformThread,
  config: &Config,
  state: &mut SessionState,
) -> Option<RpcResponse> {
  let request: RpcRequest = match serde_json::from_str(line) {
    Ok(r) => r,
    Err(e) => {
      warn!("dropping unparseable JSON-RPC line: {e}");
      return Some(err_response(Json::Null, PARSE_ERROR, format!("parse error: {e}"), None));
    }
  };

  let id = request.id.clone().unwrap_or(Json::Null);
  let is_notification = request.id.is_none();

  if !KNOWN_METHODS.contains(&request.method.as_str()) {
    return respond(is_notification, err_response(id, METHOD_NOT_FOUND, format!("unknown method `{}`", request.method), None));
  }
  if !state.accepts(&request.method) {
    let reason = format!("method `{}` is not valid in the current session state", request.method);
    return respond(is_notification, err_response(id, INVALID_REQUEST, reason, None));
  }

  debug!("dispatching `{}`", request.method);
  let outcome = dispatch_method(&request.method, &request.params, registry, platform, config, state);
  let response = match outcome {
    Ok(value) => ok_response(id, value),
    Err(e) => mcp_err_response(id, e),
  };
  respond(is_notification, response)
}

fn respond(is_notification: bool, response: RpcResponse) -> Option<RpcResponse> {
  (!is_notification).then_some(response)
}

fn dispatch_method(
  method: &str,
  params: &Json,
  registry: &Registry,
  platform: &PlatformThread,
  config: &Config,
  state: &mut SessionState,
) -> Result<Json, McpError> {
  match method {
    "initialize" => {
      *state = SessionState::Initialized;
      Ok(json!({
        "protocolVersion": "2024-11-05",
        "serverInfo": { "name": "macmcp-server", "version": env!("CARGO_PKG_VERSION") },
        "capabilities": { "tools": {}, "resources": {} },
      }))
    }
    "shutdown" => {
      *state = SessionState::Terminated;
      Ok(Json::Null)
    }
    "ping" => Ok(json!({})),
    "tools/list" => {
      let tools: Vec<Json> = registry
        .list()
        .map(|tool| json!({ "name": tool.name, "description": tool.description, "inputSchema": (tool.schema)() }))
        .collect();
      Ok(json!({ "tools": tools }))
    }
    "tools/call" => {
      let name = params.get("name").and_then(Json::as_str).ok_or_else(|| McpError::MalformedArgs {
        pointer: "/name".into(),
        reason: "expected a string at `name`".into(),
      })?;
      let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
      let ctx = ToolContext { platform, config, cancelled: Arc::new(AtomicBool::new(false)) };
      let result = registry.dispatch(&ctx, name, &arguments)?;
      serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
    "resources/list" => crate::resources::list(),
    "resources/read" => {
      let uri = params.get("uri").and_then(Json::as_str).ok_or_else(|| McpError::MalformedArgs {
        pointer: "/uri".into(),
        reason: "expected a string at `uri`".into(),
      })?;
      let ctx = ToolContext { platform, config, cancelled: Arc::new(AtomicBool::new(false)) };
      crate::resources::read(&ctx, uri)
    }
    other => Err(McpError::InternalError(format!("`{other}` passed the known-method gate but has no handler"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uninitialized_rejects_tools_call_with_invalid_request() {
    let mut state = SessionState::UnInitialized;
    let response = handle_without_io(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{}}"#, &mut state);
    let error = response.unwrap().error.unwrap();
    assert_eq!(error.code, INVALID_REQUEST);
  }

  #[test]
  fn unknown_method_is_method_not_found() {
    let mut state = SessionState::Initialized;
    let response = handle_without_io(r#"{"jsonrpc":"2.0","id":1,"method":"bogus","params":{}}"#, &mut state);
    let error = response.unwrap().error.unwrap();
    assert_eq!(error.code, METHOD_NOT_FOUND);
  }

  #[test]
  fn malformed_json_yields_parse_error_not_a_panic() {
    let mut state = SessionState::UnInitialized;
    let response = handle_without_io("{not json", &mut state);
    let error = response.unwrap().error.unwrap();
    assert_eq!(error.code, PARSE_ERROR);
  }

  #[test]
  fn notification_without_id_gets_no_response() {
    let mut state = SessionState::Initialized;
    let response = handle_without_io(r#"{"jsonrpc":"2.0","method":"ping","params":{}}"#, &mut state);
    assert!(response.is_none());
  }

  #[test]
  fn initialize_advances_state_and_shutdown_terminates() {
    let mut state = SessionState::UnInitialized;
    let response = handle_without_io(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, &mut state);
    assert!(response.unwrap().error.is_none());
    assert_eq!(state, SessionState::Initialized);

    let response = handle_without_io(r#"{"jsonrpc":"2.0","id":2,"method":"shutdown","params":{}}"#, &mut state);
    assert!(response.unwrap().error.is_none());
    assert_eq!(state, SessionState::Terminated);
  }

  /// Routes a line through [`handle_line`] against a real registry and platform
  /// thread; fine for the session-state and parse-error paths above since none of
  /// them reach a handler that touches the platform.
  fn handle_without_io(line: &str, state: &mut SessionState) -> Option<RpcResponse> {
    let registry = Registry::new();
    let platform = PlatformThread::spawn();
    let config = Config::default();
    handle_line(line, &registry, &platform, &config, state)
  }
}
