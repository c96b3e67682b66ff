/*!
Resource reads (C8, spec §4.7): thin wrappers over the same snapshot/resolve engine
the tools in [`crate::tools`] use, published under a handful of `macos://` URIs so a
client can read application/window/menu state without going through `tools/call`.
*/

use crate::registry::ToolContext;
use crate::tools::{capture_app, menu_title, resolve_anywhere, resolve_pid, window_descriptor};
use macmcp_core::platform::ApplicationProvider;
use macmcp_core::serializer::serialize;
use macmcp_core::{CaptureOptions, McpError, Resolver, SerializeOptions};
use serde_json::{json, Value as Json};

/// `(uri template, human name, mime type)` for every resource advertised by `resources/list`.
const RESOURCES: &[(&str, &str, &str)] = &[
  ("macos://applications", "Running applications", "application/json"),
  ("macos://applications/{bundleId}/windows", "An application's windows", "application/json"),
  ("macos://applications/{bundleId}/menus", "An application's menu bar", "application/json"),
  ("macos://ui/{path}", "A resolved accessibility element", "application/json"),
];

pub fn list() -> Result<Json, McpError> {
  let resources: Vec<Json> = RESOURCES
    .iter()
    .map(|(uri, name, mime_type)| json!({ "uri": uri, "name": name, "mimeType": mime_type }))
    .collect();
  Ok(json!({ "resources": resources }))
}

pub fn read(ctx: &ToolContext<'_>, uri: &str) -> Result<Json, McpError> {
  let body = if uri == "macos://applications" {
    read_applications(ctx)?
  } else if let Some(rest) = uri.strip_prefix("macos://applications/") {
    if let Some(bundle_id) = rest.strip_suffix("/windows") {
      read_windows(ctx, bundle_id)?
    } else if let Some(bundle_id) = rest.strip_suffix("/menus") {
      read_menus(ctx, bundle_id)?
    } else {
      return Err(McpError::NotFound { path: uri.to_owned() });
    }
  } else if uri.starts_with("macos://ui/") {
    read_ui(ctx, uri)?
  } else {
    return Err(McpError::NotFound { path: uri.to_owned() });
  };

  Ok(json!({
    "contents": [{ "uri": uri, "mimeType": "application/json", "text": body.to_string() }],
  }))
}

fn read_applications(ctx: &ToolContext<'_>) -> Result<Json, McpError> {
  let apps = ctx
    .platform
    .call(ctx.deadline(), |platform| Ok(platform.applications.running_applications()?))?;
  Ok(json!(
    apps.into_iter().map(|(pid, name)| json!({ "pid": pid.0, "name": name })).collect::<Vec<_>>()
  ))
}

fn read_windows(ctx: &ToolContext<'_>, bundle_id: &str) -> Result<Json, McpError> {
  let pid = resolve_pid(ctx, bundle_id)?;
  let options = CaptureOptions { max_depth: 2, ..CaptureOptions::default() };
  let snapshot = capture_app(ctx, pid, &options)?;
  let windows: Vec<Json> = snapshot
    .root
    .children
    .iter()
    .filter(|c| c.role == "AXWindow")
    .enumerate()
    .map(|(index, window)| window_descriptor(index, window))
    .collect();
  Ok(json!(windows))
}

fn read_menus(ctx: &ToolContext<'_>, bundle_id: &str) -> Result<Json, McpError> {
  let pid = resolve_pid(ctx, bundle_id)?;
  let options = CaptureOptions { max_depth: ctx.config.max_depth, ..CaptureOptions::default() };
  let snapshot = capture_app(ctx, pid, &options)?;
  let menu_bar = snapshot
    .root
    .children
    .iter()
    .find(|c| c.role == "AXMenuBar")
    .ok_or_else(|| McpError::MenuNotFound { hint: bundle_id.to_owned() })?;
  let menus: Vec<Json> = menu_bar
    .children
    .iter()
    .map(|menu| json!({ "title": menu_title(menu), "id": menu.full_path }))
    .collect();
  Ok(json!(menus))
}

fn read_ui(ctx: &ToolContext<'_>, uri: &str) -> Result<Json, McpError> {
  let options = CaptureOptions { max_depth: ctx.config.max_depth, ..CaptureOptions::default() };
  let (_pid, snapshot) = resolve_anywhere(ctx, uri, &options)?;
  let outcome = Resolver::new(&snapshot).resolve(uri)?;
  let element = snapshot
    .get(outcome.reference())
    .ok_or_else(|| McpError::NotFound { path: uri.to_owned() })?;
  Ok(serialize(element, &SerializeOptions::default()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn list_advertises_the_four_resource_templates() {
    let listed = list().unwrap();
    let resources = listed["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 4);
    assert_eq!(resources[0]["uri"], "macos://applications");
  }

  #[test]
  fn read_rejects_an_unrecognized_uri_shape() {
    let err = RESOURCES.iter().find(|(uri, _, _)| *uri == "macos://bogus");
    assert!(err.is_none());
  }
}
