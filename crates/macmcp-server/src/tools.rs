/*!
The eight published tools (C9, spec §4.8): thin orchestration over the engine in
`macmcp_core` plus the live collaborators in [`macmcp_core::platform::macos`].

Every handler that targets an element by path resolves it by capturing a fresh
snapshot of whichever running application's tree actually contains that path —
a [`macmcp_core::path::Path`] carries no application identifier of its own
([`resolve_anywhere`]) — then acts through the frame center and the input
provider, never through a stale handle. Window move/resize/minimize are the one
exception: those operate on the live accessibility node directly, found by
walking `root_for_pid` -> `children` -> `AXWindow` at call time ([`with_window_node`]).
*/

use crate::registry::{
  optional_bool, optional_f64, optional_str, optional_u64, optional_usize, pointer, require_f64,
  require_str, schema, ToolCallResult, ToolContext, ToolSpec,
};
use crate::session::CHANGE_DETECTION_DELAY_CEILING;
use macmcp_core::diff::{diff_capped, DEFAULT_CATEGORY_CAP};
use macmcp_core::error::AxError;
use macmcp_core::platform::macos::{element_at, MacAccessibility, MacPlatform};
use macmcp_core::platform::{
  AccessibilityProvider, ApplicationProvider, ClipboardProvider, InputProvider, KeyStroke,
  MouseButton, ScreenProvider,
};
use macmcp_core::resolver::{DEFAULT_FILTER_LIMIT, FILTER_LIMIT_CEILING};
use macmcp_core::serializer::serialize;
use macmcp_core::types::ProcessId;
use macmcp_core::{
  CaptureOptions, Element, Filter, Frame, McpError, Point, Resolver, SerializeOptions, Snapshot,
  Verbosity,
};
use serde_json::{json, Value as Json};
use std::time::Duration;

/// The live accessibility node type, named through trait projection so this crate
/// never spells the private handle type `macmcp_core::platform::macos` keeps internal.
type Node = <MacAccessibility as AccessibilityProvider>::Node;

#[must_use]
pub fn build_tools() -> Vec<ToolSpec> {
  vec![
    ToolSpec {
      name: "explore_ui",
      description: "Captures and serializes an accessibility subtree: the whole system, one application, the element under a screen point, or one resolved path.",
      schema: explore_ui_schema,
      handler: explore_ui,
    },
    ToolSpec {
      name: "interact_ui",
      description: "Clicks, double-clicks, right-clicks, types into, drags, or scrolls a resolved element or screen point.",
      schema: interact_ui_schema,
      handler: interact_ui,
    },
    ToolSpec {
      name: "keyboard",
      description: "Types text, presses a single key, or plays a key sequence at the current keyboard focus.",
      schema: keyboard_schema,
      handler: keyboard,
    },
    ToolSpec {
      name: "menu_navigation",
      description: "Walks an application's menu bar: lists menus and items, opens a menu, or activates an item.",
      schema: menu_navigation_schema,
      handler: menu_navigation,
    },
    ToolSpec {
      name: "window_management",
      description: "Lists, focuses, minimizes, moves, resizes, or closes an application's windows.",
      schema: window_management_schema,
      handler: window_management,
    },
    ToolSpec {
      name: "application_management",
      description: "Launches, terminates, activates, hides, or queries running applications.",
      schema: application_management_schema,
      handler: application_management,
    },
    ToolSpec {
      name: "screenshot",
      description: "Captures the main display, one window, or one resolved element as a PNG.",
      schema: screenshot_schema,
      handler: screenshot,
    },
    ToolSpec {
      name: "clipboard_management",
      description: "Reads, writes, or clears the system clipboard's text contents.",
      schema: clipboard_management_schema,
      handler: clipboard_management,
    },
  ]
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn capture_options(ctx: &ToolContext<'_>, args: &Json) -> CaptureOptions {
  CaptureOptions {
    max_depth: optional_usize(args, "maxDepth").unwrap_or(ctx.config.max_depth),
    include_hidden: optional_bool(args, "includeHidden").unwrap_or(false),
    only_main_content: false,
  }
}

pub(crate) fn resolve_pid(ctx: &ToolContext<'_>, bundle_id: &str) -> Result<ProcessId, McpError> {
  let hint = bundle_id.to_owned();
  let by_bundle_id = hint.clone();
  ctx.platform.call(ctx.deadline(), move |platform| {
    if let Some(pid) = platform.applications.find_by_bundle_id(&by_bundle_id)? {
      return Ok(pid);
    }
    platform
      .applications
      .find_by_name(&by_bundle_id)?
      .ok_or_else(|| McpError::ApplicationNotFound { hint: by_bundle_id.clone() })
  })
  .map_err(|e| match e {
    McpError::ApplicationNotFound { .. } => McpError::ApplicationNotFound { hint: hint.clone() },
    other => other,
  })
}

pub(crate) fn capture_app(ctx: &ToolContext<'_>, pid: ProcessId, options: &CaptureOptions) -> Result<Snapshot, McpError> {
  let options = options.clone();
  ctx.platform.call(ctx.deadline(), move |platform| {
    let root = platform.accessibility.root_for_pid(pid)?;
    Snapshot::capture(&platform.accessibility, root, &options)
  })
}

/// Finds the running application whose tree actually contains `path_str`, since a
/// path alone carries no application identifier (spec §4.1 grammar is silent on it).
/// Every running application is snapshotted in turn until one resolves; an
/// `Ambiguous` hit inside one application's tree is returned immediately rather
/// than papered over by trying the next one.
pub(crate) fn resolve_anywhere(
  ctx: &ToolContext<'_>,
  path_str: &str,
  options: &CaptureOptions,
) -> Result<(ProcessId, Snapshot), McpError> {
  let path_str = path_str.to_owned();
  let options = options.clone();
  ctx.platform.call(ctx.deadline(), move |platform| {
    let apps = platform.accessibility.applications()?;
    for (pid, root) in apps {
      let Ok(snapshot) = Snapshot::capture(&platform.accessibility, root, &options) else {
        continue;
      };
      match Resolver::new(&snapshot).resolve(&path_str) {
        Ok(_) => return Ok((pid, snapshot)),
        Err(e @ McpError::Ambiguous { .. }) => return Err(e),
        Err(_) => continue,
      }
    }
    Err(McpError::NotFound { path: path_str })
  })
}

fn capture_at_position(
  ctx: &ToolContext<'_>,
  x: f64,
  y: f64,
  options: &CaptureOptions,
) -> Result<Option<Snapshot>, McpError> {
  let options = options.clone();
  ctx.platform.call(ctx.deadline(), move |platform| {
    let apps = platform.accessibility.applications()?;
    for (_, root) in apps {
      if let Some(handle) = element_at(&root, x, y) {
        let snapshot = Snapshot::capture(&platform.accessibility, handle, &options)?;
        return Ok(Some(snapshot));
      }
    }
    Ok(None)
  })
}

fn parse_filter(args: &Json) -> Option<Filter> {
  let raw = args.get("filter")?.as_object()?;
  let str_field = |key: &str| raw.get(key).and_then(Json::as_str).map(str::to_owned);
  Some(Filter {
    role: str_field("role"),
    title_contains: str_field("titleContains"),
    description_contains: str_field("descriptionContains"),
    value_contains: str_field("valueContains"),
    identifier_contains: str_field("identifierContains"),
    any_field_contains: str_field("anyFieldContains"),
    interactable: raw.get("interactable").and_then(Json::as_bool),
    include_disabled: raw.get("includeDisabled").and_then(Json::as_bool).unwrap_or(false),
    include_non_interactable: raw
      .get("includeNonInteractable")
      .and_then(Json::as_bool)
      .unwrap_or(false),
    in_main_content: raw.get("inMainContent").and_then(Json::as_bool),
    under_path: str_field("underPath"),
  })
}

/// Serializes either the filtered matches under `root_path` (an array) or, with no
/// filter, `root_path` itself (a single object) — spec §4.8 `explore_ui` behaviour.
fn respond_with_scope(
  snapshot: &Snapshot,
  root_path: Option<&str>,
  filter: Option<Filter>,
  limit: Option<usize>,
  options: &SerializeOptions,
) -> Result<ToolCallResult, McpError> {
  if let Some(mut filter) = filter {
    if filter.under_path.is_none() {
      filter.under_path = root_path.map(str::to_owned);
    }
    let (refs, truncated) = Resolver::new(snapshot).resolve_all(&filter, limit);
    let items: Vec<Json> =
      refs.iter().filter_map(|r| snapshot.get(*r)).map(|el| serialize(el, options)).collect();
    let mut result = ToolCallResult::ok(json!(items));
    if truncated {
      result = result.with_metadata(json!({ "truncated": true }));
    }
    Ok(result)
  } else {
    let element = match root_path {
      Some(p) => snapshot.by_path(p).ok_or_else(|| McpError::NotFound { path: p.to_owned() })?,
      None => &snapshot.root,
    };
    Ok(ToolCallResult::ok(serialize(element, options)))
  }
}

fn input_err(e: AxError) -> McpError {
  match e {
    AxError::PermissionDenied => McpError::PermissionDenied,
    AxError::Timeout => McpError::PlatformTimeout { millis: 5000 },
    AxError::NoValue | AxError::AttributeUnsupported | AxError::CannotComplete => {
      McpError::InputFailed { reason: e.to_string() }
    }
  }
}

fn capture_err(e: AxError) -> McpError {
  match e {
    AxError::PermissionDenied => McpError::PermissionDenied,
    _ => McpError::CaptureFailed { reason: e.to_string() },
  }
}

fn clipboard_err(e: AxError) -> McpError {
  McpError::ClipboardUnavailable { reason: e.to_string() }
}

fn do_click(ctx: &ToolContext<'_>, point: Point, button: MouseButton, clicks: u8) -> Result<(), McpError> {
  ctx.platform.call(ctx.deadline(), move |platform| platform.input.click(point, button, clicks).map_err(input_err))
}

// ---------------------------------------------------------------------------
// explore_ui
// ---------------------------------------------------------------------------

fn explore_ui(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let scope = require_str(args, "scope")?;
  let options = capture_options(ctx, args);
  let serialize_options = SerializeOptions {
    verbosity: Verbosity::Standard,
    show_coordinates: optional_bool(args, "showCoordinates").unwrap_or(false),
    show_actions: optional_bool(args, "showActions").unwrap_or(false),
  };
  let filter = parse_filter(args);
  let limit = optional_usize(args, "limit");

  let (snapshot, root_path) = match scope {
    "system" => return explore_system(ctx, &options, &serialize_options, filter.as_ref(), limit),
    "application" => {
      let bundle_id = require_str(args, "bundleId")?;
      let pid = resolve_pid(ctx, bundle_id)?;
      (capture_app(ctx, pid, &options)?, None)
    }
    "position" => {
      let x = require_f64(args, "x")?;
      let y = require_f64(args, "y")?;
      let snapshot = capture_at_position(ctx, x, y, &options)?
        .ok_or_else(|| McpError::NotFound { path: format!("position ({x}, {y})") })?;
      (snapshot, None)
    }
    "path" => {
      let path_str = require_str(args, "id")?;
      let (_pid, snapshot) = resolve_anywhere(ctx, path_str, &options)?;
      let full_path = {
        let outcome = Resolver::new(&snapshot).resolve(path_str)?;
        snapshot.get(outcome.reference()).map(|e| e.full_path.clone())
      }
      .ok_or_else(|| McpError::NotFound { path: path_str.to_owned() })?;
      (snapshot, Some(full_path))
    }
    other => return Err(McpError::InvalidScope { scope: other.to_owned() }),
  };

  respond_with_scope(&snapshot, root_path.as_deref(), filter, limit, &serialize_options)
}

fn explore_system(
  ctx: &ToolContext<'_>,
  options: &CaptureOptions,
  serialize_options: &SerializeOptions,
  filter: Option<&Filter>,
  limit: Option<usize>,
) -> Result<ToolCallResult, McpError> {
  let options = options.clone();
  let snapshots: Vec<(ProcessId, Snapshot)> = ctx.platform.call(ctx.deadline(), move |platform| {
    let apps = platform.accessibility.applications()?;
    let mut out = Vec::new();
    for (pid, root) in apps {
      if let Ok(snapshot) = Snapshot::capture(&platform.accessibility, root, &options) {
        out.push((pid, snapshot));
      }
    }
    Ok(out)
  })?;

  if let Some(filter) = filter {
    let mut limit_left = limit.unwrap_or(DEFAULT_FILTER_LIMIT).min(FILTER_LIMIT_CEILING);
    let mut items = Vec::new();
    let mut truncated = false;
    for (_, snapshot) in &snapshots {
      if limit_left == 0 {
        truncated = true;
        break;
      }
      let (refs, snap_truncated) = Resolver::new(snapshot).resolve_all(filter, Some(limit_left));
      truncated |= snap_truncated;
      limit_left = limit_left.saturating_sub(refs.len());
      items.extend(refs.iter().filter_map(|r| snapshot.get(*r)).map(|el| serialize(el, serialize_options)));
    }
    let mut result = ToolCallResult::ok(json!(items));
    if truncated {
      result = result.with_metadata(json!({ "truncated": true }));
    }
    return Ok(result);
  }

  let items: Vec<Json> = snapshots
    .iter()
    .map(|(pid, s)| json!({ "pid": pid.0, "application": serialize(&s.root, serialize_options) }))
    .collect();
  Ok(ToolCallResult::ok(json!(items)))
}

fn explore_ui_schema() -> Json {
  schema(
    json!({
      "scope": { "type": "string", "enum": ["system", "application", "position", "path"] },
      "bundleId": { "type": "string" },
      "x": { "type": "number" },
      "y": { "type": "number" },
      "id": { "type": "string" },
      "filter": { "type": "object" },
      "maxDepth": { "type": "integer" },
      "includeHidden": { "type": "boolean" },
      "limit": { "type": "integer" },
      "showCoordinates": { "type": "boolean" },
      "showActions": { "type": "boolean" },
    }),
    &["scope"],
  )
}

// ---------------------------------------------------------------------------
// interact_ui
// ---------------------------------------------------------------------------

/// The point an interaction lands on, plus the path to re-snapshot for change
/// detection — `None` falls back to the frontmost application's tree.
struct Target {
  point: Point,
  scope: Option<String>,
}

fn resolve_target(ctx: &ToolContext<'_>, args: &Json) -> Result<Target, McpError> {
  if let Some(path_str) = optional_str(args, "id") {
    let options = CaptureOptions { max_depth: ctx.config.max_depth, ..CaptureOptions::default() };
    let (_pid, snapshot) = resolve_anywhere(ctx, path_str, &options)?;
    let outcome = Resolver::new(&snapshot).resolve(path_str)?;
    let el = snapshot.get(outcome.reference()).ok_or_else(|| McpError::NotFound { path: path_str.to_owned() })?;
    if !el.state.enabled {
      return Err(McpError::Disabled { path: el.full_path.clone() });
    }
    let frame = el.frame.ok_or_else(|| McpError::NotFound { path: path_str.to_owned() })?;
    Ok(Target { point: frame.center(), scope: Some(el.full_path.clone()) })
  } else {
    let x = require_f64(args, "x")?;
    let y = require_f64(args, "y")?;
    Ok(Target { point: Point::new(x, y), scope: None })
  }
}

fn capture_change_scope(ctx: &ToolContext<'_>, target: &Target) -> Result<Element, McpError> {
  let options = CaptureOptions { max_depth: ctx.config.max_depth, ..CaptureOptions::default() };
  match &target.scope {
    Some(path) => {
      let (_pid, snapshot) = resolve_anywhere(ctx, path, &options)?;
      snapshot.by_path(path).cloned().ok_or_else(|| McpError::NotFound { path: path.clone() })
    }
    None => {
      let pid = ctx
        .platform
        .call(ctx.deadline(), |platform| {
          platform.applications.frontmost()?.ok_or(McpError::ApplicationNotFound { hint: "frontmost".into() })
        })?;
      let snapshot = capture_app(ctx, pid, &options)?;
      Ok(snapshot.root)
    }
  }
}

fn clamped_delay(ctx: &ToolContext<'_>, args: &Json) -> Duration {
  optional_u64(args, "changeDetectionDelay")
    .map(Duration::from_millis)
    .unwrap_or(ctx.config.change_detection_delay)
    .min(CHANGE_DETECTION_DELAY_CEILING)
}

fn interact_ui(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let action = require_str(args, "action")?;
  let detect_changes = optional_bool(args, "detectChanges").unwrap_or(false);
  let delay = clamped_delay(ctx, args);
  let target = resolve_target(ctx, args)?;

  let before = if detect_changes { Some(capture_change_scope(ctx, &target)?) } else { None };

  match action {
    "click" => do_click(ctx, target.point, MouseButton::Left, 1)?,
    "double_click" => do_click(ctx, target.point, MouseButton::Left, 2)?,
    "right_click" => do_click(ctx, target.point, MouseButton::Right, 1)?,
    "type" => {
      do_click(ctx, target.point, MouseButton::Left, 1)?;
      let text = require_str(args, "text")?.to_owned();
      ctx.platform.call(ctx.deadline(), move |platform| platform.input.type_text(&text).map_err(input_err))?;
    }
    "drag" => {
      let to = Point::new(require_f64(args, "toX")?, require_f64(args, "toY")?);
      let from = target.point;
      ctx.platform.call(ctx.deadline(), move |platform| platform.input.drag(from, to).map_err(input_err))?;
    }
    "scroll" => {
      let dx = optional_f64(args, "dx").unwrap_or(0.0);
      let dy = optional_f64(args, "dy").unwrap_or(0.0);
      let at = target.point;
      ctx.platform.call(ctx.deadline(), move |platform| platform.input.scroll(at, dx, dy).map_err(input_err))?;
    }
    other => {
      return Err(McpError::MalformedArgs {
        pointer: pointer("action"),
        reason: format!("unknown interact_ui action `{other}`"),
      })
    }
  }

  let mut result = ToolCallResult::ok(json!({ "status": "ok" }));
  if let Some(before) = before {
    std::thread::sleep(delay);
    let after = capture_change_scope(ctx, &target)?;
    let report = diff_capped(&before, &after, DEFAULT_CATEGORY_CAP);
    result = result.with_metadata(json!({ "changes": report }));
  }
  Ok(result)
}

fn interact_ui_schema() -> Json {
  schema(
    json!({
      "action": { "type": "string", "enum": ["click", "double_click", "right_click", "type", "drag", "scroll"] },
      "id": { "type": "string" },
      "x": { "type": "number" },
      "y": { "type": "number" },
      "text": { "type": "string" },
      "toX": { "type": "number" },
      "toY": { "type": "number" },
      "dx": { "type": "number" },
      "dy": { "type": "number" },
      "detectChanges": { "type": "boolean" },
      "changeDetectionDelay": { "type": "integer" },
    }),
    &["action"],
  )
}

// ---------------------------------------------------------------------------
// keyboard
// ---------------------------------------------------------------------------

fn parse_key_stroke(args: &Json) -> Result<KeyStroke, McpError> {
  let key = require_str(args, "key")?.to_owned();
  let modifiers = args
    .get("modifiers")
    .and_then(Json::as_array)
    .map(|arr| arr.iter().filter_map(Json::as_str).map(str::to_owned).collect())
    .unwrap_or_default();
  Ok(KeyStroke { key, modifiers })
}

fn parse_key_sequence(args: &Json) -> Result<Vec<KeyStroke>, McpError> {
  let seq = args.get("sequence").and_then(Json::as_array).ok_or_else(|| McpError::MalformedArgs {
    pointer: pointer("sequence"),
    reason: "expected an array at `sequence`".into(),
  })?;
  seq.iter().map(parse_key_stroke).collect()
}

fn keyboard(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let action = require_str(args, "action")?;
  let detect_changes = optional_bool(args, "detectChanges").unwrap_or(false);
  let delay = clamped_delay(ctx, args);
  // Keyboard input has no element to resolve; change detection falls back to
  // whatever application is currently frontmost.
  let target = Target { point: Point::new(0.0, 0.0), scope: None };
  let before = if detect_changes { Some(capture_change_scope(ctx, &target)?) } else { None };

  match action {
    "type_text" => {
      let text = require_str(args, "text")?.to_owned();
      ctx.platform.call(ctx.deadline(), move |platform| platform.input.type_text(&text).map_err(input_err))?;
    }
    "press_key" => {
      let stroke = parse_key_stroke(args)?;
      ctx.platform.call(ctx.deadline(), move |platform| platform.input.key_stroke(&stroke).map_err(input_err))?;
    }
    "key_sequence" => {
      let strokes = parse_key_sequence(args)?;
      ctx.platform.call(ctx.deadline(), move |platform| {
        for stroke in &strokes {
          platform.input.key_stroke(stroke).map_err(input_err)?;
        }
        Ok(())
      })?;
    }
    other => {
      return Err(McpError::MalformedArgs {
        pointer: pointer("action"),
        reason: format!("unknown keyboard action `{other}`"),
      })
    }
  }

  let mut result = ToolCallResult::ok(json!({ "status": "ok" }));
  if let Some(before) = before {
    std::thread::sleep(delay);
    let after = capture_change_scope(ctx, &target)?;
    let report = diff_capped(&before, &after, DEFAULT_CATEGORY_CAP);
    result = result.with_metadata(json!({ "changes": report }));
  }
  Ok(result)
}

fn keyboard_schema() -> Json {
  schema(
    json!({
      "action": { "type": "string", "enum": ["type_text", "press_key", "key_sequence"] },
      "text": { "type": "string" },
      "key": { "type": "string" },
      "modifiers": { "type": "array", "items": { "type": "string" } },
      "sequence": { "type": "array", "items": { "type": "object" } },
      "detectChanges": { "type": "boolean" },
      "changeDetectionDelay": { "type": "integer" },
    }),
    &["action"],
  )
}

// ---------------------------------------------------------------------------
// menu_navigation
// ---------------------------------------------------------------------------

pub(crate) fn menu_title(el: &Element) -> Option<String> {
  el.title.clone().or_else(|| el.description.clone())
}

fn menu_items(menu_bar_item: &Element, include_submenus: bool) -> Vec<Json> {
  let Some(menu) = menu_bar_item.children.iter().find(|c| c.role == "AXMenu") else {
    return Vec::new();
  };
  menu
    .children
    .iter()
    .filter(|c| c.role == "AXMenuItem")
    .map(|item| {
      let mut obj = json!({ "title": menu_title(item), "id": item.full_path });
      if include_submenus {
        let submenu = menu_items(item, true);
        if !submenu.is_empty() {
          obj.as_object_mut().expect("object literal").insert("submenuItems".into(), json!(submenu));
        }
      }
      obj
    })
    .collect()
}

fn menu_navigation(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let action = require_str(args, "action")?;
  let bundle_id = require_str(args, "bundleId")?;
  let pid = resolve_pid(ctx, bundle_id)?;
  let options = CaptureOptions { max_depth: ctx.config.max_depth, ..CaptureOptions::default() };
  let snapshot = capture_app(ctx, pid, &options)?;
  let menu_bar = snapshot
    .root
    .children
    .iter()
    .find(|c| c.role == "AXMenuBar")
    .ok_or_else(|| McpError::MenuNotFound { hint: bundle_id.to_owned() })?;

  match action {
    "getApplicationMenus" => {
      let menus: Vec<Json> =
        menu_bar.children.iter().map(|m| json!({ "title": menu_title(m), "id": m.full_path })).collect();
      Ok(ToolCallResult::ok(json!(menus)))
    }
    "getMenuItems" => {
      let title = require_str(args, "menuTitle")?;
      let include_submenus = optional_bool(args, "includeSubmenus").unwrap_or(false);
      let top = menu_bar
        .children
        .iter()
        .find(|m| menu_title(m).as_deref() == Some(title))
        .ok_or_else(|| McpError::MenuNotFound { hint: title.to_owned() })?;
      Ok(ToolCallResult::ok(json!(menu_items(top, include_submenus))))
    }
    "showMenu" => {
      let title = require_str(args, "menuTitle")?;
      let top = menu_bar
        .children
        .iter()
        .find(|m| menu_title(m).as_deref() == Some(title))
        .ok_or_else(|| McpError::MenuNotFound { hint: title.to_owned() })?;
      let frame = top.frame.ok_or_else(|| McpError::MenuNotFound { hint: title.to_owned() })?;
      do_click(ctx, frame.center(), MouseButton::Left, 1)?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "activateMenuItem" => {
      let item_path = require_str(args, "id")?;
      let item = snapshot.by_path(item_path).ok_or_else(|| McpError::MenuNotFound { hint: item_path.to_owned() })?;
      let frame = item.frame.ok_or_else(|| McpError::MenuNotFound { hint: item_path.to_owned() })?;
      if let Some(ancestor_title) = optional_str(args, "menuTitle") {
        let top = menu_bar.children.iter().find(|m| menu_title(m).as_deref() == Some(ancestor_title));
        if let Some(top_frame) = top.and_then(|m| m.frame) {
          do_click(ctx, top_frame.center(), MouseButton::Left, 1)?;
        }
      }
      do_click(ctx, frame.center(), MouseButton::Left, 1)?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    other => Err(McpError::MalformedArgs {
      pointer: pointer("action"),
      reason: format!("unknown menu_navigation action `{other}`"),
    }),
  }
}

fn menu_navigation_schema() -> Json {
  schema(
    json!({
      "action": { "type": "string", "enum": ["getApplicationMenus", "getMenuItems", "showMenu", "activateMenuItem"] },
      "bundleId": { "type": "string" },
      "menuTitle": { "type": "string" },
      "id": { "type": "string" },
      "includeSubmenus": { "type": "boolean" },
    }),
    &["action", "bundleId"],
  )
}

// ---------------------------------------------------------------------------
// window_management
// ---------------------------------------------------------------------------

pub(crate) fn window_descriptor(index: usize, el: &Element) -> Json {
  json!({
    "index": index,
    "id": el.full_path,
    "title": el.title,
    "frame": el.frame.map(|f| json!({ "x": f.x, "y": f.y, "w": f.w, "h": f.h })),
    "minimized": el.attributes.get("AXMinimized").is_some_and(|v| v == "true"),
  })
}

fn window_frame(snapshot: &Snapshot, index: usize, hint: &str) -> Result<Frame, McpError> {
  snapshot
    .root
    .children
    .iter()
    .filter(|c| c.role == "AXWindow")
    .nth(index)
    .and_then(|w| w.frame)
    .ok_or_else(|| McpError::WindowNotFound { hint: hint.to_owned() })
}

/// Walks `root_for_pid(pid) -> children -> AXWindow` live (never through a
/// snapshot) and applies `op` to the node at `window_index`.
fn with_window_node(
  ctx: &ToolContext<'_>,
  pid: ProcessId,
  window_index: usize,
  op: impl FnOnce(&MacPlatform, &Node) -> Result<(), AxError> + Send + 'static,
) -> Result<(), McpError> {
  ctx.platform.call(ctx.deadline(), move |platform| {
    let root = platform.accessibility.root_for_pid(pid)?;
    let mut windows = Vec::new();
    for child in platform.accessibility.children(&root)? {
      if platform.accessibility.attributes(&child)?.role == "AXWindow" {
        windows.push(child);
      }
    }
    let node = windows.into_iter().nth(window_index).ok_or(AxError::CannotComplete)?;
    op(platform, &node).map_err(|e| McpError::WindowNotFound { hint: e.to_string() })
  })
}

fn window_management(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let action = require_str(args, "action")?;
  let bundle_id = require_str(args, "bundleId")?;
  let pid = resolve_pid(ctx, bundle_id)?;
  let window_index = optional_usize(args, "windowIndex").unwrap_or(0);
  let shallow = CaptureOptions { max_depth: 2, ..CaptureOptions::default() };

  match action {
    "getApplicationWindows" => {
      let snapshot = capture_app(ctx, pid, &shallow)?;
      let windows: Vec<Json> = snapshot
        .root
        .children
        .iter()
        .filter(|c| c.role == "AXWindow")
        .enumerate()
        .map(|(i, w)| window_descriptor(i, w))
        .collect();
      Ok(ToolCallResult::ok(json!(windows)))
    }
    "getActiveWindow" => {
      let snapshot = capture_app(ctx, pid, &shallow)?;
      let mut windows = snapshot.root.children.iter().filter(|c| c.role == "AXWindow");
      let window = windows
        .clone()
        .find(|w| w.state.focused)
        .or_else(|| windows.next())
        .ok_or_else(|| McpError::WindowNotFound { hint: bundle_id.to_owned() })?;
      Ok(ToolCallResult::ok(window_descriptor(0, window)))
    }
    "focus" => {
      ctx.platform.call(ctx.deadline(), move |platform| Ok(platform.applications.activate(pid)?))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "minimize" => {
      let minimized = optional_bool(args, "minimized").unwrap_or(true);
      with_window_node(ctx, pid, window_index, move |platform, node| {
        platform.accessibility.set_minimized(node, minimized)
      })?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "move" => {
      let (x, y) = (require_f64(args, "x")?, require_f64(args, "y")?);
      let snapshot = capture_app(ctx, pid, &shallow)?;
      let current = window_frame(&snapshot, window_index, bundle_id)?;
      let frame = Frame::new(x, y, current.w, current.h);
      with_window_node(ctx, pid, window_index, move |platform, node| platform.accessibility.set_frame(node, frame))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "resize" => {
      let (w, h) = (require_f64(args, "width")?, require_f64(args, "height")?);
      let snapshot = capture_app(ctx, pid, &shallow)?;
      let current = window_frame(&snapshot, window_index, bundle_id)?;
      let frame = Frame::new(current.x, current.y, w, h);
      with_window_node(ctx, pid, window_index, move |platform, node| platform.accessibility.set_frame(node, frame))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "close" => {
      let snapshot = capture_app(ctx, pid, &shallow)?;
      let window = snapshot
        .root
        .children
        .iter()
        .filter(|c| c.role == "AXWindow")
        .nth(window_index)
        .ok_or_else(|| McpError::WindowNotFound { hint: bundle_id.to_owned() })?;
      let close_button = window
        .children
        .iter()
        .find(|c| c.subrole.as_deref() == Some("AXCloseButton"))
        .ok_or_else(|| McpError::WindowNotFound { hint: format!("{bundle_id} window has no close button") })?;
      let frame = close_button.frame.ok_or_else(|| McpError::WindowNotFound { hint: bundle_id.to_owned() })?;
      do_click(ctx, frame.center(), MouseButton::Left, 1)?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    other => Err(McpError::MalformedArgs {
      pointer: pointer("action"),
      reason: format!("unknown window_management action `{other}`"),
    }),
  }
}

fn window_management_schema() -> Json {
  schema(
    json!({
      "action": { "type": "string", "enum": ["getApplicationWindows", "getActiveWindow", "focus", "minimize", "move", "resize", "close"] },
      "bundleId": { "type": "string" },
      "windowIndex": { "type": "integer" },
      "windowId": { "type": "string" },
      "x": { "type": "number" },
      "y": { "type": "number" },
      "width": { "type": "number" },
      "height": { "type": "number" },
      "minimized": { "type": "boolean" },
    }),
    &["action", "bundleId"],
  )
}

// ---------------------------------------------------------------------------
// application_management
// ---------------------------------------------------------------------------

fn application_management(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let action = require_str(args, "action")?;
  match action {
    "launch" => {
      let bundle_id = require_str(args, "bundleId")?.to_owned();
      let wait_for_launch = optional_bool(args, "waitForLaunch").unwrap_or(true);
      let reason_id = bundle_id.clone();
      let pid = ctx.platform.call(ctx.deadline(), move |platform| {
        platform
          .applications
          .launch(&bundle_id)
          .map_err(|e| McpError::LaunchFailed { bundle_id: bundle_id.clone(), reason: e.to_string() })
      });
      let pid = pid.map_err(|e| match e {
        McpError::LaunchFailed { reason, .. } => McpError::LaunchFailed { bundle_id: reason_id, reason },
        other => other,
      })?;
      if wait_for_launch {
        std::thread::sleep(Duration::from_millis(500));
      }
      Ok(ToolCallResult::ok(json!({ "pid": pid.0 })))
    }
    "terminate" => {
      let pid = resolve_pid(ctx, require_str(args, "bundleId")?)?;
      ctx.platform.call(ctx.deadline(), move |platform| Ok(platform.applications.terminate(pid)?))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "forceTerminate" => {
      let pid = resolve_pid(ctx, require_str(args, "bundleId")?)?;
      ctx.platform.call(ctx.deadline(), move |platform| Ok(platform.applications.force_terminate(pid)?))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "activateApplication" => {
      let pid = resolve_pid(ctx, require_str(args, "bundleId")?)?;
      ctx.platform.call(ctx.deadline(), move |platform| Ok(platform.applications.activate(pid)?))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "hideApplication" => {
      let pid = resolve_pid(ctx, require_str(args, "bundleId")?)?;
      ctx.platform.call(ctx.deadline(), move |platform| Ok(platform.applications.hide(pid)?))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "hideOtherApplications" => {
      let keep = resolve_pid(ctx, require_str(args, "bundleId")?)?;
      ctx.platform.call(ctx.deadline(), move |platform| {
        for (pid, _) in platform.applications.running_applications()? {
          if pid != keep {
            let _ = platform.applications.hide(pid);
          }
        }
        Ok(())
      })?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "isRunning" => {
      let bundle_id = require_str(args, "bundleId")?.to_owned();
      let running = ctx
        .platform
        .call(ctx.deadline(), move |platform| Ok(platform.applications.find_by_bundle_id(&bundle_id)?.is_some()))?;
      Ok(ToolCallResult::ok(json!({ "running": running })))
    }
    "getRunningApplications" => {
      let apps =
        ctx.platform.call(ctx.deadline(), |platform| Ok(platform.applications.running_applications()?))?;
      let items: Vec<Json> = apps.into_iter().map(|(pid, name)| json!({ "pid": pid.0, "name": name })).collect();
      Ok(ToolCallResult::ok(json!(items)))
    }
    "getFrontmostApplication" => {
      let pid = ctx.platform.call(ctx.deadline(), |platform| Ok(platform.applications.frontmost()?))?;
      Ok(ToolCallResult::ok(json!({ "pid": pid.map(|p| p.0) })))
    }
    other => Err(McpError::MalformedArgs {
      pointer: pointer("action"),
      reason: format!("unknown application_management action `{other}`"),
    }),
  }
}

fn application_management_schema() -> Json {
  schema(
    json!({
      "action": { "type": "string", "enum": [
        "launch", "terminate", "forceTerminate", "activateApplication", "hideApplication",
        "hideOtherApplications", "isRunning", "getRunningApplications", "getFrontmostApplication",
      ] },
      "bundleId": { "type": "string" },
      "arguments": { "type": "array", "items": { "type": "string" } },
      "waitForLaunch": { "type": "boolean" },
    }),
    &["action"],
  )
}

// ---------------------------------------------------------------------------
// screenshot
// ---------------------------------------------------------------------------

fn screenshot(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let region = require_str(args, "region")?;
  let bytes = match region {
    "screen" => ctx.platform.call(ctx.deadline(), |platform| platform.screen.capture_screen().map_err(capture_err))?,
    "window" => {
      let bundle_id = require_str(args, "bundleId")?;
      let pid = resolve_pid(ctx, bundle_id)?;
      let window_title = optional_str(args, "windowTitle").map(str::to_owned);
      ctx.platform.call(ctx.deadline(), move |platform| {
        platform.screen.capture_window(pid, window_title.as_deref()).map_err(capture_err)
      })?
    }
    "element" => {
      let path_str = require_str(args, "id")?;
      let options = CaptureOptions { max_depth: ctx.config.max_depth, ..CaptureOptions::default() };
      let (_pid, snapshot) = resolve_anywhere(ctx, path_str, &options)?;
      let outcome = Resolver::new(&snapshot).resolve(path_str)?;
      let frame = snapshot
        .get(outcome.reference())
        .and_then(|e| e.frame)
        .ok_or_else(|| McpError::NotFound { path: path_str.to_owned() })?;
      ctx.platform.call(ctx.deadline(), move |platform| platform.screen.capture_rect(frame).map_err(capture_err))?
    }
    other => return Err(McpError::InvalidScope { scope: other.to_owned() }),
  };
  Ok(ToolCallResult::image(&bytes))
}

fn screenshot_schema() -> Json {
  schema(
    json!({
      "region": { "type": "string", "enum": ["screen", "window", "element"] },
      "bundleId": { "type": "string" },
      "windowTitle": { "type": "string" },
      "id": { "type": "string" },
    }),
    &["region"],
  )
}

// ---------------------------------------------------------------------------
// clipboard_management
// ---------------------------------------------------------------------------

fn clipboard_management(ctx: &ToolContext<'_>, args: &Json) -> Result<ToolCallResult, McpError> {
  let action = require_str(args, "action")?;
  match action {
    "read" => {
      let text = ctx.platform.call(ctx.deadline(), |platform| platform.clipboard.read_text().map_err(clipboard_err))?;
      Ok(ToolCallResult::ok(json!({ "text": text })))
    }
    "write" => {
      let data = require_str(args, "data")?.to_owned();
      ctx.platform.call(ctx.deadline(), move |platform| platform.clipboard.write_text(&data).map_err(clipboard_err))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    "clear" => {
      ctx.platform.call(ctx.deadline(), |platform| platform.clipboard.clear().map_err(clipboard_err))?;
      Ok(ToolCallResult::ok(json!({ "status": "ok" })))
    }
    other => Err(McpError::MalformedArgs {
      pointer: pointer("action"),
      reason: format!("unknown clipboard_management action `{other}`"),
    }),
  }
}

fn clipboard_management_schema() -> Json {
  schema(
    json!({
      "action": { "type": "string", "enum": ["read", "write", "clear"] },
      "type": { "type": "string" },
      "data": { "type": "string" },
    }),
    &["action"],
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use macmcp_core::types::ElementState;
  use std::collections::BTreeMap;

  fn bare(role: &str, path: &str) -> Element {
    Element {
      role: role.into(),
      subrole: None,
      title: None,
      description: None,
      help: None,
      value: None,
      value_description: None,
      placeholder: None,
      label: None,
      identifier: None,
      role_description: None,
      frame: Some(Frame::new(0.0, 0.0, 10.0, 10.0)),
      state: ElementState { enabled: true, visible: true, ..ElementState::default() },
      actions: Vec::new(),
      attributes: BTreeMap::new(),
      children: Vec::new(),
      path_segment: role.into(),
      full_path: path.into(),
      capture_error: None,
    }
  }

  #[test]
  fn parse_filter_reads_known_clauses() {
    let args = json!({
      "filter": { "role": "AXButton", "titleContains": "OK", "interactable": true, "includeDisabled": true }
    });
    let filter = parse_filter(&args).expect("filter present");
    assert_eq!(filter.role.as_deref(), Some("AXButton"));
    assert_eq!(filter.title_contains.as_deref(), Some("OK"));
    assert_eq!(filter.interactable, Some(true));
    assert!(filter.include_disabled);
  }

  #[test]
  fn parse_filter_absent_is_none() {
    assert!(parse_filter(&json!({})).is_none());
  }

  #[test]
  fn menu_title_falls_back_to_description() {
    let mut el = bare("AXMenuBarItem", "macos://ui/AXMenuBarItem");
    el.description = Some("File menu".into());
    assert_eq!(menu_title(&el), Some("File menu".into()));
  }

  #[test]
  fn menu_items_reads_through_ax_menu_child() {
    let mut item = bare("AXMenuItem", "macos://ui/AXMenuItem[@AXTitle=\"New\"]");
    item.title = Some("New".into());
    let mut menu = bare("AXMenu", "macos://ui/AXMenu");
    menu.children.push(item);
    let mut bar_item = bare("AXMenuBarItem", "macos://ui/AXMenuBarItem[@AXTitle=\"File\"]");
    bar_item.children.push(menu);

    let items = menu_items(&bar_item, false);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], json!("New"));
    assert!(items[0].get("submenuItems").is_none());
  }

  #[test]
  fn menu_items_empty_without_ax_menu_child() {
    let bar_item = bare("AXMenuBarItem", "macos://ui/AXMenuBarItem");
    assert!(menu_items(&bar_item, false).is_empty());
  }

  #[test]
  fn window_descriptor_carries_index_and_frame() {
    let el = bare("AXWindow", "macos://ui/AXWindow[@AXTitle=\"Main\"]");
    let json = window_descriptor(2, &el);
    assert_eq!(json["index"], 2);
    assert_eq!(json["frame"]["w"], 10.0);
    assert_eq!(json["minimized"], false);
  }

  #[test]
  fn input_err_maps_permission_denied_distinctly_from_cannot_complete() {
    assert_eq!(input_err(AxError::PermissionDenied).code(), "PermissionDenied");
    assert_eq!(input_err(AxError::CannotComplete).code(), "InputFailed");
  }

  #[test]
  fn capture_err_maps_cannot_complete_to_capture_failed() {
    assert_eq!(capture_err(AxError::CannotComplete).code(), "CaptureFailed");
  }

  #[test]
  fn clipboard_err_maps_to_clipboard_unavailable() {
    assert_eq!(clipboard_err(AxError::CannotComplete).code(), "ClipboardUnavailable");
  }

  #[test]
  fn schemas_require_their_documented_fields() {
    assert_eq!(explore_ui_schema()["required"], json!(["scope"]));
    assert_eq!(interact_ui_schema()["required"], json!(["action"]));
    assert_eq!(window_management_schema()["required"], json!(["action", "bundleId"]));
  }
}
