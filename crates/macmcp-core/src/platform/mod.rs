/*!
Narrow platform collaborator traits (spec §6.1).

Everything in [`crate::snapshot`], [`crate::resolver`], [`crate::serializer`], and
[`crate::diff`] is built entirely against [`AccessibilityProvider`] and is exercised
in tests with a fake implementation — no running accessibility host required. The
macOS implementation lives in [`macos`] and is the only place in this crate that
touches Objective-C.
*/

use crate::error::AxError;
use crate::types::{Frame, Point, ProcessId, Value};
use std::collections::BTreeMap;

#[cfg(target_os = "macos")]
pub mod macos;

/// One node's attributes as read from the platform, before being folded into a
/// [`crate::types::Element`] (§4.2). Kept separate so the capture loop can apply
/// benign-error/partial-data handling uniformly regardless of platform.
#[derive(Debug, Clone, Default)]
pub struct RawAttributes {
  pub role: String,
  pub subrole: Option<String>,
  pub title: Option<String>,
  pub description: Option<String>,
  pub help: Option<String>,
  pub value: Option<Value>,
  pub value_description: Option<String>,
  pub placeholder: Option<String>,
  pub label: Option<String>,
  pub identifier: Option<String>,
  pub role_description: Option<String>,
  pub frame: Option<Frame>,
  pub enabled: bool,
  pub visible: bool,
  pub focused: bool,
  pub selected: bool,
  /// `None` when the platform did not advertise this attribute for this role.
  pub expanded: Option<bool>,
  pub required: Option<bool>,
  pub actions: Vec<String>,
  pub attributes: BTreeMap<String, String>,
}

/// Read-only access to a live accessibility tree (C1, spec §6.1).
///
/// `Node` is an opaque, cheaply-cloneable handle to one element, window, or
/// application; nothing outside `platform::macos` inspects its internals.
pub trait AccessibilityProvider {
  type Node: Clone + Send;

  /// Every running application exposing an accessibility tree.
  fn applications(&self) -> Result<Vec<(ProcessId, Self::Node)>, AxError>;

  /// The root node of one process's accessibility tree.
  fn root_for_pid(&self, pid: ProcessId) -> Result<Self::Node, AxError>;

  /// The system-wide focused element, if any.
  fn focused(&self) -> Result<Option<Self::Node>, AxError>;

  /// Batch-reads every whitelisted attribute for one node in a single round trip.
  fn attributes(&self, node: &Self::Node) -> Result<RawAttributes, AxError>;

  /// This node's immediate children, in platform-reported order.
  fn children(&self, node: &Self::Node) -> Result<Vec<Self::Node>, AxError>;

  /// Invokes a named action (e.g. `"AXPress"`) on a node.
  fn perform_action(&self, node: &Self::Node, action: &str) -> Result<(), AxError>;

  /// Sets a node's value (text field contents, slider position, checkbox state, ...).
  fn set_value(&self, node: &Self::Node, value: &Value) -> Result<(), AxError>;

  /// Moves and resizes a window-like node (§4.8 `window_management` move/resize).
  fn set_frame(&self, node: &Self::Node, frame: Frame) -> Result<(), AxError>;

  /// Minimizes or restores a window-like node (§4.8 `window_management` minimize).
  fn set_minimized(&self, node: &Self::Node, minimized: bool) -> Result<(), AxError>;
}

/// A mouse button for [`InputProvider::click`] and [`InputProvider::drag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
  Left,
  Right,
}

/// One key press, carrying its modifier chord (spec §4.8 `keyboard`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
  /// A key name, e.g. `"return"`, `"a"`, `"tab"` (platform-specific naming, §6.1).
  pub key: String,
  pub modifiers: Vec<String>,
}

/// Synthesizes mouse and keyboard input (C1 collaborator, spec §4.8 `interact_ui`/`keyboard`).
pub trait InputProvider {
  fn mouse_position(&self) -> Result<Point, AxError>;
  fn move_mouse(&self, to: Point) -> Result<(), AxError>;
  fn click(&self, at: Point, button: MouseButton, clicks: u8) -> Result<(), AxError>;
  fn drag(&self, from: Point, to: Point) -> Result<(), AxError>;
  fn scroll(&self, at: Point, dx: f64, dy: f64) -> Result<(), AxError>;
  fn key_stroke(&self, stroke: &KeyStroke) -> Result<(), AxError>;
  fn type_text(&self, text: &str) -> Result<(), AxError>;
}

/// Application lifecycle management (C1 collaborator, spec §4.8 `application_management`).
pub trait ApplicationProvider {
  fn launch(&self, bundle_id: &str) -> Result<ProcessId, AxError>;
  fn terminate(&self, pid: ProcessId) -> Result<(), AxError>;
  fn activate(&self, pid: ProcessId) -> Result<(), AxError>;
  fn hide(&self, pid: ProcessId) -> Result<(), AxError>;
  /// `(pid, localized name)` for every running application with a UI presence.
  fn running_applications(&self) -> Result<Vec<(ProcessId, String)>, AxError>;
  fn find_by_name(&self, hint: &str) -> Result<Option<ProcessId>, AxError>;
  /// Uncooperative kill, used when [`ApplicationProvider::terminate`] is ignored
  /// (§4.8 `application_management` `forceTerminate`).
  fn force_terminate(&self, pid: ProcessId) -> Result<(), AxError>;
  /// Looks a running application up by bundle identifier rather than display name.
  fn find_by_bundle_id(&self, bundle_id: &str) -> Result<Option<ProcessId>, AxError>;
  /// The currently active application, if any (§4.8 `getFrontmostApplication`).
  fn frontmost(&self) -> Result<Option<ProcessId>, AxError>;
}

/// Screen and window capture (C1 collaborator, spec §4.8 `screenshot`).
pub trait ScreenProvider {
  /// PNG-encoded capture of one window, identified by owning process and an
  /// optional title substring (ambiguous matches resolve to the frontmost window).
  fn capture_window(&self, pid: ProcessId, window_title: Option<&str>) -> Result<Vec<u8>, AxError>;
  /// PNG-encoded capture of the main display.
  fn capture_screen(&self) -> Result<Vec<u8>, AxError>;
  /// PNG-encoded capture of a screen-coordinate rectangle, used to screenshot a
  /// single resolved element (§4.8 `screenshot` `region=element`).
  fn capture_rect(&self, rect: Frame) -> Result<Vec<u8>, AxError>;
}

/// System clipboard access (C1 collaborator, spec §4.8 `clipboard_management`).
pub trait ClipboardProvider {
  fn read_text(&self) -> Result<Option<String>, AxError>;
  fn write_text(&self, text: &str) -> Result<(), AxError>;
  fn clear(&self) -> Result<(), AxError>;
}
