/*!
Immutable, bounded-depth captures of a live accessibility subtree (C2, spec §4.2).

A [`Snapshot`] is request-scoped: it is built once, handed to the resolver/serializer/
diff engine, and discarded. There is no session-level cache (spec §9) — every tool
invocation that needs fresh data captures a fresh snapshot.
*/

use crate::error::{AxError, McpError};
use crate::path::{Path, Segment};
use crate::platform::{AccessibilityProvider, RawAttributes};
use crate::types::{Element, ElementIndex, ElementRef, ElementState, SnapshotId};
use std::collections::HashMap;
use std::thread::sleep;
use std::time::Duration;

/// The soft default for [`CaptureOptions::max_depth`] (spec §4.2).
pub const DEFAULT_MAX_DEPTH: usize = 150;
/// The hard ceiling `max_depth` is clamped to regardless of caller request (spec §4.2).
pub const MAX_DEPTH_CEILING: usize = 250;
/// Fixed backoff schedule for the retry-twice policy decided in spec §9.
const RETRY_BACKOFF: [Duration; 2] = [Duration::from_millis(10), Duration::from_millis(30)];

/// Parameters governing one capture (spec §4.2).
#[derive(Debug, Clone)]
pub struct CaptureOptions {
  /// Maximum tree depth below the capture root. Clamped to [`MAX_DEPTH_CEILING`].
  pub max_depth: usize,
  /// Include elements the platform reports as not visible (default: exclude them).
  pub include_hidden: bool,
  /// Skip chrome (menu bars, toolbars not part of the content area) when true.
  pub only_main_content: bool,
}

impl Default for CaptureOptions {
  fn default() -> Self {
    Self { max_depth: DEFAULT_MAX_DEPTH, include_hidden: false, only_main_content: false }
  }
}

impl CaptureOptions {
  #[must_use]
  pub fn clamped(mut self) -> Self {
    self.max_depth = self.max_depth.min(MAX_DEPTH_CEILING);
    self
  }
}

/// Roles treated as chrome rather than content, pruned when `only_main_content` is set.
const CHROME_ROLES: &[&str] = &["AXMenuBar", "AXToolbar", "AXStatusBar"];

/// An immutable capture of one accessibility subtree, identified by [`SnapshotId`].
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub id: SnapshotId,
  pub root: Element,
  /// Pre-order path index, built once at capture time for [`Snapshot::get`]/[`Snapshot::by_path`].
  index: HashMap<String, ElementIndex>,
  /// Set when the walk stopped early because it hit `max_depth` (spec §4.2 edge case).
  pub truncated: bool,
}

impl Snapshot {
  /// Captures a fresh snapshot rooted at `root`, applying `options` (spec §4.2).
  pub fn capture<P: AccessibilityProvider>(
    provider: &P,
    root: P::Node,
    options: &CaptureOptions,
  ) -> Result<Self, McpError> {
    let options = options.clone().clamped();
    let id = SnapshotId::next();
    let mut truncated = false;
    let mut next_index = 0usize;
    let mut index = HashMap::new();
    let root_path = Path::root();
    let element = capture_node(
      provider,
      &root,
      &root_path,
      0,
      &options,
      &mut next_index,
      &mut index,
      &mut truncated,
    )?;
    Ok(Self { id, root: element, index, truncated })
  }

  /// Looks up a captured element by its resolved reference.
  #[must_use]
  pub fn get(&self, r: ElementRef) -> Option<&Element> {
    if r.snapshot_id != self.id {
      return None;
    }
    self.element_at(r.index)
  }

  /// Looks up a captured element by its canonical full path.
  #[must_use]
  pub fn by_path(&self, full_path: &str) -> Option<&Element> {
    let idx = *self.index.get(full_path)?;
    self.element_at(idx)
  }

  /// Every captured element, in pre-order (root first). Request-scoped snapshots
  /// are bounded in size, so a walk-to-index lookup is cheap enough not to warrant
  /// a parallel flat arena.
  #[must_use]
  pub fn element_at(&self, index: ElementIndex) -> Option<&Element> {
    self.iter().nth(index.0)
  }

  /// Pre-order iterator over every element in the tree, including the root.
  pub fn iter(&self) -> impl Iterator<Item = &Element> {
    PreOrder { stack: vec![&self.root] }
  }

  /// Builds an [`ElementRef`] for an element that is known to belong to this snapshot.
  #[must_use]
  pub fn ref_for(&self, full_path: &str) -> Option<ElementRef> {
    self.index.get(full_path).map(|idx| ElementRef::new(self.id, *idx))
  }
}

struct PreOrder<'a> {
  stack: Vec<&'a Element>,
}

impl<'a> Iterator for PreOrder<'a> {
  type Item = &'a Element;

  fn next(&mut self) -> Option<Self::Item> {
    let elem = self.stack.pop()?;
    for child in elem.children.iter().rev() {
      self.stack.push(child);
    }
    Some(elem)
  }
}

/// Retries a platform call up to twice more on a benign [`AxError`], per the fixed
/// backoff decided in spec §9. Never retries `PermissionDenied`/`CannotComplete`/`Timeout`.
fn with_retry<T>(mut f: impl FnMut() -> Result<T, AxError>) -> Result<T, AxError> {
  let mut attempt = 0;
  loop {
    match f() {
      Ok(v) => return Ok(v),
      Err(e) if e.is_retryable() && attempt < RETRY_BACKOFF.len() => {
        sleep(RETRY_BACKOFF[attempt]);
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

fn is_chrome(role: &str) -> bool {
  CHROME_ROLES.contains(&role)
}

/// Picks the attribute this node's path segment is keyed on, preferring the most
/// stable identifying field (spec §4.1/§4.3): identifier, then title, then description.
fn disambiguating_predicate(raw: &RawAttributes) -> Option<(&'static str, &str)> {
  if let Some(id) = raw.identifier.as_deref().filter(|s| !s.is_empty()) {
    return Some(("AXIdentifier", id));
  }
  if let Some(title) = raw.title.as_deref().filter(|s| !s.is_empty()) {
    return Some(("AXTitle", title));
  }
  if let Some(desc) = raw.description.as_deref().filter(|s| !s.is_empty()) {
    return Some(("AXDescription", desc));
  }
  None
}

#[allow(clippy::too_many_arguments)]
fn capture_node<P: AccessibilityProvider>(
  provider: &P,
  node: &P::Node,
  parent_path: &Path,
  depth: usize,
  options: &CaptureOptions,
  next_index: &mut usize,
  index: &mut HashMap<String, ElementIndex>,
  truncated: &mut bool,
) -> Result<Element, McpError> {
  let raw = with_retry(|| provider.attributes(node));
  let raw = match raw {
    Ok(raw) => raw,
    Err(e) => {
      // Non-benign at the node's own attribute read: keep a stub with the error recorded.
      let element_index = ElementIndex(*next_index);
      *next_index += 1;
      let segment = Segment::new("AXUnknown");
      let full_path = parent_path.clone().child(segment.clone()).to_string();
      index.insert(full_path.clone(), element_index);
      return Ok(Element {
        role: "AXUnknown".into(),
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
        frame: None,
        state: ElementState::default(),
        actions: Vec::new(),
        attributes: Default::default(),
        children: Vec::new(),
        path_segment: segment.to_string(),
        full_path,
        capture_error: Some(McpError::from(e).to_string()),
      });
    }
  };

  let mut segment = Segment::new(raw.role.clone());
  if let Some((attr, value)) = disambiguating_predicate(&raw) {
    segment = segment.with_predicate(attr, value);
  }
  let full_path = parent_path.clone().child(segment.clone()).to_string();
  let element_index = ElementIndex(*next_index);
  *next_index += 1;
  index.insert(full_path.clone(), element_index);

  let mut children = Vec::new();
  if depth + 1 > options.max_depth {
    *truncated = true;
  } else {
    let own_path = parent_path.clone().child(segment.clone());
    let raw_children = with_retry(|| provider.children(node)).unwrap_or_default();
    for child_node in raw_children {
      let child = capture_node(
        provider,
        &child_node,
        &own_path,
        depth + 1,
        options,
        next_index,
        index,
        truncated,
      )?;
      if !options.include_hidden && !child.state.visible && child.capture_error.is_none() {
        continue;
      }
      if options.only_main_content && is_chrome(&child.role) {
        continue;
      }
      children.push(child);
    }
  }

  Ok(Element {
    role: raw.role,
    subrole: raw.subrole,
    title: raw.title,
    description: raw.description,
    help: raw.help,
    value: raw.value,
    value_description: raw.value_description,
    placeholder: raw.placeholder,
    label: raw.label,
    identifier: raw.identifier,
    role_description: raw.role_description,
    frame: raw.frame,
    state: ElementState {
      enabled: raw.enabled,
      visible: raw.visible,
      focused: raw.focused,
      selected: raw.selected,
      expanded: raw.expanded,
      required: raw.required,
    },
    actions: raw.actions,
    attributes: raw.attributes,
    children,
    path_segment: segment.to_string(),
    full_path,
    capture_error: None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Frame, ProcessId, Value};
  use std::cell::RefCell;
  use std::collections::BTreeMap;

  /// A scripted, in-memory accessibility tree for exercising the capture loop
  /// without a real accessibility host.
  #[derive(Clone)]
  struct FakeNode(usize);

  struct FakeProvider {
    nodes: Vec<RawAttributes>,
    children: Vec<Vec<usize>>,
    attribute_calls: RefCell<usize>,
  }

  impl FakeProvider {
    fn leaf(role: &str, title: Option<&str>) -> RawAttributes {
      RawAttributes {
        role: role.into(),
        title: title.map(String::from),
        enabled: true,
        visible: true,
        frame: Some(Frame::new(0.0, 0.0, 10.0, 10.0)),
        ..Default::default()
      }
    }
  }

  impl AccessibilityProvider for FakeProvider {
    type Node = FakeNode;

    fn applications(&self) -> Result<Vec<(ProcessId, Self::Node)>, AxError> {
      Ok(vec![(ProcessId(1), FakeNode(0))])
    }

    fn root_for_pid(&self, _pid: ProcessId) -> Result<Self::Node, AxError> {
      Ok(FakeNode(0))
    }

    fn focused(&self) -> Result<Option<Self::Node>, AxError> {
      Ok(None)
    }

    fn attributes(&self, node: &Self::Node) -> Result<RawAttributes, AxError> {
      *self.attribute_calls.borrow_mut() += 1;
      Ok(self.nodes[node.0].clone())
    }

    fn children(&self, node: &Self::Node) -> Result<Vec<Self::Node>, AxError> {
      Ok(self.children[node.0].iter().map(|&i| FakeNode(i)).collect())
    }

    fn perform_action(&self, _node: &Self::Node, _action: &str) -> Result<(), AxError> {
      Ok(())
    }

    fn set_value(&self, _node: &Self::Node, _value: &Value) -> Result<(), AxError> {
      Ok(())
    }

    fn set_frame(&self, _node: &Self::Node, _frame: Frame) -> Result<(), AxError> {
      Ok(())
    }

    fn set_minimized(&self, _node: &Self::Node, _minimized: bool) -> Result<(), AxError> {
      Ok(())
    }
  }

  fn two_level_tree() -> FakeProvider {
    FakeProvider {
      nodes: vec![
        FakeProvider::leaf("AXWindow", Some("Main")),
        FakeProvider::leaf("AXButton", Some("OK")),
        FakeProvider::leaf("AXButton", Some("Cancel")),
      ],
      children: vec![vec![1, 2], vec![], vec![]],
      attribute_calls: RefCell::new(0),
    }
  }

  #[test]
  fn captures_nested_tree_with_full_paths() {
    let provider = two_level_tree();
    let snap = Snapshot::capture(&provider, FakeNode(0), &CaptureOptions::default()).unwrap();
    assert_eq!(snap.root.role, "AXWindow");
    assert_eq!(snap.root.children.len(), 2);
    assert_eq!(snap.root.children[0].full_path, r#"macos://ui/AXWindow[@AXTitle="Main"]/AXButton[@AXTitle="OK"]"#);
    assert!(!snap.truncated);
  }

  #[test]
  fn by_path_finds_a_nested_element() {
    let provider = two_level_tree();
    let snap = Snapshot::capture(&provider, FakeNode(0), &CaptureOptions::default()).unwrap();
    let found = snap.by_path(r#"macos://ui/AXWindow[@AXTitle="Main"]/AXButton[@AXTitle="Cancel"]"#);
    assert_eq!(found.map(|e| e.title.as_deref()), Some(Some("Cancel")));
  }

  #[test]
  fn max_depth_zero_truncates_below_root() {
    let provider = two_level_tree();
    let options = CaptureOptions { max_depth: 0, ..CaptureOptions::default() };
    let snap = Snapshot::capture(&provider, FakeNode(0), &options).unwrap();
    assert!(snap.root.children.is_empty());
    assert!(snap.truncated);
  }

  #[test]
  fn hidden_children_are_pruned_by_default() {
    let mut provider = two_level_tree();
    provider.nodes[1].visible = false;
    let snap = Snapshot::capture(&provider, FakeNode(0), &CaptureOptions::default()).unwrap();
    assert_eq!(snap.root.children.len(), 1);
    assert_eq!(snap.root.children[0].title.as_deref(), Some("Cancel"));
  }

  #[test]
  fn include_hidden_keeps_pruned_children() {
    let mut provider = two_level_tree();
    provider.nodes[1].visible = false;
    let options = CaptureOptions { include_hidden: true, ..CaptureOptions::default() };
    let snap = Snapshot::capture(&provider, FakeNode(0), &options).unwrap();
    assert_eq!(snap.root.children.len(), 2);
  }

  #[test]
  fn node_level_error_is_kept_as_stub_with_capture_error() {
    struct FailingProvider;
    impl AccessibilityProvider for FailingProvider {
      type Node = FakeNode;

      fn applications(&self) -> Result<Vec<(ProcessId, Self::Node)>, AxError> {
        Ok(vec![])
      }

      fn root_for_pid(&self, _pid: ProcessId) -> Result<Self::Node, AxError> {
        Ok(FakeNode(0))
      }

      fn focused(&self) -> Result<Option<Self::Node>, AxError> {
        Ok(None)
      }

      fn attributes(&self, _node: &Self::Node) -> Result<RawAttributes, AxError> {
        Err(AxError::CannotComplete)
      }

      fn children(&self, _node: &Self::Node) -> Result<Vec<Self::Node>, AxError> {
        Ok(vec![])
      }

      fn perform_action(&self, _node: &Self::Node, _action: &str) -> Result<(), AxError> {
        Ok(())
      }

      fn set_value(&self, _node: &Self::Node, _value: &Value) -> Result<(), AxError> {
        Ok(())
      }

      fn set_frame(&self, _node: &Self::Node, _frame: Frame) -> Result<(), AxError> {
        Ok(())
      }

      fn set_minimized(&self, _node: &Self::Node, _minimized: bool) -> Result<(), AxError> {
        Ok(())
      }
    }

    let snap = Snapshot::capture(&FailingProvider, FakeNode(0), &CaptureOptions::default()).unwrap();
    assert!(snap.root.capture_error.is_some());
  }
}
