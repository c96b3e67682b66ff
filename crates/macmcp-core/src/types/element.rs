/*! The captured UI element: the atomic unit of a [`crate::snapshot::Snapshot`]. */

use super::{Frame, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Boolean/tri-state flags captured alongside an element (§3 `state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementState {
  pub enabled: bool,
  pub visible: bool,
  pub focused: bool,
  pub selected: bool,
  /// Tri-state: `None` means the platform did not advertise this attribute.
  pub expanded: Option<bool>,
  pub required: Option<bool>,
}

/// One node of a captured accessibility tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
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
  pub state: ElementState,
  /// Ordered set of invokable operation names, e.g. `"AXPress"`.
  pub actions: Vec<String>,
  /// Extensible string-projected attribute overflow; platform-specific.
  pub attributes: BTreeMap<String, String>,
  /// Ordered children, in platform-reported order.
  pub children: Vec<Element>,
  /// This node's own path segment, e.g. `AXButton[@AXDescription="2"]` (§4.3).
  pub path_segment: String,
  /// The canonical full path from the snapshot root to this element (§4.3).
  pub full_path: String,
  /// Set when a platform read for this node (not its children) failed non-benignly;
  /// the node is kept with whatever partial data was captured (§4.2).
  pub capture_error: Option<String>,
}

impl Element {
  /// True if every field the serializer would otherwise have to spell out is at its
  /// default, i.e. this element carries no additional identifying information beyond
  /// role and geometry. Used by the resolver's generic-group pruning.
  pub fn is_bare(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.value.is_none()
      && self.identifier.is_none()
  }

  /// Union of the string-valued fields an `anyFieldContains` filter clause searches,
  /// plus the attribute overflow map and the value's canonical projection (§4.3).
  pub fn searchable_text(&self, value_text: Option<&str>) -> Vec<&str> {
    let mut out = Vec::new();
    for field in [
      self.title.as_deref(),
      self.description.as_deref(),
      self.help.as_deref(),
      value_text,
      self.placeholder.as_deref(),
      self.label.as_deref(),
      self.identifier.as_deref(),
    ] {
      if let Some(s) = field {
        out.push(s);
      }
    }
    out.extend(self.attributes.values().map(String::as_str));
    out
  }

  pub fn value_text(&self) -> Option<String> {
    self.value.as_ref().map(Value::project)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bare(role: &str) -> Element {
    Element {
      role: role.to_owned(),
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
      attributes: BTreeMap::new(),
      children: Vec::new(),
      path_segment: role.to_owned(),
      full_path: format!("macos://ui/{role}"),
      capture_error: None,
    }
  }

  #[test]
  fn is_bare_true_for_plain_group() {
    assert!(bare("AXGroup").is_bare());
  }

  #[test]
  fn is_bare_false_once_titled() {
    let mut e = bare("AXGroup");
    e.title = Some("Sidebar".into());
    assert!(!e.is_bare());
  }

  #[test]
  fn value_text_projects_through_value() {
    let mut e = bare("AXTextField");
    e.value = Some(Value::String("hello".into()));
    assert_eq!(e.value_text().as_deref(), Some("hello"));
  }
}
