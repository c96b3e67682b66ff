/*!
Shaping a captured element into a compact, verbosity-controlled wire record (C5, spec §4.5).

The field table only ever serializes values that carry information: a state flag
at its default (not `enabled: false`, not `focused: true`) is simply omitted rather
than spelled out, so a quiet element's record stays small (Property 3, spec §8).
*/

use crate::types::Element;
use serde_json::{json, Map, Value as Json};

/// How much of an element's field table to include (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
  /// Role, path, and only the fields that distinguish this element from a bare one.
  Compact,
  /// Compact plus value, state, and capability tokens. The default.
  #[default]
  Standard,
  /// Standard plus every descriptive string field (help, subrole, role description, ...).
  Full,
}

/// Per-call serialization knobs (spec §4.5/§6.2 tool argument `showCoordinates`/`showActions`).
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
  pub verbosity: Verbosity,
  pub show_coordinates: bool,
  pub show_actions: bool,
}

/// Serializes one element (and, recursively, its children) to its wire JSON shape.
#[must_use]
pub fn serialize(el: &Element, options: &SerializeOptions) -> Json {
  let mut obj = Map::new();
  obj.insert("id".into(), json!(el.full_path));
  obj.insert("role".into(), json!(el.role));

  if let Some(name) = display_name(el) {
    obj.insert("name".into(), json!(name));
  }
  if let Some(description) = &el.description {
    if !description.is_empty() {
      obj.insert("description".into(), json!(description));
    }
  }

  if options.verbosity != Verbosity::Compact {
    if let Some(value) = &el.value {
      obj.insert("value".into(), json!(value.project()));
    }
    if let Some(state) = serialize_state(el) {
      obj.insert("state".into(), state);
    }
    let props = capability_tokens(el);
    if !props.is_empty() {
      obj.insert("props".into(), json!(props.join(",")));
    }
  }

  if options.verbosity == Verbosity::Full {
    if let Some(help) = &el.help {
      obj.insert("help".into(), json!(help));
    }
    if let Some(subrole) = &el.subrole {
      obj.insert("subrole".into(), json!(subrole));
    }
    if let Some(role_description) = &el.role_description {
      obj.insert("roleDescription".into(), json!(role_description));
    }
    if let Some(placeholder) = &el.placeholder {
      obj.insert("placeholder".into(), json!(placeholder));
    }
    if let Some(label) = &el.label {
      obj.insert("label".into(), json!(label));
    }
    if let Some(value_description) = &el.value_description {
      obj.insert("valueDescription".into(), json!(value_description));
    }
    if !el.attributes.is_empty() {
      obj.insert("attributes".into(), json!(el.attributes));
    }
  }

  if options.show_coordinates {
    if let Some(frame) = &el.frame {
      obj.insert("frame".into(), json!({ "x": frame.x, "y": frame.y, "w": frame.w, "h": frame.h }));
    }
  }

  if options.show_actions && !el.actions.is_empty() {
    obj.insert("actions".into(), json!(el.actions));
  }

  if let Some(error) = &el.capture_error {
    obj.insert("error".into(), json!(error));
  }

  if !el.children.is_empty() {
    let children: Vec<Json> = el.children.iter().map(|c| serialize(c, options)).collect();
    obj.insert("children".into(), Json::Array(children));
  }

  Json::Object(obj)
}

/// The `name` field (spec §4.5): the element's title, falling back to its label,
/// suppressed when it would be redundant with `role` or the identifier already
/// embedded in `id`'s `@AXIdentifier` predicate (Property 3, spec §8).
fn display_name(el: &Element) -> Option<&str> {
  let name = el.title.as_deref().filter(|s| !s.is_empty()).or_else(|| el.label.as_deref().filter(|s| !s.is_empty()))?;
  if name == el.role {
    return None;
  }
  if el.identifier.as_deref() == Some(name) {
    return None;
  }
  Some(name)
}

/// Only the non-default flags of an element's state, as their spec tokens, or
/// `None` if every flag is at its default (enabled/visible true, focused/selected/required
/// false/absent, expanded/collapsed absent).
fn serialize_state(el: &Element) -> Option<Json> {
  let mut tokens = Vec::new();
  let s = &el.state;
  if !s.enabled {
    tokens.push("disabled");
  }
  if !s.visible {
    tokens.push("hidden");
  }
  if s.focused {
    tokens.push("focused");
  }
  if s.selected {
    tokens.push("selected");
  }
  match s.expanded {
    Some(true) => tokens.push("expanded"),
    Some(false) => tokens.push("collapsed"),
    None => {}
  }
  if let Some(true) = s.required {
    tokens.push("required");
  }
  (!tokens.is_empty()).then(|| json!(tokens))
}

/// Classifies an element's invokable capabilities from its role and action set,
/// independent of the raw platform action names (spec §4.5 `props`, fixed token set:
/// clickable, editable, toggleable, selectable, adjustable, scrollable, hasChildren,
/// hasMenu, hasHelp, hasTooltip).
fn capability_tokens(el: &Element) -> Vec<&'static str> {
  let mut tokens = Vec::new();
  let has_action = |name: &str| el.actions.iter().any(|a| a == name);

  if has_action("AXPress") {
    tokens.push("clickable");
  }
  if matches!(el.role.as_str(), "AXTextField" | "AXTextArea" | "AXComboBox" | "AXSearchField") {
    tokens.push("editable");
  }
  if matches!(el.role.as_str(), "AXCheckBox" | "AXRadioButton" | "AXToggle") {
    tokens.push("toggleable");
  }
  if has_action("AXPick") || matches!(el.role.as_str(), "AXRow" | "AXCell" | "AXMenuItem") {
    tokens.push("selectable");
  }
  if has_action("AXIncrement") || has_action("AXDecrement") || matches!(el.role.as_str(), "AXSlider" | "AXStepper") {
    tokens.push("adjustable");
  }
  if has_action("AXScrollToVisible") || matches!(el.role.as_str(), "AXScrollArea") {
    tokens.push("scrollable");
  }
  if !el.children.is_empty() {
    tokens.push("hasChildren");
  }
  if matches!(el.role.as_str(), "AXMenu" | "AXMenuBar" | "AXMenuItem" | "AXMenuButton") {
    tokens.push("hasMenu");
  }
  if el.description.as_deref().is_some_and(|d| !d.is_empty()) {
    tokens.push("hasHelp");
  }
  // AXHelp is the text AppKit surfaces as a hover tooltip.
  if el.help.as_deref().is_some_and(|h| !h.is_empty()) {
    tokens.push("hasTooltip");
  }
  tokens
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ElementState, Frame, Value};
  use std::collections::BTreeMap;

  fn bare(role: &str) -> Element {
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
      frame: Some(Frame::new(1.0, 2.0, 3.0, 4.0)),
      state: ElementState { enabled: true, visible: true, ..ElementState::default() },
      actions: Vec::new(),
      attributes: BTreeMap::new(),
      children: Vec::new(),
      path_segment: role.into(),
      full_path: format!("macos://ui/{role}"),
      capture_error: None,
    }
  }

  #[test]
  fn default_state_is_suppressed() {
    let el = bare("AXGroup");
    let json = serialize(&el, &SerializeOptions::default());
    assert!(json.get("state").is_none());
  }

  #[test]
  fn non_default_state_is_included() {
    let mut el = bare("AXButton");
    el.state.enabled = false;
    el.state.focused = true;
    let json = serialize(&el, &SerializeOptions::default());
    let state = json.get("state").unwrap();
    assert_eq!(state, &json!(["disabled", "focused"]));
  }

  #[test]
  fn coordinates_only_included_when_requested() {
    let el = bare("AXButton");
    let without = serialize(&el, &SerializeOptions::default());
    assert!(without.get("frame").is_none());
    let options = SerializeOptions { show_coordinates: true, ..SerializeOptions::default() };
    let with = serialize(&el, &options);
    assert_eq!(with["frame"]["x"], 1.0);
  }

  #[test]
  fn compact_verbosity_omits_value_and_props() {
    let mut el = bare("AXButton");
    el.value = Some(Value::String("x".into()));
    el.actions.push("AXPress".into());
    let options = SerializeOptions { verbosity: Verbosity::Compact, ..SerializeOptions::default() };
    let json = serialize(&el, &options);
    assert!(json.get("value").is_none());
    assert!(json.get("props").is_none());
  }

  #[test]
  fn clickable_button_gets_capability_token() {
    let mut el = bare("AXButton");
    el.actions.push("AXPress".into());
    let json = serialize(&el, &SerializeOptions::default());
    assert_eq!(json["props"], json!("clickable"));
  }

  #[test]
  fn props_joins_multiple_tokens_with_commas() {
    let mut el = bare("AXButton");
    el.actions.push("AXPress".into());
    el.children.push(bare("AXStaticText"));
    let json = serialize(&el, &SerializeOptions::default());
    assert_eq!(json["props"], json!("clickable,hasChildren"));
  }

  #[test]
  fn children_are_serialized_recursively() {
    let mut parent = bare("AXGroup");
    parent.children.push(bare("AXButton"));
    let json = serialize(&parent, &SerializeOptions::default());
    assert_eq!(json["children"].as_array().unwrap().len(), 1);
  }

  #[test]
  fn id_is_always_the_canonical_full_path() {
    let el = bare("AXButton");
    let json = serialize(&el, &SerializeOptions::default());
    assert_eq!(json["id"], json!("macos://ui/AXButton"));
  }

  #[test]
  fn name_omitted_when_equal_to_role() {
    let mut el = bare("AXButton");
    el.title = Some("AXButton".into());
    let json = serialize(&el, &SerializeOptions::default());
    assert!(json.get("name").is_none());
  }

  #[test]
  fn name_omitted_when_equal_to_identifier() {
    let mut el = bare("AXButton");
    el.title = Some("submit-btn".into());
    el.identifier = Some("submit-btn".into());
    let json = serialize(&el, &SerializeOptions::default());
    assert!(json.get("name").is_none());
  }

  #[test]
  fn name_present_when_distinct_from_role_and_identifier() {
    let mut el = bare("AXButton");
    el.title = Some("OK".into());
    el.identifier = Some("submit-btn".into());
    let json = serialize(&el, &SerializeOptions::default());
    assert_eq!(json["name"], json!("OK"));
  }

  #[cfg(test)]
  mod proptests {
    use super::*;

    /// Property 3 — serializer default-state suppression.
    #[test]
    fn default_state_strings_never_appear_with_minimal_verbosity() {
      // `bare()` is already all-default (enabled, visible; not focused/selected).
      let mut el = bare("AXButton");
      el.title = Some("AXButton".into());
      el.identifier = Some("AXButton".into());
      let options = SerializeOptions { show_coordinates: false, show_actions: false, ..SerializeOptions::default() };
      let json = serialize(&el, &options);
      assert!(json.get("state").is_none());
      let rendered = json.to_string();
      for forbidden in ["enabled", "visible", "unfocused", "unselected"] {
        assert!(!rendered.contains(forbidden));
      }
      assert!(json.get("name").is_none());
    }

    /// Property 3, non-default case: a disabled/hidden element's `state` names only
    /// the non-default tokens and never the default-state strings this forbids.
    #[test]
    fn disabled_hidden_element_never_spells_out_enabled_or_visible() {
      let mut el = bare("AXButton");
      el.state.enabled = false;
      el.state.visible = false;
      let json = serialize(&el, &SerializeOptions::default());
      let state = json["state"].as_array().expect("non-default state is an array");
      assert_eq!(state, &[json!("disabled"), json!("hidden")]);
      let rendered = json.to_string();
      for forbidden in ["enabled", "visible", "unfocused", "unselected"] {
        assert!(!rendered.contains(forbidden));
      }
    }
  }
}
