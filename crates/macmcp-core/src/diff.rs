/*!
Diffing two snapshots rooted at the same logical scope (C6, spec §4.4).

Identity is a stable hash over `(role, title, description, identifier, approximate
frame)` rather than the full path, because the thing callers usually want to know
after an interaction ("did this button's value change?") is keyed on what the
element *is*, not where it currently sits in a possibly-reshuffled tree. Frame
equality tolerates ±1 pixel per dimension since platforms round inconsistently
(see [`crate::types::Frame::approx_eq`]).
*/

use crate::types::{Element, Frame};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Per-category cap before a change report is truncated (spec §4.4).
pub const DEFAULT_CATEGORY_CAP: usize = 64;

/// One element as it appeared on one side of a diff, kept minimal (spec §4.4 `modified`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshotView {
  pub path: String,
  pub role: String,
  pub value: Option<String>,
  pub enabled: bool,
  pub visible: bool,
  pub focused: bool,
  pub selected: bool,
  pub frame: Option<Frame>,
}

impl ElementSnapshotView {
  fn of(el: &Element) -> Self {
    Self {
      path: el.full_path.clone(),
      role: el.role.clone(),
      value: el.value_text(),
      enabled: el.state.enabled,
      visible: el.state.visible,
      focused: el.state.focused,
      selected: el.state.selected,
      frame: el.frame,
    }
  }

  /// True if `value`, state flags, or frame differ beyond the approximate tolerance.
  fn differs_from(&self, other: &Self) -> bool {
    self.value != other.value
      || self.enabled != other.enabled
      || self.visible != other.visible
      || self.focused != other.focused
      || self.selected != other.selected
      || !frames_match(self.frame, other.frame)
  }
}

fn frames_match(a: Option<Frame>, b: Option<Frame>) -> bool {
  match (a, b) {
    (Some(a), Some(b)) => a.approx_eq(&b),
    (None, None) => true,
    _ => false,
  }
}

/// One element whose `before`/`after` views differ (spec §4.4 `modified`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedElement {
  pub before: ElementSnapshotView,
  pub after: ElementSnapshotView,
}

/// Added/removed/modified elements between two snapshots of the same scope (spec §4.4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
  pub added: Vec<ElementSnapshotView>,
  pub removed: Vec<ElementSnapshotView>,
  pub modified: Vec<ChangedElement>,
  /// Set when any category hit [`DEFAULT_CATEGORY_CAP`] and was cut short (spec §4.4).
  pub truncated: bool,
}

impl ChangeReport {
  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
  }
}

/// A stable hash over the identity tuple `(role, title, description, identifier,
/// approximate frame)`. Frame is rounded to the nearest pixel before hashing so
/// elements within the ±1px tolerance still collide into the same identity bucket.
fn identity_hash(el: &Element) -> u64 {
  let mut hasher = DefaultHasher::new();
  el.role.hash(&mut hasher);
  el.title.hash(&mut hasher);
  el.description.hash(&mut hasher);
  el.identifier.hash(&mut hasher);
  if let Some(f) = el.frame {
    (f.x.round() as i64).hash(&mut hasher);
    (f.y.round() as i64).hash(&mut hasher);
    (f.w.round() as i64).hash(&mut hasher);
    (f.h.round() as i64).hash(&mut hasher);
  } else {
    0_i64.hash(&mut hasher);
  }
  hasher.finish()
}

/// Flattens a tree into `(identity hash, sibling index within parent, element)`,
/// so an identity-hash collision within one snapshot falls back to sibling index
/// (spec §4.4 "collisions fall back to sibling index within the parent").
fn flatten(root: &Element) -> Vec<(u64, usize, &Element)> {
  let mut out = Vec::new();
  flatten_into(root, &mut out);
  out
}

fn flatten_into<'a>(el: &'a Element, out: &mut Vec<(u64, usize, &'a Element)>) {
  for (i, child) in el.children.iter().enumerate() {
    out.push((identity_hash(child), i, child));
    flatten_into(child, out);
  }
  if out.is_empty() {
    out.push((identity_hash(el), 0, el));
  }
}

/// Keys a flattened list by `(identity_hash, sibling_index)` so hash collisions
/// between distinct siblings don't get merged into one bucket.
fn index_by_identity(elements: &[(u64, usize, &Element)]) -> HashMap<(u64, usize), &Element> {
  elements.iter().map(|&(h, i, el)| ((h, i), el)).collect()
}

/// Diffs `before` against `after`, both rooted at the same logical scope (spec §4.4).
#[must_use]
pub fn diff(before: &Element, after: &Element) -> ChangeReport {
  diff_capped(before, after, DEFAULT_CATEGORY_CAP)
}

/// As [`diff`], with an explicit per-category cap (used by tests; production code
/// should use [`diff`], which applies the spec default).
#[must_use]
pub fn diff_capped(before: &Element, after: &Element, cap: usize) -> ChangeReport {
  let before_flat = flatten(before);
  let after_flat = flatten(after);
  let before_index = index_by_identity(&before_flat);
  let after_index = index_by_identity(&after_flat);

  let mut report = ChangeReport::default();

  for (&key, &before_el) in &before_index {
    match after_index.get(&key) {
      None => {
        if report.removed.len() >= cap {
          report.truncated = true;
        } else {
          report.removed.push(ElementSnapshotView::of(before_el));
        }
      }
      Some(&after_el) => {
        let before_view = ElementSnapshotView::of(before_el);
        let after_view = ElementSnapshotView::of(after_el);
        if before_view.differs_from(&after_view) {
          if report.modified.len() >= cap {
            report.truncated = true;
          } else {
            report.modified.push(ChangedElement { before: before_view, after: after_view });
          }
        }
      }
    }
  }

  for (&key, &after_el) in &after_index {
    if !before_index.contains_key(&key) {
      if report.added.len() >= cap {
        report.truncated = true;
      } else {
        report.added.push(ElementSnapshotView::of(after_el));
      }
    }
  }

  report
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ElementState, Value};
  use std::collections::BTreeMap;

  fn leaf(role: &str, title: &str, value: Option<&str>, frame: Frame) -> Element {
    Element {
      role: role.into(),
      subrole: None,
      title: Some(title.into()),
      description: None,
      help: None,
      value: value.map(|v| Value::String(v.into())),
      value_description: None,
      placeholder: None,
      label: None,
      identifier: None,
      role_description: None,
      frame: Some(frame),
      state: ElementState { enabled: true, visible: true, ..ElementState::default() },
      actions: Vec::new(),
      attributes: BTreeMap::new(),
      children: Vec::new(),
      path_segment: role.into(),
      full_path: format!("macos://ui/{role}[@AXTitle=\"{title}\"]"),
      capture_error: None,
    }
  }

  fn parent(children: Vec<Element>) -> Element {
    Element {
      role: "AXWindow".into(),
      subrole: None,
      title: Some("Main".into()),
      description: None,
      help: None,
      value: None,
      value_description: None,
      placeholder: None,
      label: None,
      identifier: None,
      role_description: None,
      frame: Some(Frame::new(0.0, 0.0, 400.0, 300.0)),
      state: ElementState { enabled: true, visible: true, ..ElementState::default() },
      actions: Vec::new(),
      attributes: BTreeMap::new(),
      children,
      path_segment: "AXWindow".into(),
      full_path: r#"macos://ui/AXWindow[@AXTitle="Main"]"#.into(),
      capture_error: None,
    }
  }

  #[test]
  fn value_change_is_reported_as_modified() {
    let before = parent(vec![leaf("AXTextField", "Name", Some(""), Frame::new(0.0, 0.0, 100.0, 20.0))]);
    let after = parent(vec![leaf("AXTextField", "Name", Some("hello"), Frame::new(0.0, 0.0, 100.0, 20.0))]);
    let report = diff(&before, &after);
    assert_eq!(report.modified.len(), 1);
    assert_eq!(report.modified[0].before.value.as_deref(), Some(""));
    assert_eq!(report.modified[0].after.value.as_deref(), Some("hello"));
    assert!(report.added.is_empty());
    assert!(report.removed.is_empty());
  }

  #[test]
  fn new_element_is_reported_as_added() {
    let before = parent(vec![]);
    let after = parent(vec![leaf("AXButton", "OK", None, Frame::new(0.0, 0.0, 80.0, 24.0))]);
    let report = diff(&before, &after);
    assert_eq!(report.added.len(), 1);
    assert!(report.removed.is_empty());
  }

  #[test]
  fn removed_element_is_reported_as_removed() {
    let before = parent(vec![leaf("AXButton", "OK", None, Frame::new(0.0, 0.0, 80.0, 24.0))]);
    let after = parent(vec![]);
    let report = diff(&before, &after);
    assert_eq!(report.removed.len(), 1);
    assert!(report.added.is_empty());
  }

  #[test]
  fn sub_pixel_frame_drift_is_not_a_change() {
    let before = parent(vec![leaf("AXButton", "OK", None, Frame::new(0.0, 0.0, 80.0, 24.0))]);
    let after = parent(vec![leaf("AXButton", "OK", None, Frame::new(0.4, -0.4, 80.0, 24.0))]);
    let report = diff(&before, &after);
    assert!(report.is_empty());
  }

  #[test]
  fn unchanged_tree_produces_empty_report() {
    let before = parent(vec![leaf("AXButton", "OK", None, Frame::new(0.0, 0.0, 80.0, 24.0))]);
    let after = before.clone();
    let report = diff(&before, &after);
    assert!(report.is_empty());
  }

  #[test]
  fn truncates_at_cap_and_sets_flag() {
    let children: Vec<Element> = (0..5)
      .map(|i| leaf("AXButton", &format!("B{i}"), None, Frame::new(f64::from(i) * 10.0, 0.0, 8.0, 8.0)))
      .collect();
    let before = parent(vec![]);
    let after = parent(children);
    let report = diff_capped(&before, &after, 2);
    assert_eq!(report.added.len(), 2);
    assert!(report.truncated);
  }

  #[cfg(test)]
  mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_leaf(seed: u32) -> Element {
      leaf(
        "AXButton",
        &format!("B{seed}"),
        None,
        Frame::new(f64::from(seed) * 12.0, 0.0, 10.0, 10.0),
      )
    }

    proptest! {
      /// Property 5 — change diff symmetry: `diff(A,B).added == diff(B,A).removed`.
      #[test]
      fn diff_is_symmetric(a_count in 0u32..6, b_count in 0u32..6) {
        let a = parent((0..a_count).map(arb_leaf).collect());
        let b = parent((0..b_count).map(arb_leaf).collect());

        let forward = diff(&a, &b);
        let backward = diff(&b, &a);

        let mut forward_added: Vec<_> = forward.added.iter().map(|v| v.path.clone()).collect();
        let mut backward_removed: Vec<_> = backward.removed.iter().map(|v| v.path.clone()).collect();
        forward_added.sort();
        backward_removed.sort();
        prop_assert_eq!(forward_added, backward_removed);

        let mut forward_removed: Vec<_> = forward.removed.iter().map(|v| v.path.clone()).collect();
        let mut backward_added: Vec<_> = backward.added.iter().map(|v| v.path.clone()).collect();
        forward_removed.sort();
        backward_added.sort();
        prop_assert_eq!(forward_removed, backward_added);
      }
    }
  }
}
