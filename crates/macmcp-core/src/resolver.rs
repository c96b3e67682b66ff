/*!
Turning a path or a filter into one (or many) elements within a snapshot (C4, spec §4.3).

Exact resolution is a direct index lookup on the snapshot's canonical-path table.
When that misses, [`Resolver::resolve`] falls back through two looser matching
passes — substring predicates, then role-only — before giving up, so a path that
has drifted slightly (a button's title changed case, a window gained a subtitle)
still resolves instead of forcing the caller to re-capture and re-search.
*/

use crate::path::{Path, Segment};
use crate::types::{Element, ElementRef};
use crate::snapshot::Snapshot;
use crate::McpError;
use std::borrow::Cow;

/// Fuzzy passes give up rather than guess once more than this many elements match.
const FUZZY_CANDIDATE_CAP: usize = 3;
/// Default `limit` for a filter query when the caller doesn't specify one (§4.3).
pub const DEFAULT_FILTER_LIMIT: usize = 100;
/// Hard cap `limit` is clamped to regardless of caller request (§4.3).
pub const FILTER_LIMIT_CEILING: usize = 1000;

/// The outcome of a successful [`Resolver::resolve`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
  /// The canonical path matched an element exactly.
  Exact(ElementRef),
  /// No exact match; this element matched under a looser pass. `note` is
  /// surfaced to the caller so a drifted resolution is never silent.
  Fuzzy { reference: ElementRef, note: &'static str },
}

impl ResolveOutcome {
  #[must_use]
  pub const fn reference(&self) -> ElementRef {
    match self {
      Self::Exact(r) | Self::Fuzzy { reference: r, .. } => *r,
    }
  }
}

/// Roles recognized as clickable even when the platform reports no `AXPress` action
/// (spec §4.3 `interactable` clause), mirroring the serializer's capability tokens.
const CLICKABLE_ROLES: &[&str] = &[
  "AXButton", "AXCheckBox", "AXRadioButton", "AXMenuItem", "AXMenuButton", "AXPopUpButton",
  "AXLink", "AXTab",
];

/// Roles treated as chrome rather than content (mirrors [`crate::snapshot`]'s
/// `only_main_content` pruning, used here for the `inMainContent` filter clause).
const CHROME_ROLES: &[&str] = &["AXMenuBar", "AXToolbar", "AXStatusBar"];

/// A bulk-query predicate over a snapshot's elements (§4.3 filter resolution).
///
/// Every clause defaults to "don't constrain"; `include_disabled` and
/// `include_non_interactable` instead default to excluding (spec §4.3: "when false,
/// elements whose `enabled` is false are excluded").
#[derive(Debug, Clone, Default)]
pub struct Filter {
  pub role: Option<String>,
  pub title_contains: Option<String>,
  pub description_contains: Option<String>,
  pub value_contains: Option<String>,
  pub identifier_contains: Option<String>,
  pub any_field_contains: Option<String>,
  /// `true` requires a non-empty action set or a recognized clickable role.
  pub interactable: Option<bool>,
  /// When `false` (the default), elements with `enabled == false` are excluded.
  pub include_disabled: bool,
  /// When `false` (the default), elements with an empty action set and a
  /// non-interactable role are excluded.
  pub include_non_interactable: bool,
  /// When `true`, elements nested under chrome (menu bar, toolbar, status bar) are excluded.
  pub in_main_content: Option<bool>,
  /// Restrict the search to the subtree rooted at this canonical path.
  pub under_path: Option<String>,
}

impl Filter {
  fn is_interactable(el: &Element) -> bool {
    !el.actions.is_empty() || CLICKABLE_ROLES.contains(&el.role.as_str())
  }

  fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
  }

  fn matches(&self, el: &Element, in_chrome: bool) -> bool {
    if let Some(role) = &self.role {
      if &el.role != role {
        return false;
      }
    }
    if let Some(needle) = &self.title_contains {
      if !Self::contains(el.title.as_deref(), needle) {
        return false;
      }
    }
    if let Some(needle) = &self.description_contains {
      if !Self::contains(el.description.as_deref(), needle) {
        return false;
      }
    }
    if let Some(needle) = &self.identifier_contains {
      if !Self::contains(el.identifier.as_deref(), needle) {
        return false;
      }
    }
    if let Some(needle) = &self.value_contains {
      let value_text = el.value_text();
      if !Self::contains(value_text.as_deref(), needle) {
        return false;
      }
    }
    if let Some(needle) = &self.any_field_contains {
      let needle = needle.to_lowercase();
      let value_text = el.value_text();
      let hit = el
        .searchable_text(value_text.as_deref())
        .iter()
        .any(|s| s.to_lowercase().contains(&needle));
      if !hit {
        return false;
      }
    }
    if let Some(want) = self.interactable {
      if Self::is_interactable(el) != want {
        return false;
      }
    }
    if !self.include_disabled && !el.state.enabled {
      return false;
    }
    if !self.include_non_interactable && !Self::is_interactable(el) {
      return false;
    }
    if self.in_main_content == Some(true) && in_chrome {
      return false;
    }
    true
  }
}

/// Resolves paths and filters against one borrowed [`Snapshot`].
pub struct Resolver<'a> {
  snapshot: &'a Snapshot,
}

impl<'a> Resolver<'a> {
  #[must_use]
  pub const fn new(snapshot: &'a Snapshot) -> Self {
    Self { snapshot }
  }

  /// Resolves a path string to exactly one element, falling back through the
  /// fuzzy passes described in the module docs before failing (spec §4.3).
  pub fn resolve(&self, path_str: &str) -> Result<ResolveOutcome, McpError> {
    let target = Path::parse(path_str)?.normalize();
    let canonical = target.to_string();

    if let Some(reference) = self.snapshot.ref_for(&canonical) {
      return Ok(ResolveOutcome::Exact(reference));
    }

    for (mode, note) in [
      (MatchMode::Contains, "matched by substring, not exact predicate value"),
      (MatchMode::Ignore, "matched by role only, ignoring predicates"),
    ] {
      let mut out = Vec::new();
      collect_matches(&self.snapshot.root, &target.segments, mode, &mut out);
      match out.len() {
        0 => continue,
        1 => {
          let reference = self
            .snapshot
            .ref_for(&out[0].full_path)
            .ok_or_else(|| McpError::InternalError("resolved element missing from index".into()))?;
          return Ok(ResolveOutcome::Fuzzy { reference, note });
        }
        n if n <= FUZZY_CANDIDATE_CAP => {
          return Err(McpError::Ambiguous {
            path: canonical,
            candidates: out.iter().map(|e| e.full_path.clone()).collect(),
          });
        }
        _ => continue,
      }
    }

    Err(McpError::NotFound { path: canonical })
  }

  /// Bulk-resolves every element matching `filter`, in document order, up to
  /// `limit` (clamped to [`DEFAULT_FILTER_LIMIT`]/[`FILTER_LIMIT_CEILING`] if
  /// `None`/too large respectively). Returns the matches and whether the limit
  /// truncated the result (spec §4.3).
  #[must_use]
  pub fn resolve_all(&self, filter: &Filter, limit: Option<usize>) -> (Vec<ElementRef>, bool) {
    let limit = limit.unwrap_or(DEFAULT_FILTER_LIMIT).min(FILTER_LIMIT_CEILING);
    let start = match &filter.under_path {
      Some(raw) => {
        let Some(canonical) = Path::parse(raw).ok().map(|p| p.normalize().to_string()) else {
          return (Vec::new(), false);
        };
        let Some(el) = self.snapshot.by_path(&canonical) else {
          return (Vec::new(), false);
        };
        el
      }
      None => &self.snapshot.root,
    };

    let mut matches = Vec::new();
    let mut truncated = false;
    let starts_in_chrome = CHROME_ROLES.contains(&start.role.as_str());
    collect_filtered(start, filter, limit, starts_in_chrome, &mut matches, &mut truncated);

    let refs = matches
      .iter()
      .filter_map(|e| self.snapshot.ref_for(&e.full_path))
      .collect();
    (refs, truncated)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
  Contains,
  Ignore,
}

fn segment_matches(el: &Element, seg: &Segment, mode: MatchMode) -> bool {
  if el.role != seg.role {
    return false;
  }
  match mode {
    MatchMode::Ignore => true,
    MatchMode::Contains => seg.predicates.iter().all(|p| {
      attr_value(el, &p.attr).is_some_and(|v| v.to_lowercase().contains(&p.value.to_lowercase()))
    }),
  }
}

fn collect_matches<'a>(el: &'a Element, segments: &[Segment], mode: MatchMode, out: &mut Vec<&'a Element>) {
  let Some((seg, rest)) = segments.split_first() else {
    return;
  };
  if !segment_matches(el, seg, mode) {
    return;
  }
  if rest.is_empty() {
    out.push(el);
    return;
  }
  for child in &el.children {
    collect_matches(child, rest, mode, out);
  }
}

#[allow(clippy::too_many_arguments)]
fn collect_filtered<'a>(
  el: &'a Element,
  filter: &Filter,
  limit: usize,
  in_chrome: bool,
  out: &mut Vec<&'a Element>,
  truncated: &mut bool,
) {
  if out.len() >= limit {
    *truncated = true;
    return;
  }
  if filter.matches(el, in_chrome) {
    out.push(el);
  }
  let child_in_chrome = in_chrome || CHROME_ROLES.contains(&el.role.as_str());
  for child in &el.children {
    if out.len() >= limit {
      *truncated = true;
      return;
    }
    collect_filtered(child, filter, limit, child_in_chrome, out, truncated);
  }
}

/// Looks up a path predicate's attribute value on a captured element, covering
/// the well-known fields plus the string-projected attribute overflow map.
fn attr_value<'a>(el: &'a Element, attr: &str) -> Option<Cow<'a, str>> {
  match attr {
    "AXTitle" => el.title.as_deref().map(Cow::Borrowed),
    "AXDescription" => el.description.as_deref().map(Cow::Borrowed),
    "AXIdentifier" => el.identifier.as_deref().map(Cow::Borrowed),
    "AXHelp" => el.help.as_deref().map(Cow::Borrowed),
    "AXPlaceholderValue" => el.placeholder.as_deref().map(Cow::Borrowed),
    "AXLabel" => el.label.as_deref().map(Cow::Borrowed),
    "AXRoleDescription" => el.role_description.as_deref().map(Cow::Borrowed),
    "AXSubrole" => el.subrole.as_deref().map(Cow::Borrowed),
    "AXValue" => el.value_text().map(Cow::Owned),
    other => el.attributes.get(other).map(|s| Cow::Borrowed(s.as_str())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::{AccessibilityProvider, RawAttributes};
  use crate::snapshot::CaptureOptions;
  use crate::types::{Frame, ProcessId, Value};

  #[derive(Clone)]
  struct FakeNode(usize);

  struct FakeProvider {
    nodes: Vec<RawAttributes>,
    children: Vec<Vec<usize>>,
  }

  impl AccessibilityProvider for FakeProvider {
    type Node = FakeNode;

    fn applications(&self) -> Result<Vec<(ProcessId, Self::Node)>, crate::error::AxError> {
      Ok(vec![])
    }

    fn root_for_pid(&self, _pid: ProcessId) -> Result<Self::Node, crate::error::AxError> {
      Ok(FakeNode(0))
    }

    fn focused(&self) -> Result<Option<Self::Node>, crate::error::AxError> {
      Ok(None)
    }

    fn attributes(&self, node: &Self::Node) -> Result<RawAttributes, crate::error::AxError> {
      Ok(self.nodes[node.0].clone())
    }

    fn children(&self, node: &Self::Node) -> Result<Vec<Self::Node>, crate::error::AxError> {
      Ok(self.children[node.0].iter().map(|&i| FakeNode(i)).collect())
    }

    fn perform_action(&self, _node: &Self::Node, _action: &str) -> Result<(), crate::error::AxError> {
      Ok(())
    }

    fn set_value(&self, _node: &Self::Node, _value: &Value) -> Result<(), crate::error::AxError> {
      Ok(())
    }

    fn set_frame(&self, _node: &Self::Node, _frame: Frame) -> Result<(), crate::error::AxError> {
      Ok(())
    }

    fn set_minimized(&self, _node: &Self::Node, _minimized: bool) -> Result<(), crate::error::AxError> {
      Ok(())
    }
  }

  fn sample() -> Snapshot {
    let provider = FakeProvider {
      nodes: vec![
        RawAttributes { role: "AXWindow".into(), title: Some("Main".into()), enabled: true, visible: true, frame: Some(Frame::new(0.0,0.0,100.0,100.0)), ..Default::default() },
        RawAttributes { role: "AXButton".into(), title: Some("OK".into()), enabled: true, visible: true, ..Default::default() },
        RawAttributes { role: "AXButton".into(), title: Some("Cancel".into()), enabled: false, visible: true, ..Default::default() },
      ],
      children: vec![vec![1, 2], vec![], vec![]],
    };
    Snapshot::capture(&provider, FakeNode(0), &CaptureOptions::default()).unwrap()
  }

  #[test]
  fn resolves_exact_path() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let outcome = resolver
      .resolve(r#"macos://ui/AXWindow[@AXTitle="Main"]/AXButton[@AXTitle="OK"]"#)
      .unwrap();
    assert!(matches!(outcome, ResolveOutcome::Exact(_)));
  }

  #[test]
  fn falls_back_to_contains_match() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let outcome = resolver
      .resolve(r#"macos://ui/AXWindow[@AXTitle="Main"]/AXButton[@AXTitle="ok"]"#)
      .unwrap();
    assert!(matches!(outcome, ResolveOutcome::Fuzzy { .. }));
  }

  #[test]
  fn unknown_path_is_not_found() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let err = resolver.resolve(r#"macos://ui/AXWindow[@AXTitle="Main"]/AXSlider"#).unwrap_err();
    assert_eq!(err.code(), "NotFound");
  }

  #[test]
  fn ambiguous_role_only_match_reports_candidates() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let err = resolver
      .resolve(r#"macos://ui/AXWindow[@AXTitle="Main"]/AXButton[@AXTitle="nonexistent"]"#)
      .unwrap_err();
    assert_eq!(err.code(), "Ambiguous");
    assert_eq!(err.candidates().len(), 2);
  }

  #[test]
  fn filter_by_role_excludes_disabled_by_default() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let filter = Filter { role: Some("AXButton".into()), ..Filter::default() };
    let (matches, truncated) = resolver.resolve_all(&filter, None);
    assert!(!truncated);
    assert_eq!(matches.len(), 1);
  }

  #[test]
  fn include_disabled_widens_the_result() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let filter = Filter { role: Some("AXButton".into()), include_disabled: true, ..Filter::default() };
    let (matches, _) = resolver.resolve_all(&filter, None);
    assert_eq!(matches.len(), 2);
  }

  #[test]
  fn filter_any_field_contains_searches_value_text_too() {
    let provider = FakeProvider {
      nodes: vec![
        RawAttributes { role: "AXGroup".into(), enabled: true, visible: true, ..Default::default() },
        RawAttributes { role: "AXTextField".into(), value: Some(Value::String("hello world".into())), enabled: true, visible: true, ..Default::default() },
      ],
      children: vec![vec![1], vec![]],
    };
    let snap = Snapshot::capture(&provider, FakeNode(0), &CaptureOptions::default()).unwrap();
    let resolver = Resolver::new(&snap);
    let filter = Filter {
      any_field_contains: Some("WORLD".into()),
      include_non_interactable: true,
      ..Filter::default()
    };
    let (matches, _) = resolver.resolve_all(&filter, None);
    assert_eq!(matches.len(), 1);
  }

  #[test]
  fn title_contains_is_case_insensitive() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let filter = Filter { title_contains: Some("ok".into()), ..Filter::default() };
    let (matches, _) = resolver.resolve_all(&filter, None);
    assert_eq!(matches.len(), 1);
  }

  #[test]
  fn interactable_true_excludes_plain_groups() {
    let provider = FakeProvider {
      nodes: vec![
        RawAttributes { role: "AXWindow".into(), enabled: true, visible: true, ..Default::default() },
        RawAttributes { role: "AXGroup".into(), enabled: true, visible: true, ..Default::default() },
        RawAttributes { role: "AXButton".into(), title: Some("Go".into()), enabled: true, visible: true, ..Default::default() },
      ],
      children: vec![vec![1, 2], vec![], vec![]],
    };
    let snap = Snapshot::capture(&provider, FakeNode(0), &CaptureOptions::default()).unwrap();
    let resolver = Resolver::new(&snap);
    let filter = Filter { interactable: Some(true), include_non_interactable: true, ..Filter::default() };
    let (matches, _) = resolver.resolve_all(&filter, None);
    assert_eq!(matches.len(), 1);
  }

  /// Property 4 — filter monotonicity: adding a predicate never increases the result set.
  #[test]
  fn adding_a_predicate_never_increases_matches() {
    let snap = sample();
    let resolver = Resolver::new(&snap);
    let loose = Filter { role: Some("AXButton".into()), ..Filter::default() };
    let (loose_matches, _) = resolver.resolve_all(&loose, None);
    let tighter = Filter { role: Some("AXButton".into()), title_contains: Some("OK".into()), ..Filter::default() };
    let (tighter_matches, _) = resolver.resolve_all(&tighter, None);
    assert!(tighter_matches.len() <= loose_matches.len());
  }
}
