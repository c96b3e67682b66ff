/*!
The `macos://ui/...` path grammar: parsing, escaping, and canonicalization (spec §4.1).

```text
path      := "macos://ui/" segment ("/" segment)*
segment   := role predicate*
role      := [A-Za-z][A-Za-z0-9_]*
predicate := "[" "@" attr "=" '"' value '"' "]"
attr      := [A-Za-z][A-Za-z0-9_]*
value     := any character, with \" \\ \n \t escape sequences
```

A path is both a stable wire identifier and a query: canonicalization guarantees
`a == b` iff `normalize(a) == normalize(b)` — normalized paths compared byte-for-byte
are the only identity test the rest of the crate needs.
*/

use crate::error::McpError;
use std::fmt;

/// The fixed scheme prefix every path begins with.
pub const SCHEME: &str = "macos://ui/";

/// One `@attr="value"` predicate within a [`Segment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
  pub attr: String,
  pub value: String,
}

/// One `ROLE[@attr="value"]...` component of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
  pub role: String,
  pub predicates: Vec<Predicate>,
}

impl Segment {
  #[must_use]
  pub fn new(role: impl Into<String>) -> Self {
    Self { role: role.into(), predicates: Vec::new() }
  }

  #[must_use]
  pub fn with_predicate(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
    self.predicates.push(Predicate { attr: attr.into(), value: value.into() });
    self
  }

  /// Sorts predicates by attribute name, lexicographically (spec §4.1).
  fn sort_predicates(&mut self) {
    self.predicates.sort_by(|a, b| a.attr.cmp(&b.attr));
  }

  fn render(&self, out: &mut String) {
    out.push_str(&self.role);
    for p in &self.predicates {
      out.push_str("[@");
      out.push_str(&p.attr);
      out.push_str("=\"");
      out.push_str(&escape(&normalize_whitespace(&p.value)));
      out.push_str("\"]");
    }
  }

  /// Looks up the predicate value for `attr`, if this segment constrains it.
  #[must_use]
  pub fn predicate(&self, attr: &str) -> Option<&str> {
    self.predicates.iter().find(|p| p.attr == attr).map(|p| p.value.as_str())
  }
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = String::new();
    self.render(&mut out);
    f.write_str(&out)
  }
}

/// A parsed, not-yet-normalized path: the scheme plus its segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
  pub segments: Vec<Segment>,
}

impl Path {
  #[must_use]
  pub const fn root() -> Self {
    Self { segments: Vec::new() }
  }

  /// Parses a path string, failing with `McpError::MalformedPath` on any syntax
  /// violation (unbalanced quotes/brackets, bad escape, missing scheme, ...).
  pub fn parse(s: &str) -> Result<Self, McpError> {
    parse(s)
  }

  /// Sorts each segment's predicates by attribute name and collapses whitespace
  /// runs inside predicate values to a single space (spec §4.1).
  #[must_use]
  pub fn normalize(mut self) -> Self {
    for seg in &mut self.segments {
      seg.sort_predicates();
    }
    self
  }

  /// Appends a segment, returning the extended path (used when deriving
  /// `full_path` for a captured element from its ancestors, spec §4.3).
  #[must_use]
  pub fn child(mut self, segment: Segment) -> Self {
    self.segments.push(segment);
    self
  }

  /// True for the path that addresses the snapshot root itself (spec §4.3 edge case).
  #[must_use]
  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = String::from(SCHEME);
    for (i, seg) in self.segments.iter().enumerate() {
      if i > 0 {
        out.push('/');
      }
      seg.render(&mut out);
    }
    f.write_str(&out)
  }
}

/// Maps `"` → `\"`, `\` → `\\`, newline → `\n`, tab → `\t`; other characters untouched.
#[must_use]
pub fn escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      _ => out.push(c),
    }
  }
  out
}

/// Collapses runs of ASCII/Unicode whitespace to a single space (spec §4.1).
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut in_run = false;
  for c in s.chars() {
    if c.is_whitespace() {
      if !in_run {
        out.push(' ');
        in_run = true;
      }
    } else {
      out.push(c);
      in_run = false;
    }
  }
  out
}

/// The canonical string form of a path: parse, normalize, render.
pub fn normalize(s: &str) -> Result<String, McpError> {
  Ok(Path::parse(s)?.normalize().to_string())
}

fn malformed(path: &str, reason: impl Into<String>) -> McpError {
  McpError::MalformedPath { path: path.to_owned(), reason: reason.into() }
}

fn parse(s: &str) -> Result<Path, McpError> {
  let rest = s.strip_prefix(SCHEME).ok_or_else(|| {
    malformed(s, format!("path must start with `{SCHEME}`"))
  })?;

  if rest.is_empty() {
    return Ok(Path::root());
  }

  let mut segments = Vec::new();
  for raw_segment in rest.split('/') {
    segments.push(parse_segment(s, raw_segment)?);
  }
  Ok(Path { segments })
}

fn parse_segment(full: &str, raw: &str) -> Result<Segment, McpError> {
  let bytes = raw.as_bytes();
  let bracket_start = raw.find('[');
  let role_part = bracket_start.map_or(raw, |i| &raw[..i]);

  if role_part.is_empty() {
    return Err(malformed(full, "empty role in segment"));
  }
  if !is_valid_role(role_part) {
    return Err(malformed(full, format!("invalid role `{role_part}`")));
  }

  let mut segment = Segment::new(role_part);
  let Some(mut i) = bracket_start else {
    return Ok(segment);
  };

  while i < bytes.len() {
    if bytes[i] != b'[' {
      return Err(malformed(full, "expected `[` to start a predicate"));
    }
    let (predicate, next) = parse_predicate(full, raw, i)?;
    segment.predicates.push(predicate);
    i = next;
  }

  Ok(segment)
}

/// Parses one `[@attr="value"]` predicate starting at byte offset `start` (which
/// must point at the opening `[`). Returns the predicate and the offset just past
/// the closing `]`.
fn parse_predicate(full: &str, raw: &str, start: usize) -> Result<(Predicate, usize), McpError> {
  let bytes = raw.as_bytes();
  let mut i = start + 1;

  if bytes.get(i) != Some(&b'@') {
    return Err(malformed(full, "predicate must start with `[@`"));
  }
  i += 1;

  let attr_start = i;
  while bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_') {
    i += 1;
  }
  if i == attr_start {
    return Err(malformed(full, "empty predicate attribute name"));
  }
  let attr = &raw[attr_start..i];
  if !is_valid_attr(attr) {
    return Err(malformed(full, format!("invalid predicate attribute `{attr}`")));
  }

  if bytes.get(i) != Some(&b'=') {
    return Err(malformed(full, "expected `=` after predicate attribute"));
  }
  i += 1;
  if bytes.get(i) != Some(&b'"') {
    return Err(malformed(full, "expected opening `\"` for predicate value"));
  }
  i += 1;

  let (value, after_quote) = parse_quoted_value(full, raw, i)?;
  i = after_quote;

  if bytes.get(i) != Some(&b']') {
    return Err(malformed(full, "expected closing `]` for predicate"));
  }
  i += 1;

  Ok((Predicate { attr: attr.to_owned(), value }, i))
}

/// Parses the body of a `"..."` value starting just after the opening quote.
/// Returns the unescaped value and the offset just past the closing quote.
fn parse_quoted_value(full: &str, raw: &str, start: usize) -> Result<(String, usize), McpError> {
  let bytes = raw.as_bytes();
  let mut out = String::new();
  let mut i = start;

  loop {
    match bytes.get(i) {
      None => return Err(malformed(full, "unterminated predicate value")),
      Some(b'"') => return Ok((out, i + 1)),
      Some(b'\\') => {
        match bytes.get(i + 1) {
          Some(b'"') => out.push('"'),
          Some(b'\\') => out.push('\\'),
          Some(b'n') => out.push('\n'),
          Some(b't') => out.push('\t'),
          Some(other) => {
            return Err(malformed(full, format!("unknown escape sequence `\\{}`", *other as char)))
          }
          None => return Err(malformed(full, "unterminated escape sequence")),
        }
        i += 2;
      }
      Some(_) => {
        // Advance by one UTF-8 char, not one byte.
        let ch_len = raw[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&raw[i..i + ch_len]);
        i += ch_len;
      }
    }
  }
}

fn is_valid_role(s: &str) -> bool {
  let mut chars = s.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_attr(s: &str) -> bool {
  is_valid_role(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_root() {
    let p = Path::parse("macos://ui/").unwrap();
    assert!(p.is_root());
    assert_eq!(p.to_string(), "macos://ui/");
  }

  #[test]
  fn parses_single_segment_no_predicates() {
    let p = Path::parse("macos://ui/AXApplication").unwrap();
    assert_eq!(p.segments.len(), 1);
    assert_eq!(p.segments[0].role, "AXApplication");
  }

  #[test]
  fn parses_predicate_with_escaped_quote() {
    let p = Path::parse(r#"macos://ui/AXButton[@AXTitle="say \"hi\""]"#).unwrap();
    assert_eq!(p.segments[0].predicate("AXTitle"), Some("say \"hi\""));
  }

  #[test]
  fn rejects_missing_scheme() {
    let e = Path::parse("ui/AXButton").unwrap_err();
    assert_eq!(e.code(), "MalformedPath");
  }

  #[test]
  fn rejects_unterminated_value() {
    let e = Path::parse(r#"macos://ui/AXButton[@title="unterminated"#).unwrap_err();
    assert_eq!(e.code(), "MalformedPath");
  }

  #[test]
  fn rejects_unbalanced_bracket() {
    let e = Path::parse(r#"macos://ui/AXButton[@title="x""#).unwrap_err();
    assert_eq!(e.code(), "MalformedPath");
  }

  #[test]
  fn rejects_unknown_escape() {
    let e = Path::parse(r#"macos://ui/AXButton[@title="\x"]"#).unwrap_err();
    assert_eq!(e.code(), "MalformedPath");
  }

  #[test]
  fn normalize_sorts_predicates_by_attribute() {
    let raw = r#"macos://ui/AXButton[@AXTitle="OK"][@AXDescription="ok button"]"#;
    let normalized = normalize(raw).unwrap();
    assert_eq!(
      normalized,
      r#"macos://ui/AXButton[@AXDescription="ok button"][@AXTitle="OK"]"#
    );
  }

  #[test]
  fn normalize_collapses_internal_whitespace() {
    let raw = "macos://ui/AXButton[@AXTitle=\"a   b\tc\"]";
    let normalized = normalize(raw).unwrap();
    assert_eq!(normalized, r#"macos://ui/AXButton[@AXTitle="a b c"]"#);
  }

  #[test]
  fn escape_roundtrips_through_parse() {
    let value = "a\\b\"c\nd\te";
    let escaped = escape(value);
    let path_str = format!(r#"macos://ui/AXButton[@AXTitle="{escaped}"]"#);
    let parsed = Path::parse(&path_str).unwrap();
    assert_eq!(parsed.segments[0].predicate("AXTitle"), Some(value));
  }

  #[cfg(test)]
  mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_role() -> impl Strategy<Value = String> {
      "[A-Za-z][A-Za-z0-9_]{0,12}".prop_map(String::from)
    }

    fn arb_value() -> impl Strategy<Value = String> {
      "[a-zA-Z0-9 ]{0,20}".prop_map(String::from)
    }

    fn arb_path() -> impl Strategy<Value = String> {
      proptest::collection::vec(
        (arb_role(), proptest::collection::vec((arb_role(), arb_value()), 0..3)),
        1..4,
      )
      .prop_map(|segs| {
        let mut out = String::from(SCHEME);
        for (i, (role, preds)) in segs.iter().enumerate() {
          if i > 0 {
            out.push('/');
          }
          out.push_str(role);
          for (attr, value) in preds {
            out.push_str(&format!("[@{attr}=\"{}\"]", escape(value)));
          }
        }
        out
      })
    }

    proptest! {
      /// Property 1 — path canonicalization is idempotent.
      #[test]
      fn normalize_is_idempotent(raw in arb_path()) {
        let once = normalize(&raw).unwrap();
        let twice = normalize(&once).unwrap();
        prop_assert_eq!(once, twice);
      }
    }
  }
}
