/*!
Element values.

The wire data model (§3) treats `value` as "any scalar but is string-projected
for comparison". Internally we keep it typed so `interact_ui`/`keyboard` can set
values precisely (a checkbox wants a boolean, a slider a number); the serializer
and resolver both go through [`Value::project`] to get the canonical string form.
*/

use serde::{Deserialize, Serialize};

/// RGBA color with float components (0.0-1.0), used by color-well elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
  pub r: f64,
  pub g: f64,
  pub b: f64,
  pub a: f64,
}

impl Color {
  pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
    Self { r, g, b, a }
  }

  pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
    Self { r, g, b, a: 1.0 }
  }
}

/// A typed element value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
  String(String),
  Number(f64),
  Boolean(bool),
  Color(Color),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      Self::Number(_) | Self::Boolean(_) | Self::Color(_) => None,
    }
  }

  /// The canonical string projection used for identity/comparison (§3, §4.4).
  #[allow(clippy::cast_possible_truncation)]
  pub fn project(&self) -> String {
    match self {
      Self::String(s) => s.clone(),
      Self::Number(n) => {
        if n.fract() == 0.0 && n.is_finite() {
          format!("{}", *n as i64)
        } else {
          n.to_string()
        }
      }
      Self::Boolean(b) => b.to_string(),
      #[allow(clippy::cast_sign_loss)]
      Self::Color(c) => {
        let r = (c.r * 255.0).round() as u8;
        let g = (c.g * 255.0).round() as u8;
        let b = (c.b * 255.0).round() as u8;
        format!("rgba({r}, {g}, {b}, {})", c.a)
      }
    }
  }

  pub const fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Number(n) => Some(*n),
      Self::String(_) | Self::Boolean(_) | Self::Color(_) => None,
    }
  }

  pub const fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Boolean(b) => Some(*b),
      Self::String(_) | Self::Number(_) | Self::Color(_) => None,
    }
  }

  pub const fn as_color(&self) -> Option<&Color> {
    match self {
      Self::Color(c) => Some(c),
      Self::String(_) | Self::Number(_) | Self::Boolean(_) => None,
    }
  }

  pub const fn is_empty(&self) -> bool {
    matches!(self, Self::String(s) if s.is_empty())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Self::String(s)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Self::String(s.to_owned())
  }
}

impl From<f64> for Value {
  fn from(n: f64) -> Self {
    Self::Number(n)
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Self::Boolean(b)
  }
}

impl From<Color> for Value {
  fn from(c: Color) -> Self {
    Self::Color(c)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn string_accessors() {
    let v = Value::String("hello".into());
    assert_eq!(v.as_str(), Some("hello"));
    assert_eq!(v.as_f64(), None);
  }

  #[test]
  fn project_formats_integers_without_decimal() {
    assert_eq!(Value::Number(42.0).project(), "42");
    assert_eq!(Value::Number(-5.0).project(), "-5");
    assert_eq!(Value::Number(3.14).project(), "3.14");
  }

  #[test]
  fn project_formats_booleans() {
    assert_eq!(Value::Boolean(true).project(), "true");
  }

  #[test]
  fn project_formats_color_as_css_rgba() {
    let c = Color::new(1.0, 0.5, 0.0, 0.8);
    assert_eq!(Value::Color(c).project(), "rgba(255, 128, 0, 0.8)");
  }

  #[test]
  fn empty_string_value_is_empty() {
    assert!(Value::String(String::new()).is_empty());
    assert!(!Value::String("x".into()).is_empty());
    assert!(!Value::Boolean(false).is_empty());
  }
}

#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;

  proptest! {
    #[test]
    fn string_roundtrip(s in ".*") {
      let v = Value::from(s.clone());
      prop_assert_eq!(v.as_str(), Some(s.as_str()));
    }

    #[test]
    fn bool_roundtrip(b in any::<bool>()) {
      let v = Value::from(b);
      prop_assert_eq!(v.as_bool(), Some(b));
    }

    #[test]
    fn f64_roundtrip(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
      let v = Value::from(n);
      prop_assert_eq!(v.as_f64(), Some(n));
    }

    #[test]
    fn color_roundtrip(r in 0.0..=1.0f64, g in 0.0..=1.0f64, b in 0.0..=1.0f64, a in 0.0..=1.0f64) {
      let c = Color::new(r, g, b, a);
      let v = Value::from(c);
      let back = v.as_color().unwrap();
      prop_assert_eq!(back.r, r);
      prop_assert_eq!(back.g, g);
      prop_assert_eq!(back.b, b);
      prop_assert_eq!(back.a, a);
    }
  }
}
