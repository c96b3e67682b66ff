/*! Geometry types for screen coordinates. */

use serde::{Deserialize, Serialize};

/// A rectangle in screen coordinates: origin (x, y) and size (w, h).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Frame {
  pub x: f64,
  pub y: f64,
  pub w: f64,
  pub h: f64,
}

impl Frame {
  pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
    Self { x, y, w, h }
  }

  /// Approximate equality tolerating ±1 pixel per dimension (platforms round inconsistently).
  pub fn approx_eq(&self, other: &Frame) -> bool {
    self.matches(other, 1.0)
  }

  pub fn matches(&self, other: &Frame, margin: f64) -> bool {
    (self.x - other.x).abs() <= margin
      && (self.y - other.y).abs() <= margin
      && (self.w - other.w).abs() <= margin
      && (self.h - other.h).abs() <= margin
  }

  pub fn contains(&self, point: Point) -> bool {
    point.x >= self.x
      && point.x <= self.x + self.w
      && point.y >= self.y
      && point.y <= self.y + self.h
  }

  /// Center point, used as the default click target for a resolved element.
  pub fn center(&self) -> Point {
    Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
  }
}

/// A 2D point in screen coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  pub fn moved_from(&self, other: Point, threshold: f64) -> bool {
    (self.x - other.x).abs() >= threshold || (self.y - other.y).abs() >= threshold
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn frame_approx_eq_tolerates_one_pixel() {
    let a = Frame::new(0.0, 0.0, 100.0, 40.0);
    let b = Frame::new(0.6, -0.4, 100.0, 39.2);
    assert!(a.approx_eq(&b));
  }

  #[test]
  fn frame_approx_eq_rejects_larger_drift() {
    let a = Frame::new(0.0, 0.0, 100.0, 40.0);
    let b = Frame::new(2.0, 0.0, 100.0, 40.0);
    assert!(!a.approx_eq(&b));
  }

  #[test]
  fn frame_contains_point_on_edge() {
    let f = Frame::new(10.0, 10.0, 20.0, 20.0);
    assert!(f.contains(Point::new(10.0, 10.0)));
    assert!(f.contains(Point::new(30.0, 30.0)));
    assert!(!f.contains(Point::new(31.0, 10.0)));
  }
}
