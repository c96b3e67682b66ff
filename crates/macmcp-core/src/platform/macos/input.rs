/*! [`InputProvider`] for macOS, synthesizing events through `CGEvent` (spec §4.8 `interact_ui`/`keyboard`). */

#![allow(clippy::cast_possible_truncation)]

use crate::error::AxError;
use crate::platform::{InputProvider, KeyStroke, MouseButton};
use crate::types::Point;
use objc2_core_foundation::CGPoint;
use objc2_core_graphics::{
  CGEvent, CGEventFlags, CGEventSource, CGEventSourceStateID, CGEventTapLocation, CGEventType,
  CGMouseButton,
};
use std::thread::sleep;
use std::time::Duration;

/// Gap between mouse-down and mouse-up in a synthetic click; long enough that
/// target applications reliably see a discrete press-then-release.
const CLICK_SETTLE: Duration = Duration::from_millis(12);

const fn native_button(button: MouseButton) -> CGMouseButton {
  match button {
    MouseButton::Left => CGMouseButton::Left,
    MouseButton::Right => CGMouseButton::Right,
  }
}

fn source() -> Option<objc2_core_foundation::CFRetained<CGEventSource>> {
  CGEventSource::new(CGEventSourceStateID::CombinedSessionState)
}

fn post(event: &CGEvent) {
  event.post(CGEventTapLocation::HIDEventTap);
}

fn cg_point(p: Point) -> CGPoint {
  CGPoint { x: p.x, y: p.y }
}

/// The live input provider, posting events into the HID event tap.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacInput;

impl InputProvider for MacInput {
  fn mouse_position(&self) -> Result<Point, AxError> {
    let src = source().ok_or(AxError::CannotComplete)?;
    let event = CGEvent::new(Some(&src)).ok_or(AxError::CannotComplete)?;
    let location = unsafe { CGEvent::location(Some(&event)) };
    Ok(Point::new(location.x, location.y))
  }

  fn move_mouse(&self, to: Point) -> Result<(), AxError> {
    let src = source().ok_or(AxError::CannotComplete)?;
    let event = unsafe {
      CGEvent::new_mouse_event(Some(&src), CGEventType::MouseMoved, cg_point(to), CGMouseButton::Left)
    }
    .ok_or(AxError::CannotComplete)?;
    post(&event);
    Ok(())
  }

  fn click(&self, at: Point, button: MouseButton, clicks: u8) -> Result<(), AxError> {
    let native_button = native_button(button);
    let (down, up) = match button {
      MouseButton::Left => (CGEventType::LeftMouseDown, CGEventType::LeftMouseUp),
      MouseButton::Right => (CGEventType::RightMouseDown, CGEventType::RightMouseUp),
    };
    let src = source().ok_or(AxError::CannotComplete)?;
    for _ in 0..clicks.max(1) {
      let down_event =
        unsafe { CGEvent::new_mouse_event(Some(&src), down, cg_point(at), native_button) }.ok_or(AxError::CannotComplete)?;
      down_event.set_integer_value_field(objc2_core_graphics::CGEventField::MouseEventClickState, i64::from(clicks.max(1)));
      post(&down_event);
      sleep(CLICK_SETTLE);
      let up_event =
        unsafe { CGEvent::new_mouse_event(Some(&src), up, cg_point(at), native_button) }.ok_or(AxError::CannotComplete)?;
      up_event.set_integer_value_field(objc2_core_graphics::CGEventField::MouseEventClickState, i64::from(clicks.max(1)));
      post(&up_event);
    }
    Ok(())
  }

  fn drag(&self, from: Point, to: Point) -> Result<(), AxError> {
    let src = source().ok_or(AxError::CannotComplete)?;
    let down = unsafe {
      CGEvent::new_mouse_event(Some(&src), CGEventType::LeftMouseDown, cg_point(from), CGMouseButton::Left)
    }
    .ok_or(AxError::CannotComplete)?;
    post(&down);
    sleep(CLICK_SETTLE);
    let dragged = unsafe {
      CGEvent::new_mouse_event(Some(&src), CGEventType::LeftMouseDragged, cg_point(to), CGMouseButton::Left)
    }
    .ok_or(AxError::CannotComplete)?;
    post(&dragged);
    sleep(CLICK_SETTLE);
    let up = unsafe { CGEvent::new_mouse_event(Some(&src), CGEventType::LeftMouseUp, cg_point(to), CGMouseButton::Left) }
      .ok_or(AxError::CannotComplete)?;
    post(&up);
    Ok(())
  }

  fn scroll(&self, at: Point, dx: f64, dy: f64) -> Result<(), AxError> {
    self.move_mouse(at)?;
    let src = source().ok_or(AxError::CannotComplete)?;
    let event = unsafe {
      CGEvent::new_scroll_wheel_event2(
        Some(&src),
        objc2_core_graphics::CGScrollEventUnit::Pixel,
        2,
        dy as i32,
        dx as i32,
      )
    }
    .ok_or(AxError::CannotComplete)?;
    post(&event);
    Ok(())
  }

  fn key_stroke(&self, stroke: &KeyStroke) -> Result<(), AxError> {
    let code = super::keycodes::code_for(&stroke.key).ok_or(AxError::AttributeUnsupported)?;
    let flags = super::keycodes::flags_for(&stroke.modifiers);
    let src = source().ok_or(AxError::CannotComplete)?;

    let down = unsafe { CGEvent::new_keyboard_event(Some(&src), code, true) }.ok_or(AxError::CannotComplete)?;
    down.set_flags(flags);
    post(&down);

    let up = unsafe { CGEvent::new_keyboard_event(Some(&src), code, false) }.ok_or(AxError::CannotComplete)?;
    up.set_flags(flags);
    post(&up);
    Ok(())
  }

  fn type_text(&self, text: &str) -> Result<(), AxError> {
    // Synthesize the whole string as one Unicode keyboard event rather than per-character
    // key codes, which only cover the current keyboard layout's mapped glyphs (spec §4.8).
    let src = source().ok_or(AxError::CannotComplete)?;
    let payload = objc2_core_foundation::CFString::from_str(text);

    let down = unsafe { CGEvent::new_keyboard_event(Some(&src), 0, true) }.ok_or(AxError::CannotComplete)?;
    unsafe { down.set_string(Some(&payload)) };
    post(&down);

    let up = unsafe { CGEvent::new_keyboard_event(Some(&src), 0, false) }.ok_or(AxError::CannotComplete)?;
    unsafe { up.set_string(Some(&payload)) };
    post(&up);
    Ok(())
  }
}

const fn _assert_flags_type(_: CGEventFlags) {}
