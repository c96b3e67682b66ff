/*!
Opaque `AXUIElement` handle with safe accessor methods.

All unsafe code for reading/writing one element lives here; everything above
[`crate::platform::macos`] talks to [`AccessibilityProvider`](crate::platform::AccessibilityProvider)
instead, per spec §6.1.
*/

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::ref_as_ptr)]

use crate::types::{Color, Frame, Value};
use objc2_application_services::{
  AXCopyMultipleAttributeOptions, AXError, AXUIElement, AXValue as AXValueRef, AXValueType,
};
use objc2_core_foundation::{
  kCFNull, CFArray, CFBoolean, CFHash, CFNumber, CFRetained, CFString, CFType, CGPoint, CGSize,
};
use std::ffi::c_void;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;

// Not exposed by objc2-core-foundation's safe surface.
extern "C" {
  fn CFEqual(cf1: *const c_void, cf2: *const c_void) -> u8;
}

/// Every attribute [`ElementHandle::fetch_attributes`] reads in one batch call.
#[derive(Debug, Clone, Default)]
pub(super) struct RawElementAttributes {
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
  pub expanded: Option<bool>,
  pub required: Option<bool>,
  pub actions: Vec<String>,
}

/// Opaque handle to one UI element. Clone is cheap (reference counted).
#[derive(Clone)]
pub(crate) struct ElementHandle {
  inner: CFRetained<AXUIElement>,
  cached_hash: u64,
}

impl ElementHandle {
  pub(super) fn new(element: CFRetained<AXUIElement>) -> Self {
    let cached_hash = CFHash(Some(&*element)) as u64;
    Self { inner: element, cached_hash }
  }

  pub(super) fn for_application(pid: i32) -> Self {
    Self::new(unsafe { AXUIElement::new_application(pid) })
  }

  pub(super) fn pid(&self) -> Option<i32> {
    unsafe {
      let mut pid: i32 = 0;
      let result = self.inner.pid(NonNull::new_unchecked(&raw mut pid));
      (result == AXError::Success).then_some(pid)
    }
  }

  /// Compares identity with `CFEqual`, local and IPC-free.
  pub(super) fn cf_equal(&self, other: &Self) -> bool {
    let a = CFRetained::as_ptr(&self.inner).as_ptr().cast::<c_void>();
    let b = CFRetained::as_ptr(&other.inner).as_ptr().cast::<c_void>();
    unsafe { CFEqual(a, b) != 0 }
  }

  /// Retries exactly twice (3 attempts total) with a fixed 10ms/30ms backoff when the
  /// platform reports `AttributeUnsupported`/`NoValue`; every other code, including
  /// `PermissionDenied`, fails on the first attempt (decided retry policy, DESIGN.md).
  fn get_raw_attr(&self, attr: &CFString) -> Option<CFRetained<CFType>> {
    const BACKOFF_MS: [u64; 2] = [10, 30];
    let mut attempt = 0usize;
    loop {
      let mut value: *const CFType = std::ptr::null();
      let result = unsafe { self.inner.copy_attribute_value(attr, NonNull::new(&raw mut value)?) };
      if result == AXError::Success && !value.is_null() {
        return Some(unsafe { CFRetained::from_raw(NonNull::new_unchecked(value.cast_mut())) });
      }
      if !matches!(result, AXError::AttributeUnsupported | AXError::NoValue) || attempt >= BACKOFF_MS.len() {
        return None;
      }
      std::thread::sleep(std::time::Duration::from_millis(BACKOFF_MS[attempt]));
      attempt += 1;
    }
  }

  pub(super) fn get_string(&self, attr: &str) -> Option<String> {
    let value = self.get_raw_attr(&CFString::from_str(attr))?;
    let s = value.downcast_ref::<CFString>()?.to_string();
    (!s.is_empty()).then_some(s)
  }

  pub(super) fn get_element(&self, attr: &str) -> Option<ElementHandle> {
    let value = self.get_raw_attr(&CFString::from_str(attr))?;
    let element = value.downcast::<AXUIElement>().ok()?;
    Some(ElementHandle::new(element))
  }

  pub(super) fn get_children(&self) -> Vec<ElementHandle> {
    let Some(value) = self.get_raw_attr(&CFString::from_static_str("AXChildren")) else {
      return Vec::new();
    };
    let Ok(array) = value.downcast::<CFArray>() else {
      return Vec::new();
    };
    // AXChildren is always an array of AXUIElements.
    let typed: CFRetained<CFArray<AXUIElement>> = unsafe { CFRetained::cast_unchecked(array) };
    (0..typed.len()).filter_map(|i| typed.get(i)).map(ElementHandle::new).collect()
  }

  pub(super) fn get_actions(&self) -> Vec<String> {
    unsafe {
      let mut actions_ref: *const CFArray<CFString> = std::ptr::null();
      let result = self
        .inner
        .copy_action_names(NonNull::new((&raw mut actions_ref).cast::<*const CFArray>()).expect("actions ptr"));
      if result != AXError::Success || actions_ref.is_null() {
        return Vec::new();
      }
      let actions = CFRetained::<CFArray<CFString>>::from_raw(NonNull::new_unchecked(actions_ref.cast_mut()));
      (0..actions.len()).filter_map(|i| actions.get(i)).map(|s| s.to_string()).collect()
    }
  }

  pub(super) fn perform_action(&self, action: &str) -> Result<(), AXError> {
    let name = CFString::from_str(action);
    let result = unsafe { self.inner.perform_action(&name) };
    (result == AXError::Success).then_some(()).ok_or(result)
  }

  pub(super) fn set_value(&self, value: &Value) -> Result<(), AXError> {
    let attr = CFString::from_static_str("AXValue");
    let result = unsafe {
      match value {
        Value::String(s) => self.inner.set_attribute_value(&attr, &CFString::from_str(s)),
        Value::Boolean(b) => self.inner.set_attribute_value(&attr, &CFNumber::new_i32(i32::from(*b))),
        Value::Number(n) => self.inner.set_attribute_value(&attr, &CFNumber::new_f64(*n)),
        Value::Color(c) => {
          let s = format!("rgb {:.6} {:.6} {:.6} {:.6}", c.r, c.g, c.b, c.a);
          self.inner.set_attribute_value(&attr, &CFString::from_str(&s))
        }
      }
    };
    (result == AXError::Success).then_some(()).ok_or(result)
  }

  /// Sets `AXPosition`/`AXSize` together, used by window move/resize (§4.8
  /// `window_management`). Not part of [`ElementHandle::set_value`] since those two
  /// attributes are independent of `AXValue`.
  pub(super) fn set_frame(&self, frame: &Frame) -> Result<(), AXError> {
    let mut point = CGPoint { x: frame.x, y: frame.y };
    let mut size = CGSize { width: frame.w, height: frame.h };
    unsafe {
      let pos_ptr = NonNull::new((&raw mut point).cast::<c_void>()).expect("point ptr");
      let size_ptr = NonNull::new((&raw mut size).cast::<c_void>()).expect("size ptr");
      let Some(pos_value) = AXValueRef::new_cg_point(pos_ptr) else {
        return Err(AXError::CannotComplete);
      };
      let Some(size_value) = AXValueRef::new_cg_size(size_ptr) else {
        return Err(AXError::CannotComplete);
      };
      let pos_attr = CFString::from_static_str("AXPosition");
      let result = self.inner.set_attribute_value(&pos_attr, &*pos_value);
      if result != AXError::Success {
        return Err(result);
      }
      let size_attr = CFString::from_static_str("AXSize");
      let result = self.inner.set_attribute_value(&size_attr, &*size_value);
      (result == AXError::Success).then_some(()).ok_or(result)
    }
  }

  /// Toggles `AXMinimized`, used by window minimize/restore (§4.8 `window_management`).
  pub(super) fn set_minimized(&self, minimized: bool) -> Result<(), AXError> {
    let attr = CFString::from_static_str("AXMinimized");
    let result = unsafe { self.inner.set_attribute_value(&attr, &CFNumber::new_i32(i32::from(minimized))) };
    (result == AXError::Success).then_some(()).ok_or(result)
  }

  pub(super) fn element_at_position(&self, x: f64, y: f64) -> Option<ElementHandle> {
    unsafe {
      let mut element_ptr: *const AXUIElement = std::ptr::null();
      let result = self.inner.copy_element_at_position(x as f32, y as f32, NonNull::new(&raw mut element_ptr)?);
      if result != AXError::Success || element_ptr.is_null() {
        return None;
      }
      Some(ElementHandle::new(CFRetained::from_raw(NonNull::new_unchecked(element_ptr.cast_mut()))))
    }
  }

  pub(super) fn get_selected_text(&self) -> Option<String> {
    self.get_string("AXSelectedText")
  }

  /// Fetches every attribute the snapshot cares about in a single batch call.
  #[allow(clippy::too_many_lines)]
  pub(super) fn fetch_attributes(&self) -> RawElementAttributes {
    let names = [
      "AXRole",
      "AXSubrole",
      "AXTitle",
      "AXValue",
      "AXDescription",
      "AXHelp",
      "AXPlaceholderValue",
      "AXLabel",
      "AXIdentifier",
      "AXRoleDescription",
      "AXPosition",
      "AXSize",
      "AXFocused",
      "AXEnabled",
      "AXHidden",
      "AXSelected",
      "AXExpanded",
      "AXRequired",
    ];
    let cf_names: Vec<CFString> = names.iter().map(|n| CFString::from_static_str(n)).collect();
    let refs: Vec<&CFString> = cf_names.iter().collect();
    let attrs = CFArray::from_objects(&refs);

    let values = unsafe {
      let mut values_ptr: *const CFArray<CFType> = std::ptr::null();
      let untyped: &CFArray = &*(CFRetained::as_ptr(&attrs).as_ptr() as *const CFArray);
      let result = self.inner.copy_multiple_attribute_values(
        untyped,
        AXCopyMultipleAttributeOptions::empty(),
        NonNull::new((&raw mut values_ptr).cast::<*const CFArray>()).expect("values ptr"),
      );
      if result != AXError::Success || values_ptr.is_null() {
        return RawElementAttributes::default();
      }
      CFRetained::<CFArray<CFType>>::from_raw(NonNull::new_unchecked(values_ptr.cast_mut()))
    };

    let len = values.len();
    let get_val = |idx: usize| -> Option<CFRetained<CFType>> {
      if idx >= len {
        return None;
      }
      let retained = values.get(idx)?;
      if let Some(null_ref) = unsafe { kCFNull } {
        let null_ptr: *const CFType = (null_ref as *const objc2_core_foundation::CFNull).cast();
        if std::ptr::eq(CFRetained::as_ptr(&retained).as_ptr(), null_ptr) {
          return None;
        }
      }
      Some(retained)
    };
    let parse_str = |v: &CFType| -> Option<String> {
      let s = v.downcast_ref::<CFString>()?.to_string();
      (!s.is_empty()).then_some(s)
    };
    let parse_bool =
      |v: &CFType| -> Option<bool> { v.downcast_ref::<CFBoolean>().map(objc2_core_foundation::CFBoolean::as_bool) };

    let role = get_val(0).and_then(|v| parse_str(&v)).unwrap_or_else(|| "AXUnknown".into());
    let subrole = get_val(1).and_then(|v| parse_str(&v));
    let title = get_val(2).and_then(|v| parse_str(&v));
    let value = get_val(3).and_then(|v| Self::extract_value(&v, &role));
    let description = get_val(4).and_then(|v| parse_str(&v));
    let help = get_val(5).and_then(|v| parse_str(&v));
    let placeholder = get_val(6).and_then(|v| parse_str(&v));
    let label = get_val(7).and_then(|v| parse_str(&v));
    let identifier = get_val(8).and_then(|v| parse_str(&v));
    let role_description = get_val(9).and_then(|v| parse_str(&v));
    let frame = Self::parse_frame(get_val(10).as_deref(), get_val(11).as_deref());
    let focused = get_val(12).and_then(|v| parse_bool(&v)).unwrap_or(false);
    let enabled = get_val(13).and_then(|v| parse_bool(&v)).unwrap_or(true);
    let hidden = get_val(14).and_then(|v| parse_bool(&v)).unwrap_or(false);
    let selected = get_val(15).and_then(|v| parse_bool(&v)).unwrap_or(false);
    let expanded = get_val(16).and_then(|v| parse_bool(&v));
    let required = get_val(17).and_then(|v| parse_bool(&v));
    let actions = self.get_actions();

    RawElementAttributes {
      role,
      subrole,
      title,
      description,
      help,
      value,
      value_description: None,
      placeholder,
      label,
      identifier,
      role_description,
      frame,
      enabled,
      visible: !hidden,
      focused,
      selected,
      expanded,
      required,
      actions,
    }
  }

  fn extract_value(cf_value: &CFType, role: &str) -> Option<Value> {
    if let Some(s) = cf_value.downcast_ref::<CFString>() {
      let s = s.to_string();
      if role == "AXColorWell" {
        if let Some(color) = Self::parse_color_string(&s) {
          return Some(Value::Color(color));
        }
      }
      return Some(Value::String(s));
    }
    if let Some(n) = cf_value.downcast_ref::<CFNumber>() {
      if matches!(role, "AXCheckBox" | "AXRadioButton") || role.contains("Toggle") {
        if let Some(i) = n.as_i64() {
          return Some(Value::Boolean(i != 0));
        }
      }
      return n.as_f64().map(Value::Number);
    }
    cf_value.downcast_ref::<CFBoolean>().map(|b| Value::Boolean(b.as_bool()))
  }

  /// Parses the `"rgb R G B A"` string format AXColorWell reports (space-separated 0.0-1.0 floats).
  fn parse_color_string(s: &str) -> Option<Color> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() >= 5 && parts[0] == "rgb" {
      return Some(Color::new(
        parts[1].parse().ok()?,
        parts[2].parse().ok()?,
        parts[3].parse().ok()?,
        parts[4].parse().ok()?,
      ));
    }
    None
  }

  fn parse_frame(position: Option<&CFType>, size: Option<&CFType>) -> Option<Frame> {
    let pos = position?.downcast_ref::<AXValueRef>()?;
    let sz = size?.downcast_ref::<AXValueRef>()?;
    unsafe {
      if pos.r#type() != AXValueType::CGPoint || sz.r#type() != AXValueType::CGSize {
        return None;
      }
      let mut point = CGPoint { x: 0.0, y: 0.0 };
      let mut size_val = CGSize { width: 0.0, height: 0.0 };
      if !pos.value(AXValueType::CGPoint, NonNull::new((&raw mut point).cast::<c_void>())?) {
        return None;
      }
      if !sz.value(AXValueType::CGSize, NonNull::new((&raw mut size_val).cast::<c_void>())?) {
        return None;
      }
      Some(Frame::new(point.x, point.y, size_val.width, size_val.height))
    }
  }
}

impl Hash for ElementHandle {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.cached_hash.hash(state);
  }
}

impl PartialEq for ElementHandle {
  fn eq(&self, other: &Self) -> bool {
    self.cached_hash == other.cached_hash && self.cf_equal(other)
  }
}

impl Eq for ElementHandle {}

unsafe impl Send for ElementHandle {}
unsafe impl Sync for ElementHandle {}
