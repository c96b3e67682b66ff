/*! [`ScreenProvider`] for macOS, backed by `CGWindowListCreateImage`/`NSBitmapImageRep` (spec §4.8 `screenshot`). */

#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::ref_as_ptr)]

use crate::error::AxError;
use crate::platform::ScreenProvider;
use crate::types::{Frame, ProcessId};
use objc2_app_kit::{NSBitmapImageFileType, NSBitmapImageRep};
use objc2_core_foundation::{CFArray, CFDictionary, CFNumber, CFNumberType, CFRetained, CFString, CGRect};
use objc2_core_graphics::{
  kCGNullWindowID, CGRectMakeWithDictionaryRepresentation, CGWindowImageOption,
  CGWindowListCopyWindowInfo, CGWindowListCreateImage, CGWindowListOption,
};
use std::ffi::c_void;

/// One entry from `CGWindowListCopyWindowInfo`, enough to match by owner pid and title
/// and to identify the window number `CGWindowListCreateImage` wants.
struct WindowInfo {
  window_id: u32,
  pid: u32,
  title: Option<String>,
  bounds: CGRect,
}

fn dict_value<T>(dict: &CFDictionary, key: &str) -> Option<*const T> {
  let key = CFString::from_str(key);
  let key_ref = key.as_ref() as *const CFString;
  unsafe { CFDictionary::contains_ptr_key(dict, key_ref.cast()) }
    .then(|| unsafe { CFDictionary::value(dict, key_ref.cast()) }.cast::<T>())
}

fn dict_u32(dict: &CFDictionary, key: &str) -> Option<u32> {
  let number = dict_value::<CFNumber>(dict, key)?;
  let mut value: i32 = 0;
  unsafe { CFNumber::value(&*number, CFNumberType::IntType, (&raw mut value).cast::<c_void>()) };
  Some(value as u32)
}

fn dict_string(dict: &CFDictionary, key: &str) -> Option<String> {
  let s = dict_value::<CFString>(dict, key)?;
  if s.is_null() {
    return None;
  }
  Some(unsafe { (*s).to_string() })
}

fn dict_bounds(dict: &CFDictionary) -> Option<CGRect> {
  let rect_dict = dict_value::<CFDictionary>(dict, "kCGWindowBounds")?;
  if rect_dict.is_null() {
    return None;
  }
  let mut rect = CGRect::default();
  unsafe {
    CGRectMakeWithDictionaryRepresentation(Some(&*rect_dict), &raw mut rect).then_some(rect)
  }
}

fn retain_dict(ptr: *const CFDictionary) -> Option<CFRetained<CFDictionary>> {
  if ptr.is_null() {
    None
  } else {
    Some(unsafe { CFRetained::retain(std::ptr::NonNull::from(&*ptr)) })
  }
}

/// Enumerates on-screen windows in front-to-back z-order.
fn enumerate_windows() -> Vec<WindowInfo> {
  objc2::rc::autoreleasepool(|_| {
    let option = CGWindowListOption::OptionOnScreenOnly | CGWindowListOption::ExcludeDesktopElements;
    let Some(info) = CGWindowListCopyWindowInfo(option, kCGNullWindowID) else {
      return Vec::new();
    };
    let count = CFArray::count(&info);
    (0..count)
      .filter_map(|i| {
        let dict_ref = unsafe { CFArray::value_at_index(&info, i) }.cast::<CFDictionary>();
        let dict = retain_dict(dict_ref)?;
        let window_id = dict_u32(&dict, "kCGWindowNumber")?;
        let pid = dict_u32(&dict, "kCGWindowOwnerPID")?;
        let title = dict_string(&dict, "kCGWindowName");
        let bounds = dict_bounds(&dict)?;
        Some(WindowInfo { window_id, pid, title, bounds })
      })
      .collect()
  })
}

fn png_bytes(image: &objc2_core_graphics::CGImage) -> Option<Vec<u8>> {
  let rep = unsafe { NSBitmapImageRep::initWithCGImage(NSBitmapImageRep::alloc(), image) };
  let data = unsafe { rep.representationUsingType_properties(NSBitmapImageFileType::PNG, &objc2_foundation::NSDictionary::new()) }?;
  Some(data.to_vec())
}

/// The live, `CGWindowListCreateImage`-backed screen/window capture provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacScreen;

impl ScreenProvider for MacScreen {
  fn capture_window(&self, pid: ProcessId, window_title: Option<&str>) -> Result<Vec<u8>, AxError> {
    let windows = enumerate_windows();
    let candidates: Vec<&WindowInfo> = windows.iter().filter(|w| w.pid == pid.0).collect();
    let target = match window_title {
      Some(title) => candidates
        .iter()
        .find(|w| w.title.as_deref().is_some_and(|t| t.to_lowercase().contains(&title.to_lowercase())))
        .or_else(|| candidates.first())
        .copied(),
      None => candidates.first().copied(),
    }
    .ok_or(AxError::CannotComplete)?;

    let image = CGWindowListCreateImage(
      target.bounds,
      CGWindowListOption::OptionIncludingWindow,
      target.window_id,
      CGWindowImageOption::BestResolution,
    )
    .ok_or(AxError::CannotComplete)?;
    png_bytes(&image).ok_or(AxError::CannotComplete)
  }

  fn capture_screen(&self) -> Result<Vec<u8>, AxError> {
    let display = unsafe { objc2_core_graphics::CGMainDisplayID() };
    let rect = unsafe { objc2_core_graphics::CGDisplayBounds(display) };
    let image = CGWindowListCreateImage(
      rect,
      CGWindowListOption::OptionOnScreenOnly,
      kCGNullWindowID,
      CGWindowImageOption::BestResolution,
    )
    .ok_or(AxError::CannotComplete)?;
    png_bytes(&image).ok_or(AxError::CannotComplete)
  }

  fn capture_rect(&self, rect: Frame) -> Result<Vec<u8>, AxError> {
    let cg_rect = CGRect {
      origin: objc2_core_foundation::CGPoint { x: rect.x, y: rect.y },
      size: objc2_core_foundation::CGSize { width: rect.w, height: rect.h },
    };
    let image = CGWindowListCreateImage(
      cg_rect,
      CGWindowListOption::OptionOnScreenOnly,
      kCGNullWindowID,
      CGWindowImageOption::BestResolution,
    )
    .ok_or(AxError::CannotComplete)?;
    png_bytes(&image).ok_or(AxError::CannotComplete)
  }
}
