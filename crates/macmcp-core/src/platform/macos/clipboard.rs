/*! [`ClipboardProvider`] for macOS, backed by `NSPasteboard` (spec §4.8 `clipboard_management`). */

use crate::error::AxError;
use crate::platform::ClipboardProvider;
use objc2_app_kit::{NSPasteboard, NSPasteboardTypeString};
use objc2_foundation::NSString;

/// The live, `NSPasteboard.general`-backed clipboard provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacClipboard;

impl ClipboardProvider for MacClipboard {
  fn read_text(&self) -> Result<Option<String>, AxError> {
    let pasteboard = unsafe { NSPasteboard::generalPasteboard() };
    let text = unsafe { pasteboard.stringForType(NSPasteboardTypeString) };
    Ok(text.map(|s| s.to_string()))
  }

  fn write_text(&self, text: &str) -> Result<(), AxError> {
    let pasteboard = unsafe { NSPasteboard::generalPasteboard() };
    unsafe { pasteboard.clearContents() };
    let written = unsafe { pasteboard.setString_forType(&NSString::from_str(text), NSPasteboardTypeString) };
    written.then_some(()).ok_or(AxError::CannotComplete)
  }

  fn clear(&self) -> Result<(), AxError> {
    let pasteboard = unsafe { NSPasteboard::generalPasteboard() };
    unsafe { pasteboard.clearContents() };
    Ok(())
  }
}
