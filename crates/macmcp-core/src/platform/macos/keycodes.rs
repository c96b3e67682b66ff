/*! Key-name to `CGKeyCode`/`CGEventFlags` mapping for [`super::input`] (spec §4.8 `keyboard`). */

use objc2_core_graphics::CGEventFlags;

/// Maps a [`crate::platform::KeyStroke`] key name to the ANSI `CGKeyCode` it names on a
/// US keyboard layout. Named keys cover the set `keyboard`'s tool contract documents;
/// single characters fall back to their US-layout position.
#[must_use]
pub(super) fn code_for(key: &str) -> Option<u16> {
  let named = match key.to_lowercase().as_str() {
    "return" | "enter" => 36,
    "tab" => 48,
    "space" => 49,
    "delete" | "backspace" => 51,
    "escape" | "esc" => 53,
    "command" | "cmd" => 55,
    "shift" => 56,
    "capslock" => 57,
    "option" | "alt" => 58,
    "control" | "ctrl" => 59,
    "rightshift" => 60,
    "rightoption" => 61,
    "rightcontrol" => 62,
    "function" | "fn" => 63,
    "f1" => 122,
    "f2" => 120,
    "f3" => 99,
    "f4" => 118,
    "f5" => 96,
    "f6" => 97,
    "f7" => 98,
    "f8" => 100,
    "f9" => 101,
    "f10" => 109,
    "f11" => 103,
    "f12" => 111,
    "left" | "leftarrow" => 123,
    "right" | "rightarrow" => 124,
    "down" | "downarrow" => 125,
    "up" | "uparrow" => 126,
    "home" => 115,
    "end" => 119,
    "pageup" => 116,
    "pagedown" => 121,
    "forwarddelete" => 117,
    _ => return char_code(key),
  };
  Some(named)
}

/// US-layout ANSI key codes for the printable characters `keyboard` is likely to
/// be asked for directly (letters, digits, common punctuation).
fn char_code(key: &str) -> Option<u16> {
  let mut chars = key.chars();
  let ch = chars.next()?;
  if chars.next().is_some() {
    return None;
  }
  let code = match ch.to_ascii_lowercase() {
    'a' => 0,
    's' => 1,
    'd' => 2,
    'f' => 3,
    'h' => 4,
    'g' => 5,
    'z' => 6,
    'x' => 7,
    'c' => 8,
    'v' => 9,
    'b' => 11,
    'q' => 12,
    'w' => 13,
    'e' => 14,
    'r' => 15,
    'y' => 16,
    't' => 17,
    '1' => 18,
    '2' => 19,
    '3' => 20,
    '4' => 21,
    '6' => 22,
    '5' => 23,
    '=' => 24,
    '9' => 25,
    '7' => 26,
    '-' => 27,
    '8' => 28,
    '0' => 29,
    ']' => 30,
    'o' => 31,
    'u' => 32,
    '[' => 33,
    'i' => 34,
    'p' => 35,
    'l' => 37,
    'j' => 38,
    '\'' => 39,
    'k' => 40,
    ';' => 41,
    '\\' => 42,
    ',' => 43,
    '/' => 44,
    'n' => 45,
    'm' => 46,
    '.' => 47,
    '`' => 50,
    _ => return None,
  };
  Some(code)
}

/// Folds a `KeyStroke`'s modifier name list into the `CGEventFlags` bitmask.
#[must_use]
pub(super) fn flags_for(modifiers: &[String]) -> CGEventFlags {
  let mut flags = CGEventFlags::empty();
  for m in modifiers {
    flags |= match m.to_lowercase().as_str() {
      "command" | "cmd" => CGEventFlags::MaskCommand,
      "shift" => CGEventFlags::MaskShift,
      "option" | "alt" => CGEventFlags::MaskAlternate,
      "control" | "ctrl" => CGEventFlags::MaskControl,
      _ => continue,
    };
  }
  flags
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn named_key_resolves() {
    assert_eq!(code_for("return"), Some(36));
    assert_eq!(code_for("Return"), Some(36));
  }

  #[test]
  fn single_character_resolves() {
    assert_eq!(code_for("a"), Some(0));
    assert_eq!(code_for("A"), Some(0));
  }

  #[test]
  fn unknown_key_is_none() {
    assert_eq!(code_for("thisisnotakey"), None);
  }

  #[test]
  fn modifier_flags_combine() {
    let flags = flags_for(&["command".into(), "shift".into()]);
    assert!(flags.contains(CGEventFlags::MaskCommand));
    assert!(flags.contains(CGEventFlags::MaskShift));
    assert!(!flags.contains(CGEventFlags::MaskAlternate));
  }
}
