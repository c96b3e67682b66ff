/*! [`AccessibilityProvider`] for macOS, backed by the Accessibility API (C1, spec §6.1). */

use super::handles::ElementHandle;
use crate::error::AxError;
use crate::platform::{AccessibilityProvider, RawAttributes};
use crate::types::{Frame, ProcessId, Value};
use objc2_application_services::{AXError as NativeAxError, AXIsProcessTrusted};
use std::collections::BTreeMap;

/// True once the user has granted this process accessibility permission in
/// System Settings. `applications`/`root_for_pid` fail with [`AxError::PermissionDenied`]
/// while this is false; macMCP never attempts to prompt on the caller's behalf.
#[must_use]
pub fn has_permissions() -> bool {
  unsafe { AXIsProcessTrusted() }
}

impl From<NativeAxError> for AxError {
  fn from(err: NativeAxError) -> Self {
    match err {
      NativeAxError::AttributeUnsupported | NativeAxError::ActionUnsupported => Self::AttributeUnsupported,
      NativeAxError::NoValue => Self::NoValue,
      NativeAxError::CannotComplete => Self::CannotComplete,
      NativeAxError::APIDisabled => Self::PermissionDenied,
      _ => Self::CannotComplete,
    }
  }
}

/// The live, [`objc2`]-backed accessibility tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacAccessibility;

impl AccessibilityProvider for MacAccessibility {
  type Node = ElementHandle;

  fn applications(&self) -> Result<Vec<(ProcessId, Self::Node)>, AxError> {
    if !has_permissions() {
      return Err(AxError::PermissionDenied);
    }
    Ok(
      super::app::running_applications()
        .into_iter()
        .map(|(pid, _)| (pid, ElementHandle::for_application(pid.0 as i32)))
        .collect(),
    )
  }

  fn root_for_pid(&self, pid: ProcessId) -> Result<Self::Node, AxError> {
    if !has_permissions() {
      return Err(AxError::PermissionDenied);
    }
    Ok(ElementHandle::for_application(pid.0 as i32))
  }

  fn focused(&self) -> Result<Option<Self::Node>, AxError> {
    if !has_permissions() {
      return Err(AxError::PermissionDenied);
    }
    let Some(pid) = super::app::frontmost_pid() else {
      return Ok(None);
    };
    let app = ElementHandle::for_application(pid.0 as i32);
    Ok(app.get_element("AXFocusedUIElement"))
  }

  fn attributes(&self, node: &Self::Node) -> Result<RawAttributes, AxError> {
    let raw = node.fetch_attributes();
    Ok(RawAttributes {
      role: raw.role,
      subrole: raw.subrole,
      title: raw.title,
      description: raw.description,
      help: raw.help,
      value: raw.value,
      value_description: raw.value_description,
      placeholder: raw.placeholder,
      label: raw.label,
      identifier: raw.identifier,
      role_description: raw.role_description,
      frame: raw.frame,
      enabled: raw.enabled,
      visible: raw.visible,
      focused: raw.focused,
      selected: raw.selected,
      expanded: raw.expanded,
      required: raw.required,
      actions: raw.actions,
      attributes: BTreeMap::new(),
    })
  }

  fn children(&self, node: &Self::Node) -> Result<Vec<Self::Node>, AxError> {
    Ok(node.get_children())
  }

  fn perform_action(&self, node: &Self::Node, action: &str) -> Result<(), AxError> {
    node.perform_action(action).map_err(AxError::from)
  }

  fn set_value(&self, node: &Self::Node, value: &Value) -> Result<(), AxError> {
    node.set_value(value).map_err(AxError::from)
  }

  fn set_frame(&self, node: &Self::Node, frame: Frame) -> Result<(), AxError> {
    node.set_frame(&frame).map_err(AxError::from)
  }

  fn set_minimized(&self, node: &Self::Node, minimized: bool) -> Result<(), AxError> {
    node.set_minimized(minimized).map_err(AxError::from)
  }
}

/// Resolves the element at a screen point within one application's tree, used by
/// `interact_ui`'s coordinate-based fallback (spec §4.8).
#[must_use]
pub fn element_at(root: &ElementHandle, x: f64, y: f64) -> Option<ElementHandle> {
  root.element_at_position(x, y)
}

/// The selected-text snippet and range for a resolved element, when it has one
/// (spec §4.8 `explore_ui` selection reporting).
#[must_use]
pub fn selected_text(node: &ElementHandle) -> Option<String> {
  node.get_selected_text()
}
