/*! [`ApplicationProvider`] for macOS, backed by `NSWorkspace`/`NSRunningApplication` (spec §4.8 `application_management`). */

#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use crate::error::AxError;
use crate::platform::ApplicationProvider;
use crate::types::ProcessId;
use objc2::rc::Retained;
use objc2_app_kit::{NSRunningApplication, NSWorkspace, NSWorkspaceLaunchConfiguration};
use objc2_foundation::NSString;

/// Bundle IDs filtered out of `running_applications`: system chrome with no
/// meaningful UI surface to automate (mirrors the platform's own window-list
/// filtering for the same set of processes).
const FILTERED_BUNDLE_IDS: &[&str] =
  &["com.apple.dock", "com.apple.screencaptureui", "com.apple.screenshot.launcher"];

fn running_application(pid: i32) -> Option<Retained<NSRunningApplication>> {
  unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(pid) }
}

/// Every running application with an accessible UI presence.
#[must_use]
pub(super) fn running_applications() -> Vec<(ProcessId, String)> {
  let workspace = unsafe { NSWorkspace::sharedWorkspace() };
  let apps = unsafe { workspace.runningApplications() };
  apps
    .iter()
    .filter_map(|app| {
      let pid = unsafe { app.processIdentifier() };
      if pid <= 0 {
        return None;
      }
      let bundle_id = unsafe { app.bundleIdentifier() }.map(|s| s.to_string());
      if bundle_id.as_deref().is_some_and(|b| FILTERED_BUNDLE_IDS.contains(&b)) {
        return None;
      }
      let name = unsafe { app.localizedName() }.map_or_else(|| bundle_id.unwrap_or_default(), |s| s.to_string());
      Some((ProcessId(pid as u32), name))
    })
    .collect()
}

/// The frontmost application's pid, if any app is currently active.
#[must_use]
pub(super) fn frontmost_pid() -> Option<ProcessId> {
  let workspace = unsafe { NSWorkspace::sharedWorkspace() };
  let app = unsafe { workspace.frontmostApplication() }?;
  let pid = unsafe { app.processIdentifier() };
  (pid > 0).then_some(ProcessId(pid as u32))
}

/// The live, `NSWorkspace`-backed application lifecycle provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacApplications;

impl ApplicationProvider for MacApplications {
  fn launch(&self, bundle_id: &str) -> Result<ProcessId, AxError> {
    let workspace = unsafe { NSWorkspace::sharedWorkspace() };
    let url = unsafe {
      workspace.URLForApplicationWithBundleIdentifier(&NSString::from_str(bundle_id))
    }
    .ok_or(AxError::CannotComplete)?;
    let config = unsafe { NSWorkspaceLaunchConfiguration::new() };
    let app = unsafe { workspace.launchApplicationAtURL_options_configuration_error(&url, Default::default(), &config) }
      .map_err(|_| AxError::CannotComplete)?;
    let pid = unsafe { app.processIdentifier() };
    if pid <= 0 {
      return Err(AxError::CannotComplete);
    }
    Ok(ProcessId(pid as u32))
  }

  fn terminate(&self, pid: ProcessId) -> Result<(), AxError> {
    let app = running_application(pid.0 as i32).ok_or(AxError::CannotComplete)?;
    let terminated = unsafe { app.terminate() };
    terminated.then_some(()).ok_or(AxError::CannotComplete)
  }

  fn activate(&self, pid: ProcessId) -> Result<(), AxError> {
    let app = running_application(pid.0 as i32).ok_or(AxError::CannotComplete)?;
    let activated = unsafe { app.activateWithOptions(Default::default()) };
    activated.then_some(()).ok_or(AxError::CannotComplete)
  }

  fn hide(&self, pid: ProcessId) -> Result<(), AxError> {
    let app = running_application(pid.0 as i32).ok_or(AxError::CannotComplete)?;
    let hidden = unsafe { app.hide() };
    hidden.then_some(()).ok_or(AxError::CannotComplete)
  }

  fn running_applications(&self) -> Result<Vec<(ProcessId, String)>, AxError> {
    Ok(running_applications())
  }

  fn find_by_name(&self, hint: &str) -> Result<Option<ProcessId>, AxError> {
    let hint = hint.to_lowercase();
    Ok(
      running_applications()
        .into_iter()
        .find(|(_, name)| name.to_lowercase().contains(&hint))
        .map(|(pid, _)| pid),
    )
  }

  fn force_terminate(&self, pid: ProcessId) -> Result<(), AxError> {
    let app = running_application(pid.0 as i32).ok_or(AxError::CannotComplete)?;
    let terminated = unsafe { app.forceTerminate() };
    terminated.then_some(()).ok_or(AxError::CannotComplete)
  }

  fn find_by_bundle_id(&self, bundle_id: &str) -> Result<Option<ProcessId>, AxError> {
    let apps = unsafe {
      NSRunningApplication::runningApplicationsWithBundleIdentifier(&NSString::from_str(bundle_id))
    };
    Ok(apps.iter().find_map(|app| {
      let pid = unsafe { app.processIdentifier() };
      (pid > 0).then_some(ProcessId(pid as u32))
    }))
  }

  fn frontmost(&self) -> Result<Option<ProcessId>, AxError> {
    Ok(frontmost_pid())
  }
}
