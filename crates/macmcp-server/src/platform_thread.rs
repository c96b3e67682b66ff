/*!
The one dedicated thread every accessibility/input/screen/clipboard/application call in
the process is marshalled onto (spec §5: "all C1 invocations are marshalled onto that
thread"). Grounded on the teacher's observation-thread idiom — a `thread::spawn` loop,
an `Arc<AtomicBool>` stop signal, and a `Drop` impl that joins — adapted here from a
periodic polling sweep to an on-demand job queue, since this thread serves one-shot
platform calls rather than a recurring scan.
*/

use log::{error, warn};
use macmcp_core::error::McpError;
use macmcp_core::platform::macos::MacPlatform;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

type Job = Box<dyn FnOnce(&MacPlatform) + Send + 'static>;

/// How often the platform loop wakes to check the stop signal when idle.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Owns the platform thread and the channel used to hand it work.
pub struct PlatformThread {
  jobs: Sender<Job>,
  stop: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl PlatformThread {
  /// Spawns the platform thread. There is exactly one of these per process.
  #[must_use]
  pub fn spawn() -> Self {
    let (tx, rx) = mpsc::channel::<Job>();
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let handle = thread::Builder::new()
      .name("macmcp-platform".into())
      .spawn(move || platform_loop(&rx, &thread_stop))
      .expect("failed to spawn the macmcp platform thread");
    Self { jobs: tx, stop, handle: Some(handle) }
  }

  /// Runs `f` with the live [`MacPlatform`] on the platform thread and blocks the
  /// caller up to `deadline`. On timeout, returns [`McpError::PlatformTimeout`] and
  /// abandons the call; `f` still runs to completion on the platform thread, but its
  /// result has nowhere left to go and is dropped (spec §5 "partial snapshots
  /// captured so far are discarded").
  pub fn call<F, T>(&self, deadline: Duration, f: F) -> Result<T, McpError>
  where
    F: FnOnce(&MacPlatform) -> Result<T, McpError> + Send + 'static,
    T: Send + 'static,
  {
    let (reply_tx, reply_rx) = mpsc::channel::<Result<T, McpError>>();
    let job: Job = Box::new(move |platform| {
      let _ = reply_tx.send(f(platform));
    });
    self
      .jobs
      .send(job)
      .map_err(|_| McpError::InternalError("platform thread is gone".into()))?;

    match reply_rx.recv_timeout(deadline) {
      Ok(result) => result,
      Err(RecvTimeoutError::Timeout) => {
        warn!("platform call exceeded its {}ms deadline", deadline.as_millis());
        Err(McpError::PlatformTimeout { millis: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX) })
      }
      Err(RecvTimeoutError::Disconnected) => {
        Err(McpError::InternalError("platform thread dropped the reply channel".into()))
      }
    }
  }
}

fn platform_loop(jobs: &Receiver<Job>, stop: &AtomicBool) {
  let platform = MacPlatform::default();
  while !stop.load(Ordering::Relaxed) {
    match jobs.recv_timeout(IDLE_POLL) {
      Ok(job) => job(&platform),
      Err(RecvTimeoutError::Timeout) => {}
      Err(RecvTimeoutError::Disconnected) => break,
    }
  }
}

impl Drop for PlatformThread {
  fn drop(&mut self) {
    self.stop.store(true, Ordering::Relaxed);
    if let Some(handle) = self.handle.take() {
      if let Err(panic) = handle.join() {
        error!("platform thread panicked while shutting down: {panic:?}");
      }
    }
  }
}

impl fmt::Debug for PlatformThread {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PlatformThread").finish_non_exhaustive()
  }
}
