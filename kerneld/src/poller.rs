//! Parent process watcher
//!
//! A kernel started by a frontend should not outlive it. The watcher
//! samples a liveness probe on a background thread and runs an exit action
//! the first time the probe reports the parent gone.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the parent is checked
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

type Probe = Box<dyn Fn() -> bool + Send>;

/// Watches a parent process
pub struct ParentPoller {
    interval: Duration,
    probe: Probe,
}

impl ParentPoller {
    /// Watches the process with id `parent`
    ///
    /// On Unix a process whose parent exits is re-parented, so the parent
    /// counts as gone once the current parent id differs from `parent`.
    pub fn new(parent: u32) -> Self {
        Self::with_probe(move || parent_alive(parent))
    }

    /// Watches whatever `probe` reports; `false` means gone
    pub fn with_probe(probe: impl Fn() -> bool + Send + 'static) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            probe: Box::new(probe),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts polling; `on_exit` runs once when the parent is gone
    pub fn start(self, on_exit: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("parent-poller".to_string())
            .spawn(move || {
                while (self.probe)() {
                    thread::sleep(self.interval);
                }
                tracing::info!("parent process is gone, exiting");
                on_exit();
            })
    }
}

impl std::fmt::Debug for ParentPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentPoller")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn parent_alive(parent: u32) -> bool {
    std::os::unix::process::parent_id() == parent
}

#[cfg(not(unix))]
fn parent_alive(_parent: u32) -> bool {
    true
}
