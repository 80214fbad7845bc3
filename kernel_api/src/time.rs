//! Time abstractions
//!
//! The kernel never reads the wall clock directly. Stream flush windows and
//! the pauses of the abort drain go through a [`Clock`], so tests can drive
//! time by hand with [`ManualClock`].

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// A reading of a [`Clock`]
///
/// Counts nanoseconds from the reading clock's epoch, so only instants
/// from the same clock compare meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instant(u64);

impl Instant {
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`; zero if `earlier` is later
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

/// A span of time in nanoseconds
///
/// Serializes as a plain nanosecond count, which keeps kernel
/// configuration readable as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(u64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000_000_000)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Duration::from_nanos(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }
}

impl From<Duration> for std::time::Duration {
    fn from(value: Duration) -> Self {
        std::time::Duration::from_nanos(value.as_nanos())
    }
}

/// Source of time for the kernel
pub trait Clock {
    /// Returns the current instant
    fn now(&self) -> Instant;

    /// Pauses the caller for `duration`
    fn sleep(&self, duration: Duration);
}

/// Monotonic clock backed by the operating system
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: std::time::Instant,
}

impl SystemClock {
    /// Creates a clock whose epoch is now
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::from_nanos(Duration::from(self.epoch.elapsed()).as_nanos())
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration.into());
    }
}

/// Hand-driven clock for deterministic tests
///
/// Clones share the same time. `sleep` advances time instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Creates a clock at instant zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward
    pub fn advance(&self, duration: Duration) {
        self.nanos.set(self.nanos.get().saturating_add(duration.as_nanos()));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_nanos(self.nanos.get())
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
