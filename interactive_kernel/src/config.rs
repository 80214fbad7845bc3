//! Kernel configuration

use kernel_api::Duration;
use serde::{Deserialize, Serialize};

/// Default window after which buffered output is pushed out
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Default pause between polls while draining the abort queue
pub const DEFAULT_ABORT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default delay between the shutdown reply and leaving the loop
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Tunables for a [`Kernel`](crate::Kernel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// A write landing later than this after the first unflushed write
    /// flushes the stream
    pub flush_interval: Duration,
    /// Pause after each aborted request
    pub abort_poll_interval: Duration,
    /// Delay before the loop ends after a shutdown request
    pub shutdown_grace: Duration,
}

impl KernelConfig {
    /// Creates the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_abort_poll_interval(mut self, interval: Duration) -> Self {
        self.abort_poll_interval = interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            abort_poll_interval: DEFAULT_ABORT_POLL_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.flush_interval.as_millis(), 50);
        assert_eq!(config.abort_poll_interval.as_millis(), 100);
        assert_eq!(config.shutdown_grace.as_millis(), 100);
    }

    #[test]
    fn test_builders() {
        let config = KernelConfig::new()
            .with_flush_interval(Duration::from_millis(5))
            .with_abort_poll_interval(Duration::ZERO)
            .with_shutdown_grace(Duration::from_secs(1));
        assert_eq!(config.flush_interval.as_millis(), 5);
        assert_eq!(config.abort_poll_interval.as_nanos(), 0);
        assert_eq!(config.shutdown_grace.as_secs(), 1);
    }
}
