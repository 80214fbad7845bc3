//! Daemon and launcher errors

use kernel_api::{KernelError, TransportError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the kernel daemon
#[derive(Debug, Error)]
pub enum KerneldError {
    #[error("{0}")]
    Usage(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Heartbeat error: {0}")]
    Heartbeat(#[source] io::Error),

    #[error("Failed to write connection file {path}: {source}")]
    ConnectionFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid connection file {path}: {source}")]
    InvalidConnectionFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Parent watcher failed: {0}")]
    Poller(#[source] io::Error),
}

/// Errors raised while starting a kernel process
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Could not reserve a free port: {0}")]
    NoFreePort(#[source] io::Error),

    #[error("Failed to spawn {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
}
