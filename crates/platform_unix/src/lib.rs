//! hyprdock Platform Unix
//!
//! Unix-specific process plumbing for the dock.
//!
//! This crate handles:
//! - Mapping the dock's logical signals to OS signal numbers
//! - Listening for those signals and forwarding them over a channel
//! - The per-user single-instance lock file
//! - Delivering signals to an already running instance

pub mod lock;
pub mod signals;

pub use lock::{default_lock_path, is_alive, read_owner_pid, InstanceLock, LockOutcome};
pub use signals::{send_signal, spawn_signal_listener, DockSignal, SIGNAL_QUEUE_CAPACITY};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Failed to install handler for {name}: {source}")]
    SignalInstall {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("Failed to send {signal:?} to process {pid}: {source}")]
    SignalSend {
        signal: DockSignal,
        pid: i32,
        source: std::io::Error,
    },

    #[error("Lock file {path} error: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
}
