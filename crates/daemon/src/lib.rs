//! hyprdock daemon internals.
//!
//! The binary in `main.rs` wires these pieces to real sockets, stdin/stdout
//! and process signals. Everything here is usable without a running
//! compositor, which is what the control tool and the tests rely on.

pub mod config;
pub mod listener;
pub mod state;
pub mod surface;

use surface::SurfaceEvent;

/// Capacity of the daemon's main event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// Work items drained by the main loop, in arrival order.
#[derive(Debug)]
pub enum DaemonEvent {
    /// Re-query Hyprland. Non-forced refreshes rebuild only when the
    /// visible windows (address, class, workspace) changed.
    Refresh { force: bool },
    /// A line from the surface, stamped with its arrival time in ms.
    Surface { event: SurfaceEvent, at_ms: i64 },
    /// The surface closed its input.
    SurfaceClosed,
    /// The hide timer with this id elapsed.
    HideTimerFired(u64),
    /// Unrecoverable failure in a background task.
    Fatal(anyhow::Error),
}
