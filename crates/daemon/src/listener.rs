//! Hyprland event listener.
//!
//! Turns the compositor's event stream into refresh triggers for the main
//! loop. Focus changes force a rebuild; window open/close/move only rebuild
//! when the set of visible windows changed.

use crate::DaemonEvent;
use hyprdock_ipc::{EventStream, HyprEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Remembers the last focused address so repeated focus events are dropped.
#[derive(Debug, Default)]
pub struct FocusTracker {
    last_address: Option<String>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_address(&self) -> Option<&str> {
        self.last_address.as_deref()
    }

    /// Decide what an event triggers. `Some(force)` requests a refresh.
    pub fn observe(&mut self, event: &HyprEvent) -> Option<bool> {
        match event {
            HyprEvent::ActiveWindow { address } => {
                if *address == self.last_address {
                    return None;
                }
                self.last_address = address.clone();
                Some(true)
            }
            HyprEvent::OpenWindow { .. }
            | HyprEvent::CloseWindow { .. }
            | HyprEvent::MoveWindow { .. } => Some(false),
            HyprEvent::Other { .. } => None,
        }
    }
}

/// Forward refresh triggers from the event stream until it fails.
///
/// Any stream failure, including the compositor closing the socket, is
/// reported as [`DaemonEvent::Fatal`]. There is no reconnect.
pub fn spawn_event_listener(
    mut events: EventStream,
    tx: mpsc::Sender<DaemonEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tracker = FocusTracker::new();
        loop {
            match events.next_event().await {
                Ok(event) => {
                    let Some(force) = tracker.observe(&event) else {
                        continue;
                    };
                    debug!("{:?} -> refresh (force: {})", event, force);
                    if tx.send(DaemonEvent::Refresh { force }).await.is_err() {
                        break; // Daemon shutting down
                    }
                }
                Err(e) => {
                    error!("Hyprland event stream failed: {}", e);
                    let _ = tx
                        .send(DaemonEvent::Fatal(anyhow::anyhow!(
                            "Hyprland event stream failed: {}",
                            e
                        )))
                        .await;
                    break;
                }
            }
        }
    })
}
