//! hyprdock IPC Protocol
//!
//! Types and sockets for talking to Hyprland:
//! - the query socket (`.socket.sock`): one request, one JSON response
//! - the event socket (`.socket2.sock`): an endless stream of `name>>payload` lines

pub mod client;
pub mod events;

pub use client::{EventStream, HyprlandClient, Snapshot};
pub use events::{parse_event_line, EventParseError, HyprEvent};

use hyprdock_core::{normalize_address, WindowRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable identifying the running Hyprland instance.
pub const INSTANCE_SIGNATURE_VAR: &str = "HYPRLAND_INSTANCE_SIGNATURE";

/// Socket directory used by Hyprland releases before 0.40.
pub const LEGACY_HYPR_DIR: &str = "/tmp/hypr";

/// Query socket file name.
pub const QUERY_SOCKET: &str = ".socket.sock";

/// Event socket file name.
pub const EVENT_SOCKET: &str = ".socket2.sock";

/// Upper bound for one query round-trip.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors talking to the compositor.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("HYPRLAND_INSTANCE_SIGNATURE is not set; is Hyprland running?")]
    MissingInstanceSignature,

    #[error("Failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request '{0}' timed out")]
    Timeout(String),

    #[error("Malformed response to '{request}': {source}")]
    Parse {
        request: String,
        source: serde_json::Error,
    },

    #[error("Dispatch '{command}' rejected: {response}")]
    Dispatch { command: String, response: String },

    #[error("Event socket closed by the compositor")]
    EventStreamClosed,
}

/// Locations of the two Hyprland sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyprlandSockets {
    pub query: PathBuf,
    pub events: PathBuf,
}

impl HyprlandSockets {
    /// Resolve socket paths from the process environment.
    pub fn from_env() -> Result<Self, IpcError> {
        let signature = std::env::var(INSTANCE_SIGNATURE_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(IpcError::MissingInstanceSignature)?;
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from);
        Ok(Self::resolve(runtime_dir.as_deref(), &signature))
    }

    /// Resolve socket paths for an instance signature.
    ///
    /// Newer Hyprland keeps its sockets under `$XDG_RUNTIME_DIR/hypr`; older
    /// releases use `/tmp/hypr`.
    pub fn resolve(runtime_dir: Option<&Path>, signature: &str) -> Self {
        let hypr_dir = runtime_dir
            .map(|dir| dir.join("hypr"))
            .filter(|dir| dir.exists())
            .unwrap_or_else(|| PathBuf::from(LEGACY_HYPR_DIR));
        Self::in_dir(&hypr_dir.join(signature))
    }

    /// Sockets inside an explicit instance directory.
    pub fn in_dir(instance_dir: &Path) -> Self {
        Self {
            query: instance_dir.join(QUERY_SOCKET),
            events: instance_dir.join(EVENT_SOCKET),
        }
    }
}

/// Workspace reference embedded in a client record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyprWorkspaceRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// One entry of the `j/clients` response (only the fields the dock reads).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HyprClient {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub initial_class: String,
    #[serde(default)]
    pub workspace: HyprWorkspaceRef,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub mapped: Option<bool>,
}

impl From<HyprClient> for WindowRecord {
    fn from(client: HyprClient) -> Self {
        Self {
            address: normalize_address(&client.address),
            class: client.class,
            workspace_id: client.workspace.id,
            workspace_name: client.workspace.name,
            title: client.title,
            pid: client.pid.filter(|pid| *pid > 0),
        }
    }
}

/// Parse a `j/clients` response into window records.
pub fn parse_clients(json: &str) -> Result<Vec<WindowRecord>, serde_json::Error> {
    let clients: Vec<HyprClient> = serde_json::from_str(json)?;
    Ok(clients.into_iter().map(WindowRecord::from).collect())
}

/// Parse a `j/activewindow` response. Hyprland answers `{}` when nothing
/// has focus.
pub fn parse_active_window(json: &str) -> Result<Option<WindowRecord>, serde_json::Error> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let client: HyprClient = serde_json::from_str(trimmed)?;
    if client.address.is_empty() {
        return Ok(None);
    }
    Ok(Some(client.into()))
}
