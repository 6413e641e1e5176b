//! Hyprland event-stream grammar.
//!
//! Every line on the event socket has the form `event-name>>payload`.
//! Payload fields are comma separated; the last field of a payload may
//! itself contain commas (window titles do).

use hyprdock_core::normalize_address;
use thiserror::Error;

/// Separator between event name and payload.
pub const EVENT_DELIMITER: &str = ">>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    #[error("Event line has no '>>' delimiter: {0:?}")]
    MissingDelimiter(String),

    #[error("Event line has an empty name: {0:?}")]
    EmptyName(String),

    #[error("Malformed payload for '{event}': {payload:?}")]
    MalformedPayload { event: String, payload: String },
}

/// Events the dock understands. Everything else is [`HyprEvent::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyprEvent {
    /// Focus moved to another window. `None` when focus was cleared.
    ActiveWindow { address: Option<String> },
    /// A window was mapped.
    OpenWindow {
        address: String,
        workspace: String,
        class: String,
        title: String,
    },
    /// A window was closed.
    CloseWindow { address: String },
    /// A window moved to another workspace.
    MoveWindow { address: String, workspace: String },
    /// Any other event; kept by name for logging.
    Other { name: String },
}

impl HyprEvent {
    /// Whether the event can change the window list or the active window.
    pub fn affects_window_list(&self) -> bool {
        !matches!(self, Self::Other { .. })
    }
}

/// Parse one line from the event socket.
pub fn parse_event_line(line: &str) -> Result<HyprEvent, EventParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (name, payload) = line
        .split_once(EVENT_DELIMITER)
        .ok_or_else(|| EventParseError::MissingDelimiter(line.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(EventParseError::EmptyName(line.to_string()));
    }

    let malformed = || EventParseError::MalformedPayload {
        event: name.to_string(),
        payload: payload.to_string(),
    };

    match name {
        "activewindowv2" => {
            let token = payload.trim();
            // Two events glued together leave a second delimiter in the payload.
            if token.contains(EVENT_DELIMITER) {
                return Err(malformed());
            }
            let address = match token {
                "" | "," => None,
                _ => Some(normalize_address(token)),
            };
            Ok(HyprEvent::ActiveWindow { address })
        }
        "openwindow" => {
            let mut fields = payload.splitn(4, ',');
            let address = fields.next().filter(|a| !a.is_empty()).ok_or_else(malformed)?;
            let workspace = fields.next().ok_or_else(malformed)?;
            let class = fields.next().ok_or_else(malformed)?;
            let title = fields.next().unwrap_or_default();
            Ok(HyprEvent::OpenWindow {
                address: normalize_address(address),
                workspace: workspace.to_string(),
                class: class.to_string(),
                title: title.to_string(),
            })
        }
        "closewindow" => {
            let address = payload.trim();
            if address.is_empty() || address.contains(EVENT_DELIMITER) {
                return Err(malformed());
            }
            Ok(HyprEvent::CloseWindow {
                address: normalize_address(address),
            })
        }
        "movewindow" | "movewindowv2" => {
            let (address, rest) = payload.split_once(',').ok_or_else(malformed)?;
            // movewindowv2 carries `id,name`; the name is what users see.
            let workspace = match name {
                "movewindowv2" => rest.split_once(',').map_or(rest, |(_, ws_name)| ws_name),
                _ => rest,
            };
            Ok(HyprEvent::MoveWindow {
                address: normalize_address(address),
                workspace: workspace.to_string(),
            })
        }
        other => Ok(HyprEvent::Other {
            name: other.to_string(),
        }),
    }
}
