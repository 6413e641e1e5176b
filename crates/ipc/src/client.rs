//! Async socket client for Hyprland.

use crate::events::parse_event_line;
use crate::{
    parse_active_window, parse_clients, HyprEvent, HyprlandSockets, IpcError, QUERY_TIMEOUT,
};
use hyprdock_core::{normalize_address, WindowRecord};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

/// Result of one full registry query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub windows: Vec<WindowRecord>,
    pub active: Option<WindowRecord>,
}

/// Client for the Hyprland query and event sockets.
#[derive(Debug, Clone)]
pub struct HyprlandClient {
    sockets: HyprlandSockets,
}

impl HyprlandClient {
    pub fn new(sockets: HyprlandSockets) -> Self {
        Self { sockets }
    }

    /// Client for the Hyprland instance named in the environment.
    pub fn from_env() -> Result<Self, IpcError> {
        HyprlandSockets::from_env().map(Self::new)
    }

    pub fn sockets(&self) -> &HyprlandSockets {
        &self.sockets
    }

    /// Send one request on the query socket and return the raw response.
    pub async fn request(&self, command: &str) -> Result<String, IpcError> {
        let exchange = async {
            let mut stream = connect(&self.sockets.query).await?;
            stream.write_all(command.as_bytes()).await?;
            let mut response = String::new();
            stream.read_to_string(&mut response).await?;
            Ok::<_, IpcError>(response)
        };
        let response = tokio::time::timeout(QUERY_TIMEOUT, exchange)
            .await
            .map_err(|_| IpcError::Timeout(command.to_string()))??;
        debug!("'{}' answered with {} bytes", command, response.len());
        Ok(response)
    }

    /// Query the full window list.
    pub async fn clients(&self) -> Result<Vec<WindowRecord>, IpcError> {
        let request = "j/clients";
        let response = self.request(request).await?;
        parse_clients(&response).map_err(|source| IpcError::Parse {
            request: request.to_string(),
            source,
        })
    }

    /// Query the focused window.
    pub async fn active_window(&self) -> Result<Option<WindowRecord>, IpcError> {
        let request = "j/activewindow";
        let response = self.request(request).await?;
        parse_active_window(&response).map_err(|source| IpcError::Parse {
            request: request.to_string(),
            source,
        })
    }

    /// Query the window list and the focused window together.
    pub async fn snapshot(&self) -> Result<Snapshot, IpcError> {
        let windows = self.clients().await?;
        let active = self.active_window().await?;
        Ok(Snapshot { windows, active })
    }

    /// Run a dispatcher, e.g. `focuswindow address:0x…`.
    pub async fn dispatch(&self, args: &str) -> Result<(), IpcError> {
        let command = format!("dispatch {}", args);
        let response = self.request(&command).await?;
        if response.trim() == "ok" {
            Ok(())
        } else {
            Err(IpcError::Dispatch {
                command,
                response: response.trim().to_string(),
            })
        }
    }

    /// Focus a specific window.
    pub async fn focus_window(&self, address: &str) -> Result<(), IpcError> {
        self.dispatch(&format!("focuswindow address:{}", normalize_address(address)))
            .await
    }

    /// Start a program through the compositor.
    pub async fn exec(&self, command: &str) -> Result<(), IpcError> {
        self.dispatch(&format!("exec {}", command)).await
    }

    /// Open the long-lived event connection.
    pub async fn subscribe(&self) -> Result<EventStream, IpcError> {
        let stream = connect(&self.sockets.events).await?;
        Ok(EventStream::new(stream))
    }
}

async fn connect(path: &Path) -> Result<UnixStream, IpcError> {
    UnixStream::connect(path)
        .await
        .map_err(|source| IpcError::Connect {
            path: path.to_path_buf(),
            source,
        })
}

/// Line reader over the event socket.
pub struct EventStream {
    reader: BufReader<UnixStream>,
    buf: Vec<u8>,
}

impl EventStream {
    pub fn new(stream: UnixStream) -> Self {
        Self {
            reader: BufReader::new(stream),
            buf: Vec::new(),
        }
    }

    /// Next event the stream carries.
    ///
    /// Malformed lines, including ones that are not valid UTF-8, are
    /// skipped. Returns `EventStreamClosed` when the compositor hangs up.
    pub async fn next_event(&mut self) -> Result<HyprEvent, IpcError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Err(IpcError::EventStreamClosed);
            }
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim_end_matches(['\r', '\n']),
                Err(e) => {
                    debug!("Skipping non UTF-8 event line: {}", e);
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match parse_event_line(line) {
                Ok(event) => return Ok(event),
                Err(e) => debug!("Skipping event line: {}", e),
            }
        }
    }
}
