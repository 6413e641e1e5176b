//! Line protocol between the daemon and the drawing front end.
//!
//! Output (stdout) is one JSON object per line:
//!
//! ```text
//! {"type":"render","icon_size":48,"output":null,"items":[...]}
//! {"type":"visibility","visible":true}
//! ```
//!
//! Input (stdin) is one command per line: `detector-enter`, `hotspot-enter`,
//! `enter`, `leave`, `activate <id>`, `focus <address>`, `launcher`,
//! `pin <id>`, `unpin <id>`.

use crate::DaemonEvent;
use hyprdock_core::{normalize_address, DisplayItem, DisplayList};
use serde::Serialize;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A pointer event or button action reported by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    DetectorEnter,
    HotspotEnter,
    /// Pointer entered the dock.
    Enter,
    /// Pointer left the dock.
    Leave,
    /// A dock button was clicked.
    Activate { id: String },
    /// An entry of an instance menu was clicked.
    Focus { address: String },
    Launcher,
    Pin { id: String },
    Unpin { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceParseError {
    #[error("Unknown surface command: {0:?}")]
    UnknownCommand(String),

    #[error("Surface command '{0}' needs an argument")]
    MissingArgument(&'static str),
}

/// Parse one input line from the surface.
pub fn parse_surface_line(line: &str) -> Result<SurfaceEvent, SurfaceParseError> {
    let line = line.trim();
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    let require = |name: &'static str| {
        if arg.is_empty() {
            Err(SurfaceParseError::MissingArgument(name))
        } else {
            Ok(arg.to_string())
        }
    };

    match command {
        "detector-enter" => Ok(SurfaceEvent::DetectorEnter),
        "hotspot-enter" => Ok(SurfaceEvent::HotspotEnter),
        "enter" => Ok(SurfaceEvent::Enter),
        "leave" => Ok(SurfaceEvent::Leave),
        "launcher" => Ok(SurfaceEvent::Launcher),
        "activate" => Ok(SurfaceEvent::Activate {
            id: require("activate")?,
        }),
        "focus" => Ok(SurfaceEvent::Focus {
            address: normalize_address(&require("focus")?),
        }),
        "pin" => Ok(SurfaceEvent::Pin { id: require("pin")? }),
        "unpin" => Ok(SurfaceEvent::Unpin {
            id: require("unpin")?,
        }),
        _ => Err(SurfaceParseError::UnknownCommand(line.to_string())),
    }
}

/// Wall-clock milliseconds, used to time hotspot crossings.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Read surface commands and forward them to the main loop.
///
/// Unknown lines are skipped with a warning. EOF sends
/// [`DaemonEvent::SurfaceClosed`] and ends the task.
pub fn spawn_surface_reader<R>(reader: R, tx: mpsc::Sender<DaemonEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    let _ = tx.send(DaemonEvent::SurfaceClosed).await;
                    break;
                }
                Ok(_) => {
                    let Ok(line) = std::str::from_utf8(&buf) else {
                        warn!("Skipping surface input that is not valid UTF-8");
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let at_ms = now_ms();
                    match parse_surface_line(line) {
                        Ok(event) => {
                            debug!("Surface: {:?}", event);
                            if tx.send(DaemonEvent::Surface { event, at_ms }).await.is_err() {
                                break; // Daemon shutting down
                            }
                        }
                        Err(e) => warn!("{}", e),
                    }
                }
                Err(e) => {
                    warn!("Failed to read surface input: {}", e);
                    let _ = tx.send(DaemonEvent::SurfaceClosed).await;
                    break;
                }
            }
        }
    })
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SurfaceMessage<'a> {
    Render {
        icon_size: u32,
        output: Option<&'a str>,
        items: &'a [DisplayItem],
    },
    Visibility {
        visible: bool,
    },
}

/// Writes render and visibility messages as JSON lines.
pub struct JsonSurface<W: Write> {
    writer: W,
    output: Option<String>,
}

impl<W: Write> JsonSurface<W> {
    pub fn new(writer: W, output: Option<String>) -> Self {
        Self { writer, output }
    }

    /// Send the full button row.
    pub fn render(&mut self, list: &DisplayList) -> std::io::Result<()> {
        let Self { writer, output } = self;
        write_message(
            writer,
            &SurfaceMessage::Render {
                icon_size: list.icon_size,
                output: output.as_deref(),
                items: &list.items,
            },
        )
    }

    pub fn set_visible(&mut self, visible: bool) -> std::io::Result<()> {
        write_message(&mut self.writer, &SurfaceMessage::Visibility { visible })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn write_message<W: Write>(writer: &mut W, message: &SurfaceMessage<'_>) -> std::io::Result<()> {
    let line = serde_json::to_string(message)?;
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}
