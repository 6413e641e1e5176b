//! Process signals understood by the dock.
//!
//! | signal        | meaning                 |
//! |---------------|-------------------------|
//! | SIGRTMIN+1    | toggle visibility       |
//! | SIGRTMIN+2    | show                    |
//! | SIGRTMIN+3    | hide                    |
//! | SIGUSR1       | toggle (deprecated)     |
//! | SIGTERM/SIGINT| terminate               |

use crate::PlatformError;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The listener hands over at most one signal at a time.
pub const SIGNAL_QUEUE_CAPACITY: usize = 1;

/// Logical signals delivered to the dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockSignal {
    Toggle,
    Show,
    Hide,
    Terminate,
    /// SIGUSR1, kept for old key bindings.
    LegacyToggle,
}

impl DockSignal {
    /// OS signal number used to deliver this signal.
    ///
    /// The realtime signals are offset from `SIGRTMIN`, which libc decides
    /// at runtime.
    pub fn number(self) -> i32 {
        match self {
            Self::Toggle => libc::SIGRTMIN() + 1,
            Self::Show => libc::SIGRTMIN() + 2,
            Self::Hide => libc::SIGRTMIN() + 3,
            Self::Terminate => libc::SIGTERM,
            Self::LegacyToggle => libc::SIGUSR1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Toggle => "SIGRTMIN+1",
            Self::Show => "SIGRTMIN+2",
            Self::Hide => "SIGRTMIN+3",
            Self::Terminate => "SIGTERM",
            Self::LegacyToggle => "SIGUSR1",
        }
    }
}

/// Send a dock signal to another process.
pub fn send_signal(pid: i32, signal: DockSignal) -> Result<(), PlatformError> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid, signal.number()) };
    if rc == 0 {
        debug!("Sent {} to process {}", signal.name(), pid);
        Ok(())
    } else {
        Err(PlatformError::SignalSend {
            signal,
            pid,
            source: std::io::Error::last_os_error(),
        })
    }
}

fn install(kind: SignalKind, name: &'static str) -> Result<tokio::signal::unix::Signal, PlatformError> {
    signal(kind).map_err(|source| PlatformError::SignalInstall { name, source })
}

/// Install handlers for every dock signal and forward them over a channel.
///
/// Must be called from within a tokio runtime. The listener task ends when
/// the receiver is dropped.
pub fn spawn_signal_listener(
) -> Result<(JoinHandle<()>, mpsc::Receiver<DockSignal>), PlatformError> {
    let mut toggle = install(
        SignalKind::from_raw(DockSignal::Toggle.number()),
        DockSignal::Toggle.name(),
    )?;
    let mut show = install(
        SignalKind::from_raw(DockSignal::Show.number()),
        DockSignal::Show.name(),
    )?;
    let mut hide = install(
        SignalKind::from_raw(DockSignal::Hide.number()),
        DockSignal::Hide.name(),
    )?;
    let mut legacy = install(SignalKind::user_defined1(), DockSignal::LegacyToggle.name())?;
    let mut terminate = install(SignalKind::terminate(), "SIGTERM")?;
    let mut interrupt = install(SignalKind::interrupt(), "SIGINT")?;

    let (tx, rx) = mpsc::channel(SIGNAL_QUEUE_CAPACITY);
    let handle = tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = toggle.recv() => DockSignal::Toggle,
                _ = show.recv() => DockSignal::Show,
                _ = hide.recv() => DockSignal::Hide,
                _ = legacy.recv() => {
                    warn!("SIGUSR1 for toggling visibility is deprecated, use SIGRTMIN+1");
                    DockSignal::LegacyToggle
                }
                _ = terminate.recv() => DockSignal::Terminate,
                _ = interrupt.recv() => DockSignal::Terminate,
            };
            debug!("Received {}", received.name());
            if tx.send(received).await.is_err() {
                break; // Dock is shutting down
            }
        }
    });

    Ok((handle, rx))
}
