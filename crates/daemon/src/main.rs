//! hyprdock daemon - taskbar/dock for the Hyprland compositor.
//!
//! Main entry point. The main task owns all state and is the only writer to
//! the surface. Background tasks (signal listener, Hyprland event listener,
//! surface reader, hide timer) talk to it through channels.

use anyhow::{Context, Result};
use clap::Parser;
use hyprdock::config::{Cli, Config};
use hyprdock::listener::spawn_event_listener;
use hyprdock::state::{Activation, AppState};
use hyprdock::surface::{spawn_surface_reader, JsonSurface};
use hyprdock::{DaemonEvent, EVENT_QUEUE_CAPACITY};
use hyprdock_core::{DockMode, VisibilityEffect};
use hyprdock_ipc::HyprlandClient;
use hyprdock_platform::{
    default_lock_path, send_signal, spawn_signal_listener, DockSignal, LockOutcome,
};
use std::io::Write;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Whether the main loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The running dock: state plus the handles needed to act on it.
struct Dock<W: Write> {
    state: AppState,
    client: HyprlandClient,
    surface: JsonSurface<W>,
    event_tx: mpsc::Sender<DaemonEvent>,
    hide_timer: Option<JoinHandle<()>>,
}

impl<W: Write> Dock<W> {
    fn new(
        state: AppState,
        client: HyprlandClient,
        surface: JsonSurface<W>,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> Self {
        Self {
            state,
            client,
            surface,
            event_tx,
            hide_timer: None,
        }
    }

    /// Send the current row and visibility to the surface.
    fn publish(&mut self) -> Result<()> {
        self.surface
            .render(self.state.display())
            .context("Failed to write to surface")?;
        self.surface
            .set_visible(self.state.visibility().is_visible())
            .context("Failed to write to surface")?;
        Ok(())
    }

    /// Query Hyprland and rebuild if needed. Query failures are fatal.
    async fn refresh(&mut self, force: bool) -> Result<()> {
        let snapshot = self
            .client
            .snapshot()
            .await
            .context("Failed to query Hyprland clients")?;
        if self.state.apply_snapshot(snapshot, force) {
            self.surface
                .render(self.state.display())
                .context("Failed to write to surface")?;
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: DaemonEvent) -> Result<Flow> {
        match event {
            DaemonEvent::Refresh { force } => {
                self.refresh(force).await?;
                Ok(Flow::Continue)
            }
            DaemonEvent::Surface { event, at_ms } => {
                let reaction = self.state.handle_surface(&event, at_ms);
                if reaction.rerender {
                    self.surface
                        .render(self.state.display())
                        .context("Failed to write to surface")?;
                }
                if let Some(activation) = reaction.activation {
                    self.activate(activation).await;
                }
                self.apply_effects(reaction.effects)
            }
            DaemonEvent::SurfaceClosed => {
                info!("Surface input closed, pointer events disabled");
                Ok(Flow::Continue)
            }
            DaemonEvent::HideTimerFired(id) => {
                self.hide_timer = None;
                let effect = self.state.hide_timer_fired(id);
                self.apply_effects(effect)
            }
            DaemonEvent::Fatal(e) => Err(e),
        }
    }

    fn handle_signal(&mut self, signal: DockSignal) -> Result<Flow> {
        if signal == DockSignal::Terminate {
            info!("Termination signal received");
            return Ok(Flow::Quit);
        }
        let effects = self.state.handle_signal(signal);
        self.apply_effects(effects)
    }

    /// Carry out visibility effects in order.
    fn apply_effects(&mut self, effects: impl IntoIterator<Item = VisibilityEffect>) -> Result<Flow> {
        for effect in effects {
            debug!("Visibility effect: {:?}", effect);
            match effect {
                VisibilityEffect::Show => self
                    .surface
                    .set_visible(true)
                    .context("Failed to write to surface")?,
                VisibilityEffect::Hide => self
                    .surface
                    .set_visible(false)
                    .context("Failed to write to surface")?,
                VisibilityEffect::ScheduleHide(timer) => {
                    // Cancel any pending hide
                    if let Some(handle) = self.hide_timer.take() {
                        handle.abort();
                    }
                    let tx = self.event_tx.clone();
                    self.hide_timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(timer.delay).await;
                        let _ = tx.send(DaemonEvent::HideTimerFired(timer.id)).await;
                    }));
                }
                VisibilityEffect::CancelHide(_) => {
                    if let Some(handle) = self.hide_timer.take() {
                        handle.abort();
                    }
                }
                VisibilityEffect::Quit => {
                    info!("Toggle received, closing dock");
                    return Ok(Flow::Quit);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Forward a click to Hyprland. Failures are logged, never fatal.
    async fn activate(&self, activation: Activation) {
        let result = match &activation {
            Activation::Focus(address) => self.client.focus_window(address).await,
            Activation::Exec(command) => self.client.exec(command).await,
        };
        match result {
            Ok(()) => debug!("{:?} done", activation),
            Err(e) => warn!("{:?} failed: {}", activation, e),
        }
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.hide_timer.take() {
            handle.abort();
        }
    }
}

fn log_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // default fallback for invalid values
    }
}

/// React to a dock that already holds the lock.
///
/// Autohide and resident docks stay alone. A plain dock asks the running one
/// to toggle, so the key binding that opened it also closes it.
fn handle_running_instance(mode: DockMode, owner: Option<i32>) -> Result<()> {
    if mode.is_persistent() {
        info!("Running instance found, terminating...");
        return Ok(());
    }
    match owner {
        Some(pid) => {
            info!("Running instance found (PID {}), sending toggle", pid);
            send_signal(pid, DockSignal::Toggle)?;
        }
        None => warn!("Lock is held but the owner PID is unknown, nothing to toggle"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for log level)
    let mut config = Config::load_with(cli.config.as_deref()).unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {:#}. Using defaults.", e);
        Config::default()
    });
    cli.apply(&mut config);

    // stdout belongs to the surface, logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(&config.behavior.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Validate and clamp config values
    let config_warnings = config.validate();
    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("hyprdock starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mode = config.dock_mode();
    let lock_path = default_lock_path();
    let _lock = match LockOutcome::acquire(&lock_path)? {
        LockOutcome::Acquired(lock) => lock,
        LockOutcome::HeldBy(owner) => return handle_running_instance(mode, owner),
    };

    info!(
        "Configuration loaded: mode={:?}, icon_size={}, hotspot_delay={}ms, ignored_workspaces={:?}",
        mode, config.dock.icon_size, config.behavior.hotspot_delay_ms, config.dock.ignored_workspaces
    );

    let client = HyprlandClient::from_env()?;
    debug!("Hyprland sockets: {:?}", client.sockets());

    let launcher = config.resolve_launcher();
    let output = config.dock.output.clone();
    let mut state = AppState::new(config, launcher);
    info!("Using pin file {}", state.pins_path().display());

    let snapshot = client
        .snapshot()
        .await
        .context("Initial Hyprland client query failed")?;
    state.apply_snapshot(snapshot, true);
    info!(
        "Found {} windows, {} dock items",
        state.registry().len(),
        state.display().len()
    );

    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(EVENT_QUEUE_CAPACITY);

    let events = client
        .subscribe()
        .await
        .context("Failed to connect to the Hyprland event socket")?;
    let listener_handle = spawn_event_listener(events, event_tx.clone());
    let reader_handle = spawn_surface_reader(tokio::io::stdin(), event_tx.clone());
    let (signal_handle, mut signal_rx) = spawn_signal_listener()?;

    let mut dock = Dock::new(
        state,
        client,
        JsonSurface::new(std::io::stdout(), output),
        event_tx,
    );
    dock.publish()?;

    info!("Ready.");

    // Main event loop
    let result = loop {
        let step = tokio::select! {
            signal = signal_rx.recv() => match signal {
                Some(signal) => dock.handle_signal(signal),
                None => Ok(Flow::Quit),
            },
            event = event_rx.recv() => match event {
                Some(event) => dock.handle_event(event).await,
                None => Ok(Flow::Quit),
            },
        };
        match step {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break Ok(()),
            Err(e) => {
                error!("{:#}", e);
                break Err(e);
            }
        }
    };

    dock.shutdown();
    listener_handle.abort();
    reader_handle.abort();
    signal_handle.abort();

    info!("hyprdock shutting down.");
    result
}
