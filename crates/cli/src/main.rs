//! hyprdock-ctl
//!
//! Command-line tool for the hyprdock dock.
//!
//! Visibility commands are delivered to the running dock as signals, using
//! the PID recorded in its lock file. Pin commands edit the pin file the
//! dock reloads on every rebuild.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hyprdock::config::Config;
use hyprdock_core::{build_display_list, DisplayItem, DisplayList, PinStore};
use hyprdock_ipc::HyprlandClient;
use hyprdock_platform::{default_lock_path, is_alive, read_owner_pid, send_signal, DockSignal};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hyprdock-ctl")]
#[command(author, version, about = "Control the hyprdock dock")]
struct Cli {
    /// Path to a config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Toggle dock visibility
    Toggle,
    /// Show the dock
    Show,
    /// Hide the dock
    Hide,
    /// Stop the running dock
    Quit,
    /// Pin an application identifier
    Pin {
        /// Window class, e.g. firefox
        id: String,
    },
    /// Unpin an application identifier
    Unpin {
        /// Window class, e.g. firefox
        id: String,
    },
    /// List pinned identifiers
    Pins,
    /// Query Hyprland and print what the dock would show
    Preview {
        /// Print the display list as JSON
        #[arg(long)]
        json: bool,
    },
}

/// PID of the running dock, if there is one.
fn running_dock(lock_path: &Path) -> Result<i32> {
    match read_owner_pid(lock_path) {
        Some(pid) if is_alive(pid) => Ok(pid),
        _ => bail!("hyprdock is not running (no live owner of {})", lock_path.display()),
    }
}

fn signal_dock(signal: DockSignal) -> Result<()> {
    let pid = running_dock(&default_lock_path())?;
    send_signal(pid, signal)?;
    println!("Sent {} to hyprdock (PID {})", signal.name(), pid);
    Ok(())
}

/// Pin or unpin `id` in the file at `path`. Returns whether it changed.
fn edit_pins(path: &Path, id: &str, pin: bool) -> Result<bool> {
    let mut pins = PinStore::load(path)?;
    let changed = if pin { pins.pin(id) } else { pins.unpin(id) };
    if changed {
        pins.save(path)?;
    }
    Ok(changed)
}

/// One human-readable line per dock item.
fn describe(item: &DisplayItem) -> String {
    match item {
        DisplayItem::Launcher { command } => format!("[launcher] {}", command),
        DisplayItem::Pinned { id } => format!("[pinned]   {}", id),
        DisplayItem::PinnedRunning(task) | DisplayItem::Running(task) => {
            let kind = if matches!(item, DisplayItem::PinnedRunning(_)) {
                "[pinned]  "
            } else {
                "[running] "
            };
            let addresses: Vec<&str> = task.instances.iter().map(|w| w.address.as_str()).collect();
            format!(
                "{} {} x{} ({}){}",
                kind,
                task.id,
                task.instances.len(),
                addresses.join(", "),
                if task.active { " *" } else { "" }
            )
        }
    }
}

fn print_display_list(list: &DisplayList, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(list)?);
        return Ok(());
    }
    println!("icon size: {}", list.icon_size);
    for item in &list.items {
        println!("{}", describe(item));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let load_config = || -> Result<Config> {
        let mut config = Config::load_with(cli.config.as_deref())?;
        for w in config.validate() {
            eprintln!("Config: {} - {}", w.field, w.message);
        }
        Ok(config)
    };

    match &cli.command {
        Commands::Toggle => signal_dock(DockSignal::Toggle)?,
        Commands::Show => signal_dock(DockSignal::Show)?,
        Commands::Hide => signal_dock(DockSignal::Hide)?,
        Commands::Quit => signal_dock(DockSignal::Terminate)?,
        Commands::Pin { id } => {
            let path = load_config()?.pins_path();
            if edit_pins(&path, id, true)? {
                println!("Pinned {}", id);
            } else {
                println!("{} is already pinned", id);
            }
        }
        Commands::Unpin { id } => {
            let path = load_config()?.pins_path();
            if edit_pins(&path, id, false)? {
                println!("Unpinned {}", id);
            } else {
                println!("{} was not pinned", id);
            }
        }
        Commands::Pins => {
            let pins = PinStore::load(&load_config()?.pins_path())?;
            for id in pins.iter() {
                println!("{}", id);
            }
        }
        Commands::Preview { json } => {
            let config = load_config()?;
            let pins = PinStore::load(&config.pins_path())?;
            let options = config.reconcile_options(config.resolve_launcher());
            let client = HyprlandClient::from_env()?;
            let snapshot = client
                .snapshot()
                .await
                .context("Failed to query Hyprland clients")?;
            let list = build_display_list(&pins, &snapshot.windows, snapshot.active.as_ref(), &options);
            print_display_list(&list, *json)?;
        }
    }

    Ok(())
}
