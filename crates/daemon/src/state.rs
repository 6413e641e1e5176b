//! State owned by the daemon's main loop.

use crate::config::Config;
use crate::surface::SurfaceEvent;
use hyprdock_core::{
    build_display_list, ClientRegistry, DisplayItem, DisplayList, Launcher, PinStore,
    ReconcileOptions, VisibilityController, VisibilityEffect, VisibilityRequest,
};
use hyprdock_ipc::Snapshot;
use hyprdock_platform::DockSignal;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compositor request resulting from a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Focus the window with this address.
    Focus(String),
    /// Start a program. For a pinned identifier with no open window the
    /// identifier itself is the command line, so pins are expected to be
    /// runnable names (`firefox`, `kitty`). Mapping a class to a `.desktop`
    /// entry's `Exec=` line is left to the surface.
    Exec(String),
}

/// What the main loop has to do after a surface event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    pub effects: Vec<VisibilityEffect>,
    pub activation: Option<Activation>,
    /// The display list changed and must be sent again.
    pub rerender: bool,
}

impl Reaction {
    fn with_effect(effect: Option<VisibilityEffect>) -> Self {
        Self {
            effects: effect.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// Application state.
pub struct AppState {
    config: Config,
    options: ReconcileOptions,
    pins_path: PathBuf,
    pins: PinStore,
    registry: ClientRegistry,
    visibility: VisibilityController,
    display: DisplayList,
}

impl AppState {
    pub fn new(config: Config, launcher: Option<Launcher>) -> Self {
        let options = config.reconcile_options(launcher);
        let visibility = VisibilityController::new(
            config.dock_mode(),
            config.behavior.hotspot_delay_ms,
            config.hide_delay(),
        );
        let pins_path = config.pins_path();
        let pins = load_pins(&pins_path).unwrap_or_default();
        Self {
            config,
            options,
            pins_path,
            pins,
            registry: ClientRegistry::new(),
            visibility,
            display: DisplayList::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn display(&self) -> &DisplayList {
        &self.display
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    pub fn pins_path(&self) -> &Path {
        &self.pins_path
    }

    pub fn visibility(&self) -> &VisibilityController {
        &self.visibility
    }

    /// Take a fresh registry snapshot. Returns whether the display list was
    /// rebuilt.
    ///
    /// Non-forced snapshots rebuild only when the visible window set changed.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot, force: bool) -> bool {
        self.registry.replace(snapshot.windows, snapshot.active);
        if !force && !self.registry.visible_changed() {
            debug!("Visible windows unchanged ({} records), skipping rebuild", self.registry.len());
            return false;
        }
        self.rebuild();
        true
    }

    /// Reload pins and rebuild the display list from the current snapshot.
    pub fn rebuild(&mut self) {
        if let Some(pins) = load_pins(&self.pins_path) {
            self.pins = pins;
        }
        self.display = build_display_list(
            &self.pins,
            self.registry.windows(),
            self.registry.active(),
            &self.options,
        );
        debug!(
            "Rebuilt dock: {} items, icon size {}",
            self.display.len(),
            self.display.icon_size
        );
    }

    /// Handle a show/hide/toggle signal. Terminate is the caller's business.
    pub fn handle_signal(&mut self, signal: DockSignal) -> Vec<VisibilityEffect> {
        let request = match signal {
            DockSignal::Toggle | DockSignal::LegacyToggle => VisibilityRequest::Toggle,
            DockSignal::Show => VisibilityRequest::Show,
            DockSignal::Hide => VisibilityRequest::Hide,
            DockSignal::Terminate => return Vec::new(),
        };
        self.visibility.request(request)
    }

    pub fn hide_timer_fired(&mut self, id: u64) -> Option<VisibilityEffect> {
        self.visibility.hide_timer_fired(id)
    }

    /// Handle one surface event received at `at_ms`.
    pub fn handle_surface(&mut self, event: &SurfaceEvent, at_ms: i64) -> Reaction {
        match event {
            SurfaceEvent::DetectorEnter => {
                self.visibility.detector_enter(at_ms);
                Reaction::default()
            }
            SurfaceEvent::HotspotEnter => Reaction::with_effect(self.visibility.hotspot_enter(at_ms)),
            SurfaceEvent::Enter => Reaction::with_effect(self.visibility.pointer_enter()),
            SurfaceEvent::Leave => Reaction::with_effect(self.visibility.pointer_leave()),
            SurfaceEvent::Activate { id } => match self.activation_for(id) {
                Some(activation) => self.activate(activation),
                None => {
                    warn!("Activation of unknown item '{}' ignored", id);
                    Reaction::default()
                }
            },
            SurfaceEvent::Focus { address } => {
                if self.registry.find(address).is_none() {
                    debug!("Focus target {} is not in the current snapshot", address);
                }
                self.activate(Activation::Focus(address.clone()))
            }
            SurfaceEvent::Launcher => match &self.options.launcher {
                Some(launcher) => {
                    let command = launcher.command.clone();
                    self.activate(Activation::Exec(command))
                }
                None => {
                    debug!("Launcher activated but none is configured");
                    Reaction::default()
                }
            },
            SurfaceEvent::Pin { id } => self.edit_pins(id, true),
            SurfaceEvent::Unpin { id } => self.edit_pins(id, false),
        }
    }

    /// What clicking the button for `id` does: focus the first instance of
    /// a running identifier, start a pinned one that is not running.
    pub fn activation_for(&self, id: &str) -> Option<Activation> {
        match self.display.get(id)? {
            DisplayItem::Pinned { id } => Some(Activation::Exec(id.clone())),
            DisplayItem::PinnedRunning(task) | DisplayItem::Running(task) => task
                .primary()
                .map(|window| Activation::Focus(window.address.clone())),
            DisplayItem::Launcher { .. } => None,
        }
    }

    fn activate(&mut self, activation: Activation) -> Reaction {
        Reaction {
            effects: self.visibility.activated(),
            activation: Some(activation),
            rerender: false,
        }
    }

    fn edit_pins(&mut self, id: &str, pin: bool) -> Reaction {
        // Start from disk so edits made by other tools are not lost.
        if let Some(pins) = load_pins(&self.pins_path) {
            self.pins = pins;
        }
        let changed = if pin {
            self.pins.pin(id)
        } else {
            self.pins.unpin(id)
        };
        if !changed {
            debug!("Pin state of '{}' unchanged", id);
            return Reaction::default();
        }
        match self.pins.save(&self.pins_path) {
            Ok(()) => info!("{} '{}'", if pin { "Pinned" } else { "Unpinned" }, id),
            Err(e) => warn!("Failed to save pins: {}", e),
        }
        self.rebuild();
        Reaction {
            rerender: true,
            ..Reaction::default()
        }
    }
}

/// Load pins, logging failures. `None` keeps whatever was loaded before.
fn load_pins(path: &Path) -> Option<PinStore> {
    match PinStore::load(path) {
        Ok(pins) => Some(pins),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyprdock_core::{DockMode, LauncherPosition, WindowRecord};

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.dock.pinned_file = Some(dir.join("pinned"));
        config
    }

    fn snapshot(windows: Vec<WindowRecord>, active: Option<usize>) -> Snapshot {
        let active = active.map(|i| windows[i].clone());
        Snapshot { windows, active }
    }

    #[test]
    fn test_forced_and_unforced_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(test_config(dir.path()), None);
        let windows = vec![WindowRecord::new("0x1", "kitty", 1, "1")];

        assert!(state.apply_snapshot(snapshot(windows.clone(), None), false));
        assert_eq!(state.display().ids(), vec!["kitty"]);

        // Same windows, not forced: no rebuild, so the highlight stays stale.
        assert!(!state.apply_snapshot(snapshot(windows.clone(), Some(0)), false));
        assert!(!state.display().items[0].is_active());

        assert!(state.apply_snapshot(snapshot(windows, Some(0)), true));
        assert!(state.display().items[0].is_active());
    }

    #[test]
    fn test_unforced_refresh_follows_moves_and_ghosts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.dock.ignored_workspaces = vec!["special".to_string()];
        let mut state = AppState::new(config, None);

        let kitty = WindowRecord::new("0x1", "kitty", 1, "1");
        let foot = WindowRecord::new("0x2", "foot", 1, "1");
        assert!(state.apply_snapshot(snapshot(vec![kitty, foot.clone()], None), true));
        assert_eq!(state.display().ids(), vec!["foot", "kitty"]);

        // kitty moves to an ignored workspace: same count, still rebuilt.
        let hidden_kitty = WindowRecord::new("0x1", "kitty", -98, "special:scratch");
        assert!(state.apply_snapshot(snapshot(vec![hidden_kitty.clone(), foot], None), false));
        assert_eq!(state.display().ids(), vec!["foot"]);

        // foot closes but lingers as a ghost record.
        let ghost = WindowRecord::new("0x2", "", 1, "1");
        assert!(state.apply_snapshot(snapshot(vec![hidden_kitty, ghost], None), false));
        assert!(state.display().is_empty());
    }

    #[test]
    fn test_rebuild_reloads_pins_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(test_config(dir.path()), None);
        state.apply_snapshot(Snapshot::default(), true);
        assert!(state.display().is_empty());

        std::fs::write(dir.path().join("pinned"), "firefox\n").unwrap();
        state.rebuild();
        assert_eq!(state.display().ids(), vec!["firefox"]);
    }

    #[test]
    fn test_activation_targets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pinned"), "firefox\nkitty\n").unwrap();
        let mut state = AppState::new(test_config(dir.path()), None);
        state.apply_snapshot(
            snapshot(
                vec![
                    WindowRecord::new("0xb", "kitty", 2, "2"),
                    WindowRecord::new("0xa", "kitty", 1, "1"),
                ],
                None,
            ),
            true,
        );

        assert_eq!(
            state.activation_for("firefox"),
            Some(Activation::Exec("firefox".to_string()))
        );
        // First instance in (workspace, class) order.
        assert_eq!(
            state.activation_for("kitty"),
            Some(Activation::Focus("0xa".to_string()))
        );
        assert_eq!(state.activation_for("gimp"), None);
    }

    #[test]
    fn test_activate_hides_autohide_dock() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.behavior.autohide = true;
        config.behavior.hotspot_delay_ms = 0;
        let mut state = AppState::new(config, None);
        state.apply_snapshot(snapshot(vec![WindowRecord::new("0x1", "kitty", 1, "1")], None), true);

        let shown = state.handle_surface(&SurfaceEvent::HotspotEnter, 100);
        assert_eq!(shown.effects, vec![VisibilityEffect::Show]);

        let reaction = state.handle_surface(
            &SurfaceEvent::Activate {
                id: "kitty".to_string(),
            },
            200,
        );
        assert_eq!(reaction.activation, Some(Activation::Focus("0x1".to_string())));
        assert_eq!(reaction.effects, vec![VisibilityEffect::Hide]);
    }

    #[test]
    fn test_activate_during_pending_hide_cancels_timer() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.behavior.autohide = true;
        config.behavior.hotspot_delay_ms = 0;
        let mut state = AppState::new(config, None);
        state.apply_snapshot(snapshot(vec![WindowRecord::new("0x1", "kitty", 1, "1")], None), true);
        state.handle_surface(&SurfaceEvent::HotspotEnter, 100);

        let timer = match state.handle_surface(&SurfaceEvent::Leave, 200).effects.as_slice() {
            [VisibilityEffect::ScheduleHide(timer)] => *timer,
            other => panic!("Expected a scheduled hide, got {:?}", other),
        };
        let reaction = state.handle_surface(
            &SurfaceEvent::Activate {
                id: "kitty".to_string(),
            },
            300,
        );
        assert_eq!(
            reaction.effects,
            vec![VisibilityEffect::CancelHide(timer), VisibilityEffect::Hide]
        );
        assert_eq!(state.hide_timer_fired(timer.id), None);
    }

    #[test]
    fn test_hotspot_timing_through_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.behavior.autohide = true;
        let mut state = AppState::new(config, None);
        assert_eq!(state.visibility().mode(), DockMode::Autohide);

        state.handle_surface(&SurfaceEvent::DetectorEnter, 1_000);
        assert!(state.handle_surface(&SurfaceEvent::HotspotEnter, 1_050).effects.is_empty());

        state.handle_surface(&SurfaceEvent::DetectorEnter, 2_000);
        assert_eq!(
            state.handle_surface(&SurfaceEvent::HotspotEnter, 2_010).effects,
            vec![VisibilityEffect::Show]
        );
    }

    #[test]
    fn test_launcher_activation() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Launcher {
            command: "nwg-drawer".to_string(),
            position: LauncherPosition::End,
        };
        let mut state = AppState::new(test_config(dir.path()), Some(launcher));
        let reaction = state.handle_surface(&SurfaceEvent::Launcher, 0);
        assert_eq!(
            reaction.activation,
            Some(Activation::Exec("nwg-drawer".to_string()))
        );

        let mut bare = AppState::new(test_config(dir.path()), None);
        assert_eq!(bare.handle_surface(&SurfaceEvent::Launcher, 0), Reaction::default());
    }

    #[test]
    fn test_pin_and_unpin_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(test_config(dir.path()), None);
        state.apply_snapshot(Snapshot::default(), true);

        let reaction = state.handle_surface(
            &SurfaceEvent::Pin {
                id: "firefox".to_string(),
            },
            0,
        );
        assert!(reaction.rerender);
        assert_eq!(state.display().ids(), vec!["firefox"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("pinned")).unwrap(),
            "firefox\n"
        );

        // Pinning twice changes nothing.
        let again = state.handle_surface(
            &SurfaceEvent::Pin {
                id: "firefox".to_string(),
            },
            0,
        );
        assert!(!again.rerender);

        state.handle_surface(
            &SurfaceEvent::Unpin {
                id: "firefox".to_string(),
            },
            0,
        );
        assert!(state.display().is_empty());
        assert!(state.pins().is_empty());
    }

    #[test]
    fn test_signals_map_to_requests() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.behavior.resident = true;
        let mut state = AppState::new(config, None);

        assert!(state.handle_signal(DockSignal::Show).is_empty());
        assert_eq!(state.handle_signal(DockSignal::Hide), vec![VisibilityEffect::Hide]);
        assert_eq!(
            state.handle_signal(DockSignal::LegacyToggle),
            vec![VisibilityEffect::Show]
        );
        assert!(state.handle_signal(DockSignal::Terminate).is_empty());
    }

    #[test]
    fn test_normal_mode_toggle_quits() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(test_config(dir.path()), None);
        assert!(state.handle_signal(DockSignal::Show).is_empty());
        assert_eq!(
            state.handle_signal(DockSignal::Toggle),
            vec![VisibilityEffect::Quit]
        );
    }
}
