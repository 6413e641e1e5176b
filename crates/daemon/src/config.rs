//! Configuration management for the hyprdock daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. `<config dir>/hyprdock/config.toml` (XDG standard)
//! 2. `~/.config/hyprdock/config.toml`
//! 3. `./config.toml` (current directory, for development)
//!
//! Command-line flags are applied on top of the file.

use anyhow::{Context, Result};
use clap::Parser;
use directories::{BaseDirs, ProjectDirs};
use hyprdock_core::{DockMode, Launcher, LauncherPosition, ReconcileOptions, WorkspaceFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Launchers tried, in order, when none is configured.
const LAUNCHER_CANDIDATES: &[(&str, &str)] = &[("nwg-drawer", "nwg-drawer"), ("nwggrid", "nwggrid -p")];

/// File name of the pin file inside the cache directory.
const PINNED_FILE_NAME: &str = "hyprdock-pinned";

const MIN_ICON_SIZE: u32 = 8;
const MAX_ICON_SIZE: u32 = 256;

/// Main configuration structure for hyprdock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dock contents.
    pub dock: DockConfig,
    /// Show/hide behavior and logging.
    pub behavior: BehaviorConfig,
}

/// Dock-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockConfig {
    /// Icon size in pixels before scaling.
    #[serde(default = "default_icon_size")]
    pub icon_size: u32,

    /// Command run by the launcher button. Detected when unset.
    pub launcher_command: Option<String>,

    /// Placement of the launcher button.
    pub launcher_position: LauncherPosition,

    /// Do not show a launcher button at all.
    pub no_launcher: bool,

    /// Workspace ids or names whose windows are left out.
    pub ignored_workspaces: Vec<String>,

    /// Output (monitor) name the surface should place the dock on.
    pub output: Option<String>,

    /// Pin file location. Defaults to the user cache directory.
    pub pinned_file: Option<PathBuf>,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            icon_size: default_icon_size(),
            launcher_command: None,
            launcher_position: LauncherPosition::default(),
            no_launcher: false,
            ignored_workspaces: Vec::new(),
            output: None,
            pinned_file: None,
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Hide the dock until the pointer reaches the hotspot.
    pub autohide: bool,

    /// Keep running hidden and only react to signals.
    pub resident: bool,

    /// Maximum time in milliseconds between crossing the detector strip and
    /// reaching the hotspot. 0 disables the check.
    #[serde(default = "default_hotspot_delay")]
    pub hotspot_delay_ms: u64,

    /// Delay in milliseconds between the pointer leaving the dock and the
    /// dock hiding.
    #[serde(default = "default_hide_delay")]
    pub hide_delay_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            autohide: false,
            resident: false,
            hotspot_delay_ms: default_hotspot_delay(),
            hide_delay_ms: default_hide_delay(),
            log_level: default_log_level(),
        }
    }
}

// Default value functions for serde
fn default_icon_size() -> u32 {
    48
}

fn default_hotspot_delay() -> u64 {
    20
}

fn default_hide_delay() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A configuration value that was corrected during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load from an explicit path if given, the standard locations otherwise.
    pub fn load_with(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp and normalize values, reporting every correction.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.dock.icon_size < MIN_ICON_SIZE || self.dock.icon_size > MAX_ICON_SIZE {
            let clamped = self.dock.icon_size.clamp(MIN_ICON_SIZE, MAX_ICON_SIZE);
            warnings.push(ConfigWarning::new(
                "dock.icon_size",
                format!(
                    "{} is outside {}..={}, using {}",
                    self.dock.icon_size, MIN_ICON_SIZE, MAX_ICON_SIZE, clamped
                ),
            ));
            self.dock.icon_size = clamped;
        }

        let before = self.dock.ignored_workspaces.len();
        self.dock.ignored_workspaces = self
            .dock
            .ignored_workspaces
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if self.dock.ignored_workspaces.len() != before {
            warnings.push(ConfigWarning::new(
                "dock.ignored_workspaces",
                format!(
                    "dropped {} blank entries",
                    before - self.dock.ignored_workspaces.len()
                ),
            ));
        }

        if self
            .dock
            .launcher_command
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            warnings.push(ConfigWarning::new(
                "dock.launcher_command",
                "empty command, falling back to detection",
            ));
            self.dock.launcher_command = None;
        }

        if self.behavior.autohide && self.behavior.resident {
            warnings.push(ConfigWarning::new(
                "behavior.autohide",
                "autohide and resident are mutually exclusive, autohide disabled",
            ));
            self.behavior.autohide = false;
        }

        if self.behavior.hide_delay_ms == 0 {
            warnings.push(ConfigWarning::new(
                "behavior.hide_delay_ms",
                format!("0 would hide the dock instantly, using {}", default_hide_delay()),
            ));
            self.behavior.hide_delay_ms = default_hide_delay();
        }

        let level = self.behavior.log_level.to_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        warnings
    }

    /// The process mode. Resident wins over autohide.
    pub fn dock_mode(&self) -> DockMode {
        DockMode::from_flags(self.behavior.autohide, self.behavior.resident)
    }

    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.behavior.hide_delay_ms)
    }

    pub fn workspace_filter(&self) -> WorkspaceFilter {
        WorkspaceFilter::new(&self.dock.ignored_workspaces)
    }

    /// Where pins are read from and written to.
    pub fn pins_path(&self) -> PathBuf {
        self.dock
            .pinned_file
            .clone()
            .unwrap_or_else(default_pins_path)
    }

    /// The launcher button, detecting an installed launcher if none is set.
    pub fn resolve_launcher(&self) -> Option<Launcher> {
        self.resolve_launcher_with(|program| which::which(program).is_ok())
    }

    /// [`Config::resolve_launcher`] with a custom program lookup.
    pub fn resolve_launcher_with(&self, installed: impl Fn(&str) -> bool) -> Option<Launcher> {
        if self.dock.no_launcher {
            return None;
        }
        let command = match &self.dock.launcher_command {
            Some(command) => command.clone(),
            None => {
                let detected = LAUNCHER_CANDIDATES
                    .iter()
                    .find(|(program, _)| installed(program))
                    .map(|(_, command)| command.to_string());
                match detected {
                    Some(command) => {
                        tracing::debug!("Detected launcher: {}", command);
                        command
                    }
                    None => {
                        tracing::info!("No launcher found (tried nwg-drawer, nwggrid), launcher button disabled");
                        return None;
                    }
                }
            }
        };
        Some(Launcher {
            command,
            position: self.dock.launcher_position,
        })
    }

    /// Inputs to the reconciler derived from this config.
    pub fn reconcile_options(&self, launcher: Option<Launcher>) -> ReconcileOptions {
        ReconcileOptions {
            ignored: self.workspace_filter(),
            launcher,
            autohide: self.dock_mode() == DockMode::Autohide,
            icon_size: self.dock.icon_size,
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. XDG standard: $XDG_CONFIG_HOME/hyprdock/config.toml
    if let Some(proj_dirs) = ProjectDirs::from("", "", "hyprdock") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. ~/.config/hyprdock/config.toml
    if let Some(home) = dirs_home() {
        let path = home.join(".config").join("hyprdock").join("config.toml");
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    // 3. Current directory: ./config.toml
    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Default pin file: `hyprdock-pinned` in the user cache directory.
pub fn default_pins_path() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.cache_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
        .join(PINNED_FILE_NAME)
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_launcher_position(value: &str) -> Result<LauncherPosition, String> {
    match value.to_lowercase().as_str() {
        "start" => Ok(LauncherPosition::Start),
        "end" => Ok(LauncherPosition::End),
        other => Err(format!("expected 'start' or 'end', got '{}'", other)),
    }
}

/// Command-line flags. Every flag overrides the matching config value.
#[derive(Debug, Default, Parser)]
#[command(name = "hyprdock")]
#[command(about = "Taskbar/dock for the Hyprland compositor")]
#[command(version)]
pub struct Cli {
    /// Icon size in pixels
    #[arg(short = 'i', long = "icon-size")]
    pub icon_size: Option<u32>,

    /// Hotspot delay in ms; the smaller, the faster the pointer must reach the edge
    #[arg(long = "hd")]
    pub hotspot_delay: Option<u64>,

    /// Comma-separated workspace ids or names to ignore
    #[arg(long = "iw")]
    pub ignore_workspaces: Option<String>,

    /// Auto-hide: show the dock when the pointer reaches the screen edge
    #[arg(short = 'd', long)]
    pub autohide: bool,

    /// Leave the program resident, only show/hide on signals
    #[arg(short = 'r', long)]
    pub resident: bool,

    /// Command assigned to the launcher button
    #[arg(short = 'c', long = "launcher-cmd")]
    pub launcher_command: Option<String>,

    /// Launcher button position: start or end
    #[arg(long = "lp", value_parser = parse_launcher_position)]
    pub launcher_position: Option<LauncherPosition>,

    /// Do not show the launcher button
    #[arg(long = "nolauncher")]
    pub no_launcher: bool,

    /// Name of the output to display the dock on
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Path to a config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Turn on debug messages
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Overlay the flags onto a loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(size) = self.icon_size {
            config.dock.icon_size = size;
        }
        if let Some(delay) = self.hotspot_delay {
            config.behavior.hotspot_delay_ms = delay;
        }
        if let Some(list) = &self.ignore_workspaces {
            config.dock.ignored_workspaces = list.split(',').map(str::to_string).collect();
        }
        if self.autohide {
            config.behavior.autohide = true;
        }
        if self.resident {
            config.behavior.resident = true;
        }
        if let Some(command) = &self.launcher_command {
            config.dock.launcher_command = Some(command.clone());
        }
        if let Some(position) = self.launcher_position {
            config.dock.launcher_position = position;
        }
        if self.no_launcher {
            config.dock.no_launcher = true;
        }
        if let Some(output) = &self.output {
            config.dock.output = Some(output.clone());
        }
        if self.debug {
            config.behavior.log_level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dock.icon_size, 48);
        assert_eq!(config.dock.launcher_position, LauncherPosition::End);
        assert!(!config.dock.no_launcher);
        assert!(config.dock.ignored_workspaces.is_empty());
        assert_eq!(config.behavior.hotspot_delay_ms, 20);
        assert_eq!(config.behavior.hide_delay_ms, 1000);
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.dock_mode(), DockMode::Normal);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.dock.icon_size, config.dock.icon_size);
        assert_eq!(parsed.behavior.hide_delay_ms, config.behavior.hide_delay_ms);
    }

    #[test]
    fn test_config_partial_parse() {
        // Config with only some fields should use defaults for the rest
        let toml_str = r#"
            [dock]
            icon_size = 32
            ignored_workspaces = ["special", "10"]
            launcher_position = "start"

            [behavior]
            autohide = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dock.icon_size, 32);
        assert_eq!(config.dock.launcher_position, LauncherPosition::Start);
        assert_eq!(config.behavior.hotspot_delay_ms, 20); // default
        assert_eq!(config.dock_mode(), DockMode::Autohide);

        let filter = config.workspace_filter();
        assert!(filter.ignores(42, "special:scratch"));
        assert!(filter.ignores(10, "10"));
        assert!(!filter.ignores(1, "1"));
    }

    #[test]
    fn test_config_paths_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths.last(), Some(&PathBuf::from("config.toml")));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[dock]\nno_launcher = true\n").unwrap();
        let config = Config::load_with(Some(&path)).unwrap();
        assert!(config.dock.no_launcher);

        assert!(Config::load_with(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[dock\nicon_size = ").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn test_validate_clean_config_has_no_warnings() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_resident_wins_over_autohide() {
        let mut config = Config::default();
        config.behavior.autohide = true;
        config.behavior.resident = true;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "behavior.autohide");
        assert_eq!(config.dock_mode(), DockMode::Resident);
    }

    #[test]
    fn test_validate_clamps_and_normalizes() {
        let mut config = Config::default();
        config.dock.icon_size = 1000;
        config.dock.ignored_workspaces = vec![" special ".into(), "".into(), "  ".into()];
        config.dock.launcher_command = Some("   ".into());
        config.behavior.hide_delay_ms = 0;
        config.behavior.log_level = "loud".into();

        let warnings = config.validate();
        let fields: Vec<_> = warnings.iter().map(|w| w.field).collect();
        assert_eq!(
            fields,
            vec![
                "dock.icon_size",
                "dock.ignored_workspaces",
                "dock.launcher_command",
                "behavior.hide_delay_ms",
                "behavior.log_level",
            ]
        );
        assert_eq!(config.dock.icon_size, MAX_ICON_SIZE);
        assert_eq!(config.dock.ignored_workspaces, vec!["special".to_string()]);
        assert_eq!(config.dock.launcher_command, None);
        assert_eq!(config.behavior.hide_delay_ms, 1000);
        assert_eq!(config.behavior.log_level, "info");
    }

    #[test]
    fn test_resolve_launcher_detection_order() {
        let config = Config::default();
        let launcher = config
            .resolve_launcher_with(|p| p == "nwg-drawer" || p == "nwggrid")
            .unwrap();
        assert_eq!(launcher.command, "nwg-drawer");

        let launcher = config.resolve_launcher_with(|p| p == "nwggrid").unwrap();
        assert_eq!(launcher.command, "nwggrid -p");

        assert!(config.resolve_launcher_with(|_| false).is_none());
    }

    #[test]
    fn test_resolve_launcher_explicit_and_disabled() {
        let mut config = Config::default();
        config.dock.launcher_command = Some("wofi --show drun".into());
        config.dock.launcher_position = LauncherPosition::Start;
        let launcher = config.resolve_launcher_with(|_| false).unwrap();
        assert_eq!(launcher.command, "wofi --show drun");
        assert_eq!(launcher.position, LauncherPosition::Start);

        config.dock.no_launcher = true;
        assert!(config.resolve_launcher_with(|_| true).is_none());
    }

    #[test]
    fn test_pins_path_override() {
        let mut config = Config::default();
        assert!(config.pins_path().ends_with(PINNED_FILE_NAME));
        config.dock.pinned_file = Some(PathBuf::from("/tmp/my-pins"));
        assert_eq!(config.pins_path(), PathBuf::from("/tmp/my-pins"));
    }

    #[test]
    fn test_reconcile_options_autohide_only_in_autohide_mode() {
        let mut config = Config::default();
        config.behavior.autohide = true;
        assert!(config.reconcile_options(None).autohide);
        config.behavior.resident = true;
        assert!(!config.reconcile_options(None).autohide);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "hyprdock", "-i", "32", "--hd", "0", "--iw", "special,10", "-d", "-c", "fuzzel",
            "--lp", "start", "-o", "DP-1", "--debug",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.dock.icon_size, 32);
        assert_eq!(config.behavior.hotspot_delay_ms, 0);
        assert_eq!(config.dock.ignored_workspaces, vec!["special", "10"]);
        assert!(config.behavior.autohide);
        assert_eq!(config.dock.launcher_command.as_deref(), Some("fuzzel"));
        assert_eq!(config.dock.launcher_position, LauncherPosition::Start);
        assert_eq!(config.dock.output.as_deref(), Some("DP-1"));
        assert_eq!(config.behavior.log_level, "debug");
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::parse_from(["hyprdock"]);
        let mut config = Config::default();
        config.dock.icon_size = 64;
        config.behavior.resident = true;
        cli.apply(&mut config);
        assert_eq!(config.dock.icon_size, 64);
        assert!(config.behavior.resident);
    }

    #[test]
    fn test_cli_rejects_bad_launcher_position() {
        assert!(Cli::try_parse_from(["hyprdock", "--lp", "middle"]).is_err());
    }
}
