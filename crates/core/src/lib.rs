//! hyprdock Core Engine
//!
//! Compositor-agnostic model of the dock: which application windows exist,
//! which identifiers are pinned, which window is active, and whether the
//! dock is currently shown.
//!
//! This crate performs no socket I/O. The daemon feeds it full window-list
//! snapshots and consumes the reconciled display list and visibility effects:
//! - Window snapshots are replaced wholesale, never patched
//! - Reconciliation is a pure function of pins, snapshot and options
//! - Visibility is a small state machine returning effects for the caller to run

pub mod pins;
pub mod reconcile;
pub mod visibility;

pub use pins::{PinStore, PinStoreError};
pub use reconcile::{
    build_display_list, instances_of, scaled_icon_size, DisplayItem, DisplayList, InstanceMenu,
    Launcher, LauncherPosition, ReconcileOptions, TaskButton,
};
pub use visibility::{
    DockMode, HideTimer, Visibility, VisibilityController, VisibilityEffect, VisibilityRequest,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single application window as reported by the compositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Opaque window address, always in `0x…` form.
    pub address: String,
    /// Application identifier. Empty for ghost entries of closing windows.
    pub class: String,
    /// Numeric workspace id.
    pub workspace_id: i64,
    /// Workspace name, e.g. `"3"` or `"special:scratch"`.
    pub workspace_name: String,
    /// Window title.
    #[serde(default)]
    pub title: String,
    /// Owning process id, if known.
    #[serde(default)]
    pub pid: Option<i64>,
}

impl WindowRecord {
    /// Create a record with the fields the reconciler cares about.
    pub fn new(
        address: impl AsRef<str>,
        class: impl Into<String>,
        workspace_id: i64,
        workspace_name: impl Into<String>,
    ) -> Self {
        Self {
            address: normalize_address(address.as_ref()),
            class: class.into(),
            workspace_id,
            workspace_name: workspace_name.into(),
            title: String::new(),
            pid: None,
        }
    }

    /// Ghost records are left behind for a while after a window closes.
    pub fn is_ghost(&self) -> bool {
        self.class.is_empty()
    }
}

/// Bring an address into the `0x…` form used by the client list.
///
/// The event stream reports addresses without the prefix.
pub fn normalize_address(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    format!("0x{}", hex.to_ascii_lowercase())
}

/// Set of workspaces whose windows the dock ignores.
///
/// Entries match either the numeric workspace id or the part of the
/// workspace name in front of the first `:`, so `special` covers
/// `special:scratch_term`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceFilter {
    entries: BTreeSet<String>,
}

impl WorkspaceFilter {
    /// Build a filter from explicit entries. Blank entries are dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Parse a comma-separated list such as `"special,10"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Check whether a window on this workspace is hidden from the dock.
    pub fn ignores(&self, workspace_id: i64, workspace_name: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let prefix = workspace_name
            .split_once(':')
            .map(|(head, _)| head)
            .unwrap_or(workspace_name);
        self.entries.contains(&workspace_id.to_string()) || self.entries.contains(prefix)
    }

    /// Convenience wrapper over [`WorkspaceFilter::ignores`].
    pub fn ignores_window(&self, window: &WindowRecord) -> bool {
        self.ignores(window.workspace_id, &window.workspace_name)
    }
}

/// Identity of a visible window as far as the button row is concerned.
type WindowKey = (String, String, i64, String);

fn visible_keys(windows: &[WindowRecord]) -> Vec<WindowKey> {
    let mut keys: Vec<WindowKey> = windows
        .iter()
        .filter(|w| !w.is_ghost())
        .map(|w| {
            (
                w.address.clone(),
                w.class.clone(),
                w.workspace_id,
                w.workspace_name.clone(),
            )
        })
        .collect();
    keys.sort();
    keys
}

/// Latest window-list snapshot plus the active window.
///
/// Every refresh replaces the whole snapshot. The set of visible windows
/// (address, class, workspace) of the previous snapshot is kept so callers
/// can skip rebuilds when a non-forced trigger changed nothing the row
/// depends on. Ghost records and title changes do not count.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    windows: Vec<WindowRecord>,
    active: Option<WindowRecord>,
    populated: bool,
    keys: Vec<WindowKey>,
    previous_keys: Option<Vec<WindowKey>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot and active window.
    pub fn replace(&mut self, windows: Vec<WindowRecord>, active: Option<WindowRecord>) {
        let previous = std::mem::replace(&mut self.keys, visible_keys(&windows));
        self.previous_keys = self.populated.then_some(previous);
        self.populated = true;
        self.windows = windows;
        self.active = active.filter(|w| !w.is_ghost());
    }

    pub fn windows(&self) -> &[WindowRecord] {
        &self.windows
    }

    pub fn active(&self) -> Option<&WindowRecord> {
        self.active.as_ref()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Whether the last replacement changed the visible window set: a
    /// window opened, closed (or turned into a ghost) or moved workspace.
    ///
    /// The very first snapshot always counts as a change.
    pub fn visible_changed(&self) -> bool {
        self.previous_keys.as_ref() != Some(&self.keys)
    }

    /// Look up a window by address (either address form is accepted).
    pub fn find(&self, address: &str) -> Option<&WindowRecord> {
        let address = normalize_address(address);
        self.windows.iter().find(|w| w.address == address)
    }
}
