//! Reconciliation of pins and live windows into the dock's button row.
//!
//! The display list puts pinned identifiers first, in pin order, followed by
//! running identifiers that are not pinned, in (workspace id, class) order.
//! Windows of the same class collapse into one button.

use crate::{PinStore, WindowRecord, WorkspaceFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of icons that fit before scaling kicks in.
const ICONS_BEFORE_SCALING: usize = 6;

/// Items beyond [`ICONS_BEFORE_SCALING`] per additional step of shrinking.
const ITEMS_PER_SCALE_STEP: usize = 3;

/// Where the launcher button goes in the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LauncherPosition {
    Start,
    #[default]
    End,
}

/// The launcher button configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Launcher {
    /// Command run when the launcher button is activated.
    pub command: String,
    /// Placement of the button.
    pub position: LauncherPosition,
}

impl Launcher {
    /// Windows whose class occurs in the launcher command belong to the
    /// launcher itself and get no button of their own.
    pub fn owns_class(&self, class: &str) -> bool {
        !class.is_empty() && self.command.contains(class)
    }
}

/// Read-only inputs to a rebuild besides pins and windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Workspaces whose windows are left out.
    pub ignored: WorkspaceFilter,
    /// Launcher button, if any.
    pub launcher: Option<Launcher>,
    /// Autohide docks never highlight the active button.
    pub autohide: bool,
    /// Icon size before scaling, in pixels.
    pub icon_size: u32,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            ignored: WorkspaceFilter::default(),
            launcher: None,
            autohide: false,
            icon_size: 48,
        }
    }
}

/// Button for an identifier with at least one running window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskButton {
    /// Application identifier (window class).
    pub id: String,
    /// All visible instances, in (workspace id, class) order.
    pub instances: Vec<WindowRecord>,
    /// Whether the focused window belongs to this button.
    pub active: bool,
}

impl TaskButton {
    /// The window a plain click on the button targets.
    pub fn primary(&self) -> Option<&WindowRecord> {
        self.instances.first()
    }

    /// Per-instance menu, present only for multi-instance applications.
    pub fn instance_menu(&self) -> Option<InstanceMenu> {
        if self.instances.len() < 2 {
            return None;
        }
        Some(InstanceMenu {
            class: self.id.clone(),
            addresses: self.instances.iter().map(|w| w.address.clone()).collect(),
        })
    }
}

/// Menu listing every instance of a class for targeted activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMenu {
    pub class: String,
    pub addresses: Vec<String>,
}

/// One entry of the dock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayItem {
    /// The launcher button.
    Launcher { command: String },
    /// Pinned identifier without a running window.
    Pinned { id: String },
    /// Pinned identifier with running windows.
    PinnedRunning(TaskButton),
    /// Running identifier that is not pinned.
    Running(TaskButton),
}

impl DisplayItem {
    /// Identifier of the item; `None` for the launcher.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Launcher { .. } => None,
            Self::Pinned { id } => Some(id),
            Self::PinnedRunning(task) | Self::Running(task) => Some(&task.id),
        }
    }

    pub fn task(&self) -> Option<&TaskButton> {
        match self {
            Self::PinnedRunning(task) | Self::Running(task) => Some(task),
            _ => None,
        }
    }

    pub fn instance_count(&self) -> usize {
        self.task().map_or(0, |t| t.instances.len())
    }

    pub fn is_active(&self) -> bool {
        self.task().is_some_and(|t| t.active)
    }
}

/// Result of one rebuild: the ordered row and the shared icon size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayList {
    pub items: Vec<DisplayItem>,
    pub icon_size: u32,
}

impl DisplayList {
    /// Find the item for an identifier.
    pub fn get(&self, id: &str) -> Option<&DisplayItem> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Identifiers in display order, launcher excluded.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().filter_map(DisplayItem::id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Icon size shared by all buttons for a row of `item_count` identifiers.
///
/// Rows of up to six items keep the base size; beyond that the size
/// shrinks by one step per three extra items.
pub fn scaled_icon_size(base: u32, item_count: usize) -> u32 {
    let base_wide = base as usize;
    let divider = item_count.max(1);
    if base_wide * ICONS_BEFORE_SCALING / divider < base_wide {
        let overflow = (item_count - ICONS_BEFORE_SCALING) / ITEMS_PER_SCALE_STEP;
        (base_wide * ICONS_BEFORE_SCALING / (ICONS_BEFORE_SCALING + overflow)) as u32
    } else {
        base
    }
}

/// Visible instances of `id`: non-ghost windows of that class outside the
/// ignored workspaces.
pub fn instances_of<'a>(
    id: &str,
    windows: &'a [WindowRecord],
    ignored: &WorkspaceFilter,
) -> Vec<&'a WindowRecord> {
    windows
        .iter()
        .filter(|w| !w.is_ghost() && w.class == id && !ignored.ignores_window(w))
        .collect()
}

/// Merge pins and the window snapshot into the ordered display list.
pub fn build_display_list(
    pins: &PinStore,
    windows: &[WindowRecord],
    active: Option<&WindowRecord>,
    options: &ReconcileOptions,
) -> DisplayList {
    let mut visible: Vec<&WindowRecord> = windows
        .iter()
        .filter(|w| !w.is_ghost() && !options.ignored.ignores_window(w))
        .collect();
    visible.sort_by(|a, b| {
        a.workspace_id
            .cmp(&b.workspace_id)
            .then_with(|| a.class.cmp(&b.class))
    });

    let mut seen: HashSet<&str> = HashSet::new();
    let mut universe: Vec<&str> = Vec::new();
    for pin in pins.iter() {
        if seen.insert(pin) {
            universe.push(pin);
        }
    }
    for window in &visible {
        let owned_by_launcher = options
            .launcher
            .as_ref()
            .is_some_and(|l| l.owns_class(&window.class));
        if !owned_by_launcher && seen.insert(window.class.as_str()) {
            universe.push(window.class.as_str());
        }
    }

    let icon_size = scaled_icon_size(options.icon_size, universe.len());

    let active_class = active
        .filter(|w| !options.autohide && !w.is_ghost() && !options.ignored.ignores_window(w))
        .map(|w| w.class.as_str());

    let mut items = Vec::with_capacity(universe.len() + 1);
    let launcher_item = options.launcher.as_ref().map(|l| DisplayItem::Launcher {
        command: l.command.clone(),
    });

    if let (Some(item), Some(LauncherPosition::Start)) = (
        launcher_item.as_ref(),
        options.launcher.as_ref().map(|l| l.position),
    ) {
        items.push(item.clone());
    }

    for id in universe {
        let instances: Vec<WindowRecord> = visible
            .iter()
            .filter(|w| w.class == id)
            .map(|w| (*w).clone())
            .collect();
        let pinned = pins.contains(id);

        if instances.is_empty() {
            items.push(DisplayItem::Pinned { id: id.to_string() });
            continue;
        }

        let task = TaskButton {
            id: id.to_string(),
            instances,
            active: active_class == Some(id),
        };
        items.push(if pinned {
            DisplayItem::PinnedRunning(task)
        } else {
            DisplayItem::Running(task)
        });
    }

    if let (Some(item), Some(LauncherPosition::End)) = (
        launcher_item,
        options.launcher.as_ref().map(|l| l.position),
    ) {
        items.push(item);
    }

    DisplayList { items, icon_size }
}
