//! Show/hide state machine.
//!
//! The controller never touches a clock or a surface. Callers pass in
//! pointer timestamps and run the returned [`VisibilityEffect`]s: show or
//! hide the dock, start or cancel the hide timer, or quit.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default delay between the pointer leaving the dock and the dock hiding.
pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_millis(1000);

/// How the dock process behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockMode {
    /// Shown when the hotspot is hovered, hidden when the pointer leaves.
    Autohide,
    /// Stays running; only signals show or hide it.
    Resident,
    /// Plain dock. A toggle request closes it.
    Normal,
}

impl DockMode {
    /// Resolve the mode from the two command-line switches. Resident wins.
    pub fn from_flags(autohide: bool, resident: bool) -> Self {
        match (autohide, resident) {
            (_, true) => Self::Resident,
            (true, false) => Self::Autohide,
            (false, false) => Self::Normal,
        }
    }

    /// Whether this mode keeps a show/hide state machine at all.
    pub fn is_persistent(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Hidden,
    Visible,
}

/// External show/hide request, e.g. from a process signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityRequest {
    Show,
    Hide,
    Toggle,
}

/// Handle of a scheduled hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideTimer {
    pub id: u64,
    pub delay: Duration,
}

/// Work the caller must carry out after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityEffect {
    Show,
    Hide,
    ScheduleHide(HideTimer),
    CancelHide(HideTimer),
    Quit,
}

#[derive(Debug, Clone)]
pub struct VisibilityController {
    mode: DockMode,
    state: Visibility,
    hotspot_delay_ms: i64,
    hide_delay: Duration,
    detector_entered_at: Option<i64>,
    pending_hide: Option<HideTimer>,
    next_timer_id: u64,
}

impl VisibilityController {
    /// Create a controller. Autohide docks start hidden, all others visible.
    ///
    /// A `hotspot_delay_ms` of 0 disables the hotspot speed check.
    pub fn new(mode: DockMode, hotspot_delay_ms: u64, hide_delay: Duration) -> Self {
        let state = match mode {
            DockMode::Autohide => Visibility::Hidden,
            DockMode::Resident | DockMode::Normal => Visibility::Visible,
        };
        Self {
            mode,
            state,
            hotspot_delay_ms: i64::try_from(hotspot_delay_ms).unwrap_or(i64::MAX),
            hide_delay,
            detector_entered_at: None,
            pending_hide: None,
            next_timer_id: 1,
        }
    }

    pub fn mode(&self) -> DockMode {
        self.mode
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state == Visibility::Visible
    }

    pub fn pending_hide(&self) -> Option<HideTimer> {
        self.pending_hide
    }

    /// The pointer entered the detector strip next to the hotspot.
    pub fn detector_enter(&mut self, at_ms: i64) {
        self.detector_entered_at = Some(at_ms);
    }

    /// The pointer reached the hotspot at the screen edge.
    ///
    /// The dock appears only if the pointer crossed the detector quickly
    /// enough, which filters out slow drifts along the screen edge.
    pub fn hotspot_enter(&mut self, at_ms: i64) -> Option<VisibilityEffect> {
        if self.mode != DockMode::Autohide {
            return None;
        }
        let fast_enough = if self.hotspot_delay_ms == 0 {
            true
        } else {
            match self.detector_entered_at {
                Some(detector_at) => at_ms.saturating_sub(detector_at) <= self.hotspot_delay_ms,
                None => false,
            }
        };
        if !fast_enough {
            debug!(
                "Hotspot crossed too slowly (limit {} ms), not showing",
                self.hotspot_delay_ms
            );
            return None;
        }
        self.show()
    }

    /// The pointer left the dock surface.
    pub fn pointer_leave(&mut self) -> Option<VisibilityEffect> {
        if self.mode != DockMode::Autohide || self.state != Visibility::Visible {
            return None;
        }
        if self.pending_hide.is_some() {
            return None;
        }
        let timer = HideTimer {
            id: self.next_timer_id,
            delay: self.hide_delay,
        };
        self.next_timer_id += 1;
        self.pending_hide = Some(timer);
        Some(VisibilityEffect::ScheduleHide(timer))
    }

    /// The pointer entered the dock surface.
    pub fn pointer_enter(&mut self) -> Option<VisibilityEffect> {
        self.pending_hide.take().map(VisibilityEffect::CancelHide)
    }

    /// A hide timer elapsed. Stale or cancelled timers are ignored.
    pub fn hide_timer_fired(&mut self, id: u64) -> Option<VisibilityEffect> {
        match self.pending_hide {
            Some(timer) if timer.id == id => {
                self.pending_hide = None;
                self.hide()
            }
            _ => {
                debug!("Ignoring stale hide timer {}", id);
                None
            }
        }
    }

    /// A dock button was activated. Autohide docks get out of the way.
    pub fn activated(&mut self) -> Vec<VisibilityEffect> {
        if self.mode != DockMode::Autohide {
            return Vec::new();
        }
        self.hide_now()
    }

    /// Handle an external show/hide/toggle request.
    pub fn request(&mut self, request: VisibilityRequest) -> Vec<VisibilityEffect> {
        if !self.mode.is_persistent() {
            return match request {
                VisibilityRequest::Toggle => vec![VisibilityEffect::Quit],
                VisibilityRequest::Show | VisibilityRequest::Hide => {
                    debug!("{:?} request ignored, dock is not resident", request);
                    Vec::new()
                }
            };
        }
        match (request, self.state) {
            (VisibilityRequest::Show, Visibility::Visible) => {
                debug!("Show request ignored, dock already visible");
                Vec::new()
            }
            (VisibilityRequest::Hide, Visibility::Hidden) => {
                debug!("Hide request ignored, dock already hidden");
                Vec::new()
            }
            (VisibilityRequest::Show, Visibility::Hidden)
            | (VisibilityRequest::Toggle, Visibility::Hidden) => self.show().into_iter().collect(),
            (VisibilityRequest::Hide, Visibility::Visible)
            | (VisibilityRequest::Toggle, Visibility::Visible) => self.hide_now(),
        }
    }

    /// Hide immediately. A pending hide timer is cancelled first so the
    /// caller can abort it.
    fn hide_now(&mut self) -> Vec<VisibilityEffect> {
        let mut effects: Vec<VisibilityEffect> = self
            .pending_hide
            .take()
            .map(VisibilityEffect::CancelHide)
            .into_iter()
            .collect();
        effects.extend(self.hide());
        effects
    }

    fn show(&mut self) -> Option<VisibilityEffect> {
        if self.state == Visibility::Visible {
            return None;
        }
        self.state = Visibility::Visible;
        Some(VisibilityEffect::Show)
    }

    fn hide(&mut self) -> Option<VisibilityEffect> {
        if self.state == Visibility::Hidden {
            return None;
        }
        self.state = Visibility::Hidden;
        Some(VisibilityEffect::Hide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn autohide(delay_ms: u64) -> VisibilityController {
        VisibilityController::new(DockMode::Autohide, delay_ms, DEFAULT_HIDE_DELAY)
    }

    fn shown_autohide() -> VisibilityController {
        let mut ctl = autohide(0);
        assert_eq!(ctl.hotspot_enter(0), Some(VisibilityEffect::Show));
        ctl
    }

    #[test]
    fn test_initial_states() {
        assert_eq!(autohide(20).state(), Visibility::Hidden);
        let resident = VisibilityController::new(DockMode::Resident, 20, DEFAULT_HIDE_DELAY);
        assert_eq!(resident.state(), Visibility::Visible);
        let normal = VisibilityController::new(DockMode::Normal, 20, DEFAULT_HIDE_DELAY);
        assert_eq!(normal.state(), Visibility::Visible);
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(DockMode::from_flags(true, false), DockMode::Autohide);
        assert_eq!(DockMode::from_flags(false, true), DockMode::Resident);
        assert_eq!(DockMode::from_flags(true, true), DockMode::Resident);
        assert_eq!(DockMode::from_flags(false, false), DockMode::Normal);
    }

    #[test]
    fn test_hotspot_too_slow() {
        let mut ctl = autohide(20);
        ctl.detector_enter(-25);
        assert_eq!(ctl.hotspot_enter(0), None);
        assert_eq!(ctl.state(), Visibility::Hidden);
    }

    #[test]
    fn test_hotspot_fast_enough() {
        let mut ctl = autohide(30);
        ctl.detector_enter(-25);
        assert_eq!(ctl.hotspot_enter(0), Some(VisibilityEffect::Show));
        assert!(ctl.is_visible());
    }

    #[test]
    fn test_hotspot_delay_boundary_is_inclusive() {
        let mut ctl = autohide(25);
        ctl.detector_enter(100);
        assert_eq!(ctl.hotspot_enter(125), Some(VisibilityEffect::Show));
    }

    #[test]
    fn test_hotspot_without_detector_needs_zero_delay() {
        let mut ctl = autohide(20);
        assert_eq!(ctl.hotspot_enter(500), None);

        let mut ctl = autohide(0);
        assert_eq!(ctl.hotspot_enter(500), Some(VisibilityEffect::Show));
    }

    #[test]
    fn test_hotspot_ignored_outside_autohide() {
        let mut ctl = VisibilityController::new(DockMode::Resident, 0, DEFAULT_HIDE_DELAY);
        assert_eq!(ctl.request(VisibilityRequest::Hide), vec![VisibilityEffect::Hide]);
        assert_eq!(ctl.hotspot_enter(0), None);
        assert_eq!(ctl.state(), Visibility::Hidden);
    }

    #[test]
    fn test_leave_then_timer_hides() {
        let mut ctl = shown_autohide();
        let timer = match ctl.pointer_leave() {
            Some(VisibilityEffect::ScheduleHide(timer)) => timer,
            other => panic!("Expected ScheduleHide, got {:?}", other),
        };
        assert_eq!(timer.delay, DEFAULT_HIDE_DELAY);
        assert_eq!(ctl.hide_timer_fired(timer.id), Some(VisibilityEffect::Hide));
        assert_eq!(ctl.state(), Visibility::Hidden);
        assert!(ctl.pending_hide().is_none());
    }

    #[test]
    fn test_reenter_cancels_hide() {
        // Leave, then come back 200 ms later, well inside the 1000 ms delay.
        let mut ctl = shown_autohide();
        let timer = match ctl.pointer_leave() {
            Some(VisibilityEffect::ScheduleHide(timer)) => timer,
            other => panic!("Expected ScheduleHide, got {:?}", other),
        };
        assert_eq!(ctl.pointer_enter(), Some(VisibilityEffect::CancelHide(timer)));
        assert_eq!(ctl.hide_timer_fired(timer.id), None);
        assert_eq!(ctl.state(), Visibility::Visible);
    }

    #[test]
    fn test_single_outstanding_timer() {
        let mut ctl = shown_autohide();
        assert!(matches!(ctl.pointer_leave(), Some(VisibilityEffect::ScheduleHide(_))));
        assert_eq!(ctl.pointer_leave(), None);
    }

    #[test]
    fn test_new_timer_after_cancel_gets_new_id() {
        let mut ctl = shown_autohide();
        let first = ctl.pointer_leave();
        ctl.pointer_enter();
        let second = ctl.pointer_leave();
        assert_ne!(first, second);

        let old_id = match first {
            Some(VisibilityEffect::ScheduleHide(timer)) => timer.id,
            other => panic!("Expected ScheduleHide, got {:?}", other),
        };
        assert_eq!(ctl.hide_timer_fired(old_id), None);
        assert!(ctl.is_visible());
    }

    #[test]
    fn test_leave_ignored_in_resident_mode() {
        let mut ctl = VisibilityController::new(DockMode::Resident, 20, DEFAULT_HIDE_DELAY);
        assert_eq!(ctl.pointer_leave(), None);
    }

    #[test]
    fn test_requests_in_resident_mode() {
        let mut ctl = VisibilityController::new(DockMode::Resident, 20, DEFAULT_HIDE_DELAY);
        assert!(ctl.request(VisibilityRequest::Show).is_empty());
        assert_eq!(ctl.request(VisibilityRequest::Toggle), vec![VisibilityEffect::Hide]);
        assert!(ctl.request(VisibilityRequest::Hide).is_empty());
        assert_eq!(ctl.request(VisibilityRequest::Toggle), vec![VisibilityEffect::Show]);
        assert_eq!(ctl.request(VisibilityRequest::Hide), vec![VisibilityEffect::Hide]);
        assert_eq!(ctl.request(VisibilityRequest::Show), vec![VisibilityEffect::Show]);
    }

    #[test]
    fn test_hide_request_drops_pending_timer() {
        let mut ctl = shown_autohide();
        let timer = match ctl.pointer_leave() {
            Some(VisibilityEffect::ScheduleHide(timer)) => timer,
            other => panic!("Expected ScheduleHide, got {:?}", other),
        };
        assert_eq!(
            ctl.request(VisibilityRequest::Hide),
            vec![VisibilityEffect::CancelHide(timer), VisibilityEffect::Hide]
        );
        assert!(ctl.pending_hide().is_none());
        assert_eq!(ctl.hide_timer_fired(timer.id), None);
    }

    #[test]
    fn test_toggle_cancels_pending_timer() {
        let mut ctl = shown_autohide();
        let timer = match ctl.pointer_leave() {
            Some(VisibilityEffect::ScheduleHide(timer)) => timer,
            other => panic!("Expected ScheduleHide, got {:?}", other),
        };
        assert_eq!(
            ctl.request(VisibilityRequest::Toggle),
            vec![VisibilityEffect::CancelHide(timer), VisibilityEffect::Hide]
        );
        assert_eq!(ctl.state(), Visibility::Hidden);
    }

    #[test]
    fn test_normal_mode_toggle_quits() {
        let mut ctl = VisibilityController::new(DockMode::Normal, 20, DEFAULT_HIDE_DELAY);
        assert_eq!(ctl.request(VisibilityRequest::Toggle), vec![VisibilityEffect::Quit]);
        assert!(ctl.request(VisibilityRequest::Hide).is_empty());
        assert!(ctl.request(VisibilityRequest::Show).is_empty());
    }

    #[test]
    fn test_activation_hides_autohide_dock() {
        let mut ctl = shown_autohide();
        assert_eq!(ctl.activated(), vec![VisibilityEffect::Hide]);

        let mut resident = VisibilityController::new(DockMode::Resident, 20, DEFAULT_HIDE_DELAY);
        assert!(resident.activated().is_empty());
    }

    #[test]
    fn test_activation_cancels_pending_timer() {
        let mut ctl = shown_autohide();
        let timer = match ctl.pointer_leave() {
            Some(VisibilityEffect::ScheduleHide(timer)) => timer,
            other => panic!("Expected ScheduleHide, got {:?}", other),
        };
        assert_eq!(
            ctl.activated(),
            vec![VisibilityEffect::CancelHide(timer), VisibilityEffect::Hide]
        );
        assert_eq!(ctl.hide_timer_fired(timer.id), None);
    }
}
