//! Setpoint-edit and service-gesture state machine.
//!
//! Fed debounced button states at 100 ms granularity; emits actions for
//! the input task to apply.  Keeping the machine pure (no world access)
//! makes every gesture testable with synthetic clocks.
//!
//! ```text
//!  IDLE ──[UP/DOWN held 2 s]──▶ EDITING
//!    ▲        (via ENTERING)       │ press: ±1 °F    hold ≥4 s: ±5 °F/s
//!    │                             │
//!    ├──[ALARM press: commit]──────┤
//!    └──[10 s idle: revert]────────┘
//! ```
//!
//! Service gestures, classified on release:
//!
//! | Button  | Hold    | Guard                       | Action          |
//! |---------|---------|-----------------------------|-----------------|
//! | DEFROST | < 5 s   | —                           | trigger defrost |
//! | DEFROST | ≥ 5 s   | int(setpoint) = 65          | enable pretrip  |
//! | DEFROST | ≥ 5 s   | int(setpoint) = 80          | toggle demo     |
//! | ALARM   | ≥ 10 s  | int(setpoint) = 65          | start hotspot   |
//! | ALARM   | ≥ 5 s   | int(setpoint) ≠ 65, alarmed | reset alarms    |

use crate::config::Settings;

const ENTER_HOLD_MS: u64 = 2_000;
const FAST_STEP_HOLD_MS: u64 = 4_000;
const FAST_STEP_REPEAT_MS: u64 = 1_000;
const EDIT_IDLE_TIMEOUT_MS: u64 = 10_000;
const LONG_PRESS_MS: u64 = 5_000;
const HOTSPOT_PRESS_MS: u64 = 10_000;

const STEP_F: f32 = 1.0;
const FAST_STEP_F: f32 = 5.0;

/// Setpoint value gating the service gestures.
const SERVICE_SETPOINT: i32 = 65;
/// Setpoint value gating the demo toggle.
const DEMO_SETPOINT: i32 = 80;

/// Debounced button states plus the context the guards need.
#[derive(Debug, Clone, Copy)]
pub struct UiInputs {
    pub now_ms: u64,
    pub up: bool,
    pub down: bool,
    pub defrost: bool,
    pub alarm: bool,
    pub setpoint: f32,
    pub any_alarm: bool,
}

/// What the input task should do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAction {
    /// Live edit value; publish but do not persist.
    SetSetpoint(f32),
    /// Edit committed; publish and persist.
    CommitSetpoint(f32),
    /// Edit timed out; restore the pre-edit value, no save.
    RevertSetpoint(f32),
    TriggerDefrost,
    EnablePretrip,
    ToggleDemo,
    ResetAlarms,
    StartHotspot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditState {
    Idle,
    /// UP or DOWN is down; waiting out the 2 s entry hold.
    Entering { since_ms: u64 },
    Editing { last_activity_ms: u64 },
}

pub struct SetpointUi {
    state: EditState,
    /// Value to restore on an idle-timeout exit.
    edit_start: f32,
    up_prev: bool,
    down_prev: bool,
    defrost_prev: bool,
    alarm_prev: bool,
    defrost_since: u64,
    alarm_since: u64,
    up_fast_at: u64,
    down_fast_at: u64,
    /// The ALARM press that committed an edit must not double as a
    /// reset/hotspot gesture on its release.
    alarm_consumed: bool,
}

impl SetpointUi {
    pub fn new() -> Self {
        Self {
            state: EditState::Idle,
            edit_start: 0.0,
            up_prev: false,
            down_prev: false,
            defrost_prev: false,
            alarm_prev: false,
            defrost_since: 0,
            alarm_since: 0,
            up_fast_at: 0,
            down_fast_at: 0,
            alarm_consumed: false,
        }
    }

    /// True while the edit sub-machine is in Editing (drives the LCD
    /// flash).
    pub fn editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    /// Advance one scan.
    pub fn tick(&mut self, inputs: &UiInputs, settings: &Settings) -> Vec<UiAction> {
        let mut actions = Vec::new();
        let now = inputs.now_ms;

        let up_edge = inputs.up && !self.up_prev;
        let down_edge = inputs.down && !self.down_prev;
        let alarm_edge = inputs.alarm && !self.alarm_prev;
        let defrost_release = !inputs.defrost && self.defrost_prev;
        let alarm_release = !inputs.alarm && self.alarm_prev;

        if up_edge {
            self.up_fast_at = now + FAST_STEP_HOLD_MS;
        }
        if down_edge {
            self.down_fast_at = now + FAST_STEP_HOLD_MS;
        }
        if inputs.defrost && !self.defrost_prev {
            self.defrost_since = now;
        }
        if alarm_edge {
            self.alarm_since = now;
        }

        // ── Edit sub-machine ──────────────────────────────────
        match self.state {
            EditState::Idle => {
                if up_edge || down_edge {
                    self.state = EditState::Entering { since_ms: now };
                }
            }
            EditState::Entering { since_ms } => {
                if !inputs.up && !inputs.down {
                    self.state = EditState::Idle;
                } else if now.saturating_sub(since_ms) >= ENTER_HOLD_MS {
                    self.edit_start = inputs.setpoint;
                    self.state = EditState::Editing {
                        last_activity_ms: now,
                    };
                }
            }
            EditState::Editing { last_activity_ms } => {
                let mut value = inputs.setpoint;
                let mut touched = false;

                if alarm_edge {
                    actions.push(UiAction::CommitSetpoint(value));
                    self.state = EditState::Idle;
                    self.alarm_consumed = true;
                } else if now.saturating_sub(last_activity_ms) >= EDIT_IDLE_TIMEOUT_MS {
                    actions.push(UiAction::RevertSetpoint(self.edit_start));
                    self.state = EditState::Idle;
                } else {
                    if up_edge {
                        value = settings.clamp_setpoint(value + STEP_F);
                        touched = true;
                    }
                    if down_edge {
                        value = settings.clamp_setpoint(value - STEP_F);
                        touched = true;
                    }
                    if inputs.up && now >= self.up_fast_at {
                        value = settings.clamp_setpoint(value + FAST_STEP_F);
                        self.up_fast_at = now + FAST_STEP_REPEAT_MS;
                        touched = true;
                    }
                    if inputs.down && now >= self.down_fast_at {
                        value = settings.clamp_setpoint(value - FAST_STEP_F);
                        self.down_fast_at = now + FAST_STEP_REPEAT_MS;
                        touched = true;
                    }
                    if touched {
                        actions.push(UiAction::SetSetpoint(value));
                        self.state = EditState::Editing {
                            last_activity_ms: now,
                        };
                    }
                }
            }
        }

        // ── Service gestures (release-classified) ─────────────
        if defrost_release {
            let held = now.saturating_sub(self.defrost_since);
            let sp = inputs.setpoint as i32;
            if held < LONG_PRESS_MS {
                actions.push(UiAction::TriggerDefrost);
            } else if sp == SERVICE_SETPOINT {
                actions.push(UiAction::EnablePretrip);
            } else if sp == DEMO_SETPOINT {
                actions.push(UiAction::ToggleDemo);
            }
        }

        if alarm_release {
            if self.alarm_consumed {
                self.alarm_consumed = false;
            } else {
                let held = now.saturating_sub(self.alarm_since);
                let sp = inputs.setpoint as i32;
                if held >= HOTSPOT_PRESS_MS && sp == SERVICE_SETPOINT {
                    actions.push(UiAction::StartHotspot);
                } else if held >= LONG_PRESS_MS && sp != SERVICE_SETPOINT && inputs.any_alarm {
                    actions.push(UiAction::ResetAlarms);
                }
            }
        }

        self.up_prev = inputs.up;
        self.down_prev = inputs.down;
        self.defrost_prev = inputs.defrost;
        self.alarm_prev = inputs.alarm;
        actions
    }
}

impl Default for SetpointUi {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use tempfile::tempdir;

    struct Rig {
        _dir: tempfile::TempDir,
        ui: SetpointUi,
        settings: Settings,
        setpoint: f32,
        any_alarm: bool,
    }

    impl Rig {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let store = ConfigStore::open(dir.path().join("config.env")).unwrap();
            Self {
                _dir: dir,
                ui: SetpointUi::new(),
                settings: store.settings(),
                setpoint: 55.0,
                any_alarm: false,
            }
        }

        fn tick(&mut self, now_ms: u64, buttons: (bool, bool, bool, bool)) -> Vec<UiAction> {
            let (up, down, defrost, alarm) = buttons;
            let actions = self.ui.tick(
                &UiInputs {
                    now_ms,
                    up,
                    down,
                    defrost,
                    alarm,
                    setpoint: self.setpoint,
                    any_alarm: self.any_alarm,
                },
                &self.settings,
            );
            // Mirror what the input task does with the published value.
            for action in &actions {
                match action {
                    UiAction::SetSetpoint(v)
                    | UiAction::CommitSetpoint(v)
                    | UiAction::RevertSetpoint(v) => self.setpoint = *v,
                    _ => {}
                }
            }
            actions
        }

        /// Hold UP from `start` until editing engages, then release.
        fn enter_edit(&mut self, start: u64) -> u64 {
            let mut t = start;
            self.tick(t, (true, false, false, false));
            while !self.ui.editing() {
                t += 100;
                self.tick(t, (true, false, false, false));
                assert!(t < start + 3_000, "edit entry must engage at 2 s");
            }
            t += 100;
            self.tick(t, (false, false, false, false));
            t
        }
    }

    const IDLE: (bool, bool, bool, bool) = (false, false, false, false);

    #[test]
    fn short_up_press_alone_does_not_edit() {
        let mut rig = Rig::new();
        rig.tick(0, (true, false, false, false));
        rig.tick(300, IDLE);
        assert!(!rig.ui.editing());
        assert_eq!(rig.setpoint, 55.0);
    }

    #[test]
    fn two_second_hold_enters_editing() {
        let mut rig = Rig::new();
        rig.tick(0, (true, false, false, false));
        rig.tick(1_900, (true, false, false, false));
        assert!(!rig.ui.editing());
        rig.tick(2_000, (true, false, false, false));
        assert!(rig.ui.editing());
    }

    #[test]
    fn presses_step_one_degree_in_editing() {
        let mut rig = Rig::new();
        let mut t = rig.enter_edit(0);
        for expected in [56.0, 57.0, 58.0, 59.0] {
            t += 200;
            let actions = rig.tick(t, (true, false, false, false));
            assert_eq!(actions, vec![UiAction::SetSetpoint(expected)]);
            t += 200;
            rig.tick(t, IDLE);
        }
    }

    #[test]
    fn four_second_hold_steps_five_degrees() {
        let mut rig = Rig::new();
        let t = rig.enter_edit(0);
        // Fresh press, held past the fast-step threshold.
        rig.tick(t + 100, (true, false, false, false)); // +1 on the edge
        assert_eq!(rig.setpoint, 56.0);
        let actions = rig.tick(t + 100 + 4_000, (true, false, false, false));
        assert_eq!(actions, vec![UiAction::SetSetpoint(61.0)]);
        // Held a further second: another 5 °F.
        let actions = rig.tick(t + 100 + 5_000, (true, false, false, false));
        assert_eq!(actions, vec![UiAction::SetSetpoint(66.0)]);
    }

    #[test]
    fn edits_clamp_at_the_configured_limits() {
        let mut rig = Rig::new();
        rig.setpoint = 79.0;
        let t = rig.enter_edit(0);
        rig.tick(t + 100, (true, false, false, false));
        assert_eq!(rig.setpoint, 80.0);
        rig.tick(t + 300, IDLE);
        rig.tick(t + 400, (true, false, false, false));
        assert_eq!(rig.setpoint, 80.0, "high limit holds");
    }

    #[test]
    fn alarm_press_commits_and_exits() {
        let mut rig = Rig::new();
        let t = rig.enter_edit(0);
        rig.tick(t + 100, (true, false, false, false));
        let actions = rig.tick(t + 400, (false, false, false, true));
        assert_eq!(actions, vec![UiAction::CommitSetpoint(56.0)]);
        assert!(!rig.ui.editing());
        // The commit press's release performs no alarm gesture.
        let actions = rig.tick(t + 600, IDLE);
        assert!(actions.is_empty());
    }

    #[test]
    fn idle_timeout_reverts_without_saving() {
        let mut rig = Rig::new();
        let t = rig.enter_edit(0);
        rig.tick(t + 100, (true, false, false, false));
        rig.tick(t + 300, IDLE);
        assert_eq!(rig.setpoint, 56.0);
        let actions = rig.tick(t + 300 + 10_000, IDLE);
        assert_eq!(actions, vec![UiAction::RevertSetpoint(55.0)]);
        assert!(!rig.ui.editing());
        assert_eq!(rig.setpoint, 55.0);
    }

    #[test]
    fn short_defrost_press_triggers_defrost() {
        let mut rig = Rig::new();
        rig.tick(0, (false, false, true, false));
        let actions = rig.tick(800, IDLE);
        assert_eq!(actions, vec![UiAction::TriggerDefrost]);
    }

    #[test]
    fn long_defrost_at_65_enables_pretrip() {
        let mut rig = Rig::new();
        rig.setpoint = 65.0;
        rig.tick(0, (false, false, true, false));
        rig.tick(5_200, (false, false, true, false));
        let actions = rig.tick(5_300, IDLE);
        assert_eq!(actions, vec![UiAction::EnablePretrip]);
    }

    #[test]
    fn long_defrost_at_80_toggles_demo() {
        let mut rig = Rig::new();
        rig.setpoint = 80.0;
        rig.tick(0, (false, false, true, false));
        let actions = rig.tick(6_000, IDLE);
        assert_eq!(actions, vec![UiAction::ToggleDemo]);
    }

    #[test]
    fn long_defrost_at_other_setpoints_does_nothing() {
        let mut rig = Rig::new();
        rig.setpoint = 55.0;
        rig.tick(0, (false, false, true, false));
        let actions = rig.tick(6_000, IDLE);
        assert!(actions.is_empty());
    }

    #[test]
    fn long_alarm_hold_resets_when_alarmed() {
        let mut rig = Rig::new();
        rig.any_alarm = true;
        rig.tick(0, (false, false, false, true));
        let actions = rig.tick(5_500, IDLE);
        assert_eq!(actions, vec![UiAction::ResetAlarms]);
    }

    #[test]
    fn alarm_hold_without_active_alarm_is_ignored() {
        let mut rig = Rig::new();
        rig.any_alarm = false;
        rig.tick(0, (false, false, false, true));
        let actions = rig.tick(5_500, IDLE);
        assert!(actions.is_empty());
    }

    #[test]
    fn ten_second_alarm_hold_at_65_starts_hotspot() {
        let mut rig = Rig::new();
        rig.setpoint = 65.0;
        rig.any_alarm = true;
        rig.tick(0, (false, false, false, true));
        let actions = rig.tick(10_500, IDLE);
        assert_eq!(actions, vec![UiAction::StartHotspot]);
    }

    #[test]
    fn reset_gesture_requires_non_service_setpoint() {
        let mut rig = Rig::new();
        rig.setpoint = 65.0;
        rig.any_alarm = true;
        rig.tick(0, (false, false, false, true));
        // 5 s ≤ hold < 10 s at setpoint 65: neither reset nor hotspot.
        let actions = rig.tick(6_000, IDLE);
        assert!(actions.is_empty());
    }
}
