//! Alarm engine.
//!
//! Watches mode-versus-result expectations and probe sanity, and owns the
//! alarm session state: the ordered code set and the shutdown/warning
//! latches.  The latches live in the shared world flags so the control
//! evaluator reads them as plain atomic snapshots — no reference back
//! into this module.
//!
//! ## Stall detection
//!
//! Each direction has a stable-state timer with a fixed 30-minute window.
//! While the unit is Cooling, supply air failing to pull below return air
//! (minus the hysteresis offset) arms the cooling timer; 30 unbroken
//! minutes of that raises shutdown code 1001.  Heating mirrors it with
//! code 1002.  Arming one direction disarms the other, and leaving
//! Cooling/Heating disarms both.
//!
//! Codes dedup on insert: a code appears in the session set once no
//! matter how many ticks its condition persists.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use crate::error::{AlarmCode, Severity};
use crate::logs::EventLog;
use crate::world::{Mode, WorldState};

/// Stall window for the effectiveness alarms.
const STALL_WINDOW_SECS: u64 = 30 * 60;

/// Margin the supply air must develop against the return air before a
/// productive mode counts as effective.
const STALL_OFFSET_F: f32 = 4.0;

/// Plausible probe range; anything outside (including the −327 sentinel)
/// is a probe fault.
const PROBE_RANGE_F: std::ops::RangeInclusive<f32> = -50.0..=150.0;

#[derive(Default)]
struct Inner {
    codes: Vec<AlarmCode>,
    cooling_since: Option<u64>,
    heating_since: Option<u64>,
}

pub struct AlarmMonitor {
    world: Arc<WorldState>,
    events: Arc<EventLog>,
    inner: Mutex<Inner>,
}

impl AlarmMonitor {
    pub fn new(world: Arc<WorldState>, events: Arc<EventLog>) -> Self {
        Self {
            world,
            events,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// One evaluation pass.  Called once per second by the alarm task with
    /// a snapshot of the mode and the published temperatures.
    pub fn evaluate(&self, now: u64, mode: Mode, return_t: f32, supply_t: f32, coil_t: f32) {
        if !PROBE_RANGE_F.contains(&return_t) {
            self.raise(AlarmCode::ReturnProbeFault);
        }
        if !PROBE_RANGE_F.contains(&coil_t) {
            self.raise(AlarmCode::CoilProbeFault);
        }
        if !PROBE_RANGE_F.contains(&supply_t) {
            self.raise(AlarmCode::SupplyProbeFault);
        }

        let mut inner = self.inner.lock().expect("alarm mutex poisoned");
        match mode {
            Mode::Cooling => {
                inner.heating_since = None;
                let stalled = return_t - STALL_OFFSET_F <= supply_t && return_t > 30.0;
                let expired = Self::watch(&mut inner.cooling_since, stalled, now);
                drop(inner);
                if expired {
                    self.raise(AlarmCode::CoolingIneffective);
                }
            }
            Mode::Heating => {
                inner.cooling_since = None;
                let stalled = return_t + STALL_OFFSET_F >= supply_t && return_t < 60.0;
                let expired = Self::watch(&mut inner.heating_since, stalled, now);
                drop(inner);
                if expired {
                    self.raise(AlarmCode::HeatingIneffective);
                }
            }
            _ => {
                inner.cooling_since = None;
                inner.heating_since = None;
            }
        }
    }

    /// Latch a code into the session.  Sets the matching flag every call;
    /// inserts into the code set (and logs) only on first occurrence.
    pub fn raise(&self, code: AlarmCode) {
        let flags = &self.world.flags;
        match code.severity() {
            Severity::Shutdown => flags.shutdown_alarm.store(true, Ordering::Release),
            Severity::Warning => flags.warning_alarm.store(true, Ordering::Release),
        }

        let mut inner = self.inner.lock().expect("alarm mutex poisoned");
        if !inner.codes.contains(&code) {
            inner.codes.push(code);
            self.events.error(&format!("ALARM TRIGGERED: {code}"));
        }
    }

    /// Clear both latches, both timers, and the code set.  The next
    /// control tick can then leave Alarm for Null.
    pub fn reset(&self) {
        let flags = &self.world.flags;
        flags.shutdown_alarm.store(false, Ordering::Release);
        flags.warning_alarm.store(false, Ordering::Release);
        let mut inner = self.inner.lock().expect("alarm mutex poisoned");
        inner.codes.clear();
        inner.cooling_since = None;
        inner.heating_since = None;
        self.events.error("All alarms reset.");
    }

    /// Active codes in raise order.
    pub fn codes(&self) -> Vec<u16> {
        self.inner
            .lock()
            .expect("alarm mutex poisoned")
            .codes
            .iter()
            .map(|c| c.code())
            .collect()
    }

    pub fn shutdown(&self) -> bool {
        self.world.flags.shutdown_alarm.load(Ordering::Acquire)
    }

    pub fn warning(&self) -> bool {
        self.world.flags.warning_alarm.load(Ordering::Acquire)
    }

    pub fn any(&self) -> bool {
        self.shutdown() || self.warning()
    }

    /// Stable-state timer step: arms on the condition's rising edge and
    /// reports true once the window has run down.
    fn watch(since: &mut Option<u64>, condition: bool, now: u64) -> bool {
        if !condition {
            *since = None;
            return false;
        }
        match *since {
            None => {
                *since = Some(now);
                false
            }
            Some(start) => now.saturating_sub(start) >= STALL_WINDOW_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::EventLog;
    use tempfile::tempdir;

    fn make() -> (tempfile::TempDir, AlarmMonitor, Arc<WorldState>) {
        let dir = tempdir().unwrap();
        let world = Arc::new(WorldState::new(55.0, 0, 1_000_000));
        let events = Arc::new(EventLog::new(dir.path().join("logs"), false));
        let monitor = AlarmMonitor::new(world.clone(), events);
        (dir, monitor, world)
    }

    const T0: u64 = 1_000_000;

    #[test]
    fn cooling_stall_raises_1001_after_window() {
        let (_d, monitor, _w) = make();
        // Cooling with supply barely below return: stalled.
        monitor.evaluate(T0, Mode::Cooling, 50.0, 47.0, 40.0);
        assert!(!monitor.shutdown(), "must not trip before the window");
        monitor.evaluate(T0 + STALL_WINDOW_SECS - 1, Mode::Cooling, 50.0, 47.0, 40.0);
        assert!(!monitor.shutdown());
        monitor.evaluate(T0 + STALL_WINDOW_SECS, Mode::Cooling, 50.0, 47.0, 40.0);
        assert!(monitor.shutdown());
        assert_eq!(monitor.codes(), vec![1001]);
    }

    #[test]
    fn effective_cooling_disarms_the_timer() {
        let (_d, monitor, _w) = make();
        monitor.evaluate(T0, Mode::Cooling, 50.0, 47.0, 40.0);
        // Supply pulls well below return: condition clears, timer restarts.
        monitor.evaluate(T0 + 60, Mode::Cooling, 50.0, 40.0, 35.0);
        monitor.evaluate(T0 + STALL_WINDOW_SECS + 60, Mode::Cooling, 50.0, 47.0, 40.0);
        assert!(!monitor.shutdown(), "timer must have been rearmed");
    }

    #[test]
    fn cold_box_exemption_blocks_1001() {
        let (_d, monitor, _w) = make();
        // Return below 30 °F: the box is already cold, no stall alarm.
        for i in 0..=STALL_WINDOW_SECS / 60 {
            monitor.evaluate(T0 + i * 60, Mode::Cooling, 28.0, 27.0, 20.0);
        }
        assert!(!monitor.shutdown());
    }

    #[test]
    fn heating_stall_raises_1002() {
        let (_d, monitor, _w) = make();
        monitor.evaluate(T0, Mode::Heating, 40.0, 42.0, 50.0);
        monitor.evaluate(T0 + STALL_WINDOW_SECS, Mode::Heating, 40.0, 42.0, 50.0);
        assert!(monitor.shutdown());
        assert_eq!(monitor.codes(), vec![1002]);
    }

    #[test]
    fn leaving_the_mode_resets_both_timers() {
        let (_d, monitor, _w) = make();
        monitor.evaluate(T0, Mode::Cooling, 50.0, 47.0, 40.0);
        monitor.evaluate(T0 + 60, Mode::Null, 50.0, 47.0, 40.0);
        monitor.evaluate(T0 + STALL_WINDOW_SECS + 60, Mode::Cooling, 50.0, 47.0, 40.0);
        assert!(!monitor.shutdown());
    }

    #[test]
    fn out_of_range_probes_raise_immediately() {
        let (_d, monitor, _w) = make();
        monitor.evaluate(T0, Mode::Null, crate::world::TEMP_SENTINEL, 48.0, 200.0);
        assert!(monitor.shutdown(), "return fault is a shutdown");
        assert_eq!(monitor.codes(), vec![2000, 2001]);
    }

    #[test]
    fn supply_fault_is_warning_only() {
        let (_d, monitor, _w) = make();
        monitor.evaluate(T0, Mode::Null, 50.0, crate::world::TEMP_SENTINEL, 40.0);
        assert!(!monitor.shutdown());
        assert!(monitor.warning());
        assert_eq!(monitor.codes(), vec![2002]);
    }

    #[test]
    fn codes_dedup_within_a_session() {
        let (_d, monitor, _w) = make();
        for i in 0..5 {
            monitor.evaluate(T0 + i, Mode::Null, 200.0, 48.0, 40.0);
        }
        assert_eq!(monitor.codes(), vec![2000]);
    }

    #[test]
    fn reset_clears_codes_flags_and_timers() {
        let (_d, monitor, _w) = make();
        monitor.raise(AlarmCode::CoolingIneffective);
        monitor.raise(AlarmCode::DefrostTimeout);
        assert!(monitor.shutdown() && monitor.warning());

        monitor.reset();
        assert!(!monitor.any());
        assert!(monitor.codes().is_empty());

        // Timers must restart from scratch after reset.
        monitor.evaluate(T0, Mode::Cooling, 50.0, 47.0, 40.0);
        assert!(!monitor.shutdown());
    }

    #[test]
    fn reset_with_no_alarms_is_a_state_no_op() {
        let (_d, monitor, _w) = make();
        monitor.reset();
        assert!(!monitor.any());
        assert!(monitor.codes().is_empty());
    }

    #[test]
    fn boundary_exactly_at_window_trips() {
        let (_d, monitor, _w) = make();
        monitor.evaluate(T0, Mode::Heating, 40.0, 42.0, 50.0);
        monitor.evaluate(T0 + STALL_WINDOW_SECS, Mode::Heating, 40.0, 42.0, 50.0);
        assert_eq!(monitor.codes(), vec![1002]);
    }
}
