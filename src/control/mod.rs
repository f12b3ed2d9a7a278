//! Control evaluator.
//!
//! A pure decision layer around the mode-entry functions:
//!
//! ```text
//!  Cooling ──[return ≤ setpoint]──▶ Null
//!  Heating ──[return ≥ setpoint]──▶ Null
//!  Null ────[anti-cycle open, return outside band]──▶ Cooling / Heating
//!  Defrost ─[coil warm, or timeout + 1004]──▶ Null
//!  any ─────[coil cold ∧ (interval due ∨ manual)]──▶ Defrost
//! ```
//!
//! Transitions are evaluated in order each tick and the first match wins.
//! A latched shutdown alarm pins the unit in Alarm; pretrip, when
//! enabled, takes over the whole tick.  Mode-entry is the only place the
//! status block changes: it writes the mode + relay tuple, stamps the
//! mode timers, logs the transition, and performs the relay write — all
//! under the status mutex, so the device outputs are totally ordered
//! after the status mutation.

pub mod pretrip;
pub mod relays;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::alarm::AlarmMonitor;
use crate::config::{ConfigStore, Settings};
use crate::error::AlarmCode;
use crate::logs::EventLog;
use crate::world::{Mode, WorldState};

use pretrip::{PretripOutcome, PretripStage};
use relays::RelayDriver;

/// Per-tick probe snapshot handed in by the sensor task.
#[derive(Debug, Clone, Copy)]
pub struct ControlInputs {
    /// Epoch seconds.
    pub now: u64,
    pub return_t: f32,
    pub supply_t: f32,
    pub coil_t: f32,
    pub setpoint: f32,
}

pub struct Controller {
    world: Arc<WorldState>,
    store: Arc<ConfigStore>,
    events: Arc<EventLog>,
    alarms: Arc<AlarmMonitor>,
    relays: RelayDriver,
    pretrip: Option<PretripStage>,
}

impl Controller {
    pub fn new(
        world: Arc<WorldState>,
        store: Arc<ConfigStore>,
        events: Arc<EventLog>,
        alarms: Arc<AlarmMonitor>,
        relays: RelayDriver,
    ) -> Self {
        Self {
            world,
            store,
            events,
            alarms,
            relays,
            pretrip: None,
        }
    }

    /// One control evaluation.  Called by the sensor task right after it
    /// publishes fresh temperatures, and by tests directly.
    pub fn tick(&mut self, inputs: &ControlInputs) {
        let settings = self.store.settings();
        let flags = &self.world.flags;

        // A latched shutdown holds the unit in Alarm until reset.
        if flags.shutdown_alarm.load(Ordering::Acquire) {
            if self.pretrip.take().is_some() {
                flags.pretrip_enable.store(false, Ordering::Release);
                self.events.debug("Pretrip aborted by active alarm");
            }
            if self.world.mode() != Mode::Alarm {
                self.enter(Mode::Alarm, inputs.now);
            }
            return;
        }

        // First tick after an alarm reset drops back to Null.
        if self.world.mode() == Mode::Alarm {
            self.enter(Mode::Null, inputs.now);
            return;
        }

        if flags.pretrip_enable.load(Ordering::Acquire) {
            self.pretrip_tick(inputs);
            return;
        }
        self.pretrip = None;

        let mode = self.world.mode();
        if let Some(next) = self.evaluate(mode, inputs, &settings) {
            self.enter(next, inputs.now);
            return;
        }

        self.maybe_enter_defrost(mode, inputs, &settings);
    }

    /// The per-mode transition rule.  Pure apart from the anti-cycle flag
    /// edge and the 1004 warning.
    fn evaluate(&self, mode: Mode, inputs: &ControlInputs, settings: &Settings) -> Option<Mode> {
        let timers = &self.world.timers;
        let flags = &self.world.flags;
        match mode {
            Mode::Cooling if inputs.return_t <= inputs.setpoint => Some(Mode::Null),
            Mode::Heating if inputs.return_t >= inputs.setpoint => Some(Mode::Null),
            Mode::Null => {
                let stopped = timers.compressor_last_stop.load(Ordering::Acquire);
                if inputs.now.saturating_sub(stopped) >= settings.off_timer_secs {
                    flags.anti_timer_active.store(false, Ordering::Release);
                    if inputs.return_t >= inputs.setpoint + settings.offset {
                        Some(Mode::Cooling)
                    } else if inputs.return_t <= inputs.setpoint - settings.offset {
                        Some(Mode::Heating)
                    } else {
                        None
                    }
                } else {
                    if !flags.anti_timer_active.swap(true, Ordering::AcqRel) {
                        self.events.debug("Anti-cycle timer engaged");
                    }
                    None
                }
            }
            Mode::Defrost => {
                if inputs.coil_t > settings.defrost_coil_temp {
                    Some(Mode::Null)
                } else {
                    let started = timers.defrost_start.load(Ordering::Acquire);
                    if started != 0
                        && inputs.now.saturating_sub(started) >= settings.defrost_timeout_secs
                    {
                        self.alarms.raise(AlarmCode::DefrostTimeout);
                        Some(Mode::Null)
                    } else {
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Defrost entry applies from any mode while the coil is cold.
    fn maybe_enter_defrost(&mut self, mode: Mode, inputs: &ControlInputs, settings: &Settings) {
        if inputs.coil_t >= settings.defrost_coil_temp {
            return;
        }
        let flags = &self.world.flags;
        let last = self.world.timers.defrost_last.load(Ordering::Acquire);
        let due = inputs.now.saturating_sub(last) >= settings.defrost_interval_secs;
        if !due && !flags.trigger_defrost.load(Ordering::Acquire) {
            return;
        }
        flags.trigger_defrost.store(false, Ordering::Release);
        if mode != Mode::Defrost {
            self.enter(Mode::Defrost, inputs.now);
        }
    }

    /// Mode-entry: the single writer of the status block.
    pub fn enter(&mut self, mode: Mode, now: u64) {
        let mut status = self.world.status.lock().expect("status mutex poisoned");
        let prev = status.mode;

        let (compressor, fan, valve, heater) = match mode {
            Mode::Null => (false, false, false, false),
            Mode::Cooling => (true, true, false, false),
            Mode::Heating => (true, true, true, true),
            Mode::Defrost => (true, false, true, true),
            Mode::Alarm => (false, false, false, false),
        };
        status.mode = mode;
        status.compressor = compressor;
        status.fan = fan;
        status.valve = valve;
        status.electric_heater = heater;

        let timers = &self.world.timers;
        timers.state_entered.store(now, Ordering::Release);
        if prev == Mode::Defrost && mode != Mode::Defrost {
            timers.defrost_start.store(0, Ordering::Release);
            timers.defrost_last.store(now, Ordering::Release);
        }
        match mode {
            Mode::Null => timers.compressor_last_stop.store(now, Ordering::Release),
            Mode::Defrost => timers.defrost_start.store(now, Ordering::Release),
            _ => {}
        }
        if mode != Mode::Null {
            self.world
                .flags
                .anti_timer_active
                .store(false, Ordering::Release);
        }

        // Device write happens before the lock drops so the accumulator
        // sees each compressor edge exactly once.
        self.relays.apply(&mut status, now);
        drop(status);

        self.events.debug(&format!("Mode changed to {mode}"));
    }

    /// Write the current requested states out once at boot, without
    /// touching any mode timer.  Gives fan-continuous units a live fan
    /// before the first transition.
    pub fn apply_initial(&mut self, now: u64) {
        let mut status = self.world.status.lock().expect("status mutex poisoned");
        self.relays.apply(&mut status, now);
    }

    /// Park every relay at its de-energised level; used on shutdown.
    pub fn safe_shutdown(&mut self, now: u64) {
        self.relays.safe_state(now);
        self.events.debug("Relays driven to safe state");
    }

    // ── Pretrip delegation ────────────────────────────────────

    fn pretrip_tick(&mut self, inputs: &ControlInputs) {
        let Some(stage) = self.pretrip else {
            self.events.debug("Pretrip started: stage 1 (cooling)");
            self.enter(Mode::Cooling, inputs.now);
            self.pretrip = Some(PretripStage::CoolFirst { since: inputs.now });
            return;
        };

        match pretrip::step(stage, inputs.now, inputs.return_t, inputs.coil_t) {
            PretripOutcome::Continue => {}
            PretripOutcome::Advance(next, mode) => {
                let label = match next {
                    PretripStage::Heat { .. } => "stage 2 (heating)",
                    PretripStage::CoolSecond { .. } => "stage 3 (cooling)",
                    PretripStage::CoolFirst { .. } => "stage 1 (cooling)",
                };
                self.events.debug(&format!("Pretrip advanced to {label}"));
                self.enter(mode, inputs.now);
                self.pretrip = Some(next);
            }
            PretripOutcome::Passed => {
                self.alarms.raise(AlarmCode::PretripPassed);
                self.enter(Mode::Null, inputs.now);
                self.finish_pretrip();
            }
            PretripOutcome::Failed(code) => {
                self.alarms.raise(code);
                self.enter(Mode::Alarm, inputs.now);
                self.finish_pretrip();
            }
        }
    }

    fn finish_pretrip(&mut self) {
        self.pretrip = None;
        self.world
            .flags
            .pretrip_enable
            .store(false, Ordering::Release);
        self.events.debug("Pretrip finished");
    }
}
