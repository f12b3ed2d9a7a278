//! Button scan task.
//!
//! Every 100 ms: read the four raw pins, debounce, feed the setpoint UI
//! machine, and apply whatever actions it emits.  Every applied action
//! writes a debug-level event.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alarm::AlarmMonitor;
use crate::config::ConfigStore;
use crate::drivers::buttons::DebouncedInput;
use crate::logs::EventLog;
use crate::ports::{Button, ButtonPort, NetControl};
use crate::setpoint::{SetpointUi, UiAction, UiInputs};
use crate::world::WorldState;

use super::interruptible_sleep;

const SCAN_PERIOD: Duration = Duration::from_millis(100);

pub struct InputTask {
    world: Arc<WorldState>,
    store: Arc<ConfigStore>,
    events: Arc<EventLog>,
    monitor: Arc<AlarmMonitor>,
    net: Arc<dyn NetControl>,
    port: Box<dyn ButtonPort>,
    debounce: [DebouncedInput; 4],
    ui: SetpointUi,
    started: Instant,
}

impl InputTask {
    pub fn new(
        world: Arc<WorldState>,
        store: Arc<ConfigStore>,
        events: Arc<EventLog>,
        monitor: Arc<AlarmMonitor>,
        net: Arc<dyn NetControl>,
        port: Box<dyn ButtonPort>,
    ) -> Self {
        Self {
            world,
            store,
            events,
            monitor,
            net,
            port,
            debounce: [
                DebouncedInput::default(),
                DebouncedInput::default(),
                DebouncedInput::default(),
                DebouncedInput::default(),
            ],
            ui: SetpointUi::new(),
            started: Instant::now(),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.world.running() {
            let now_ms = self.started.elapsed().as_millis() as u64;
            self.scan_once(now_ms);
            interruptible_sleep(&self.world, SCAN_PERIOD);
        }
        Ok(())
    }

    /// One debounce + UI pass.  Public for the integration tests.
    pub fn scan_once(&mut self, now_ms: u64) {
        let mut pressed = [false; 4];
        for (i, button) in Button::ALL.iter().enumerate() {
            // Active-low inputs: a low line level means the contact is
            // closed.
            let raw = match self.port.read(*button) {
                Ok(level) => !level,
                Err(e) => {
                    log::debug!("button read {}: {e}", button.pin_name());
                    false
                }
            };
            pressed[i] = self.debounce[i].update(raw, now_ms);
        }

        let inputs = UiInputs {
            now_ms,
            up: pressed[0],
            down: pressed[1],
            defrost: pressed[2],
            alarm: pressed[3],
            setpoint: self.world.setpoint.load(),
            any_alarm: self.monitor.any(),
        };
        let settings = self.store.settings();
        let actions = self.ui.tick(&inputs, &settings);
        for action in actions {
            self.apply(action);
        }
        self.world
            .flags
            .setpoint_edit
            .store(self.ui.editing(), Ordering::Release);
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::SetSetpoint(value) => {
                self.world.setpoint.store(value);
                self.events.debug(&format!("Setpoint edit: {value:.1}"));
            }
            UiAction::CommitSetpoint(value) => {
                self.world.setpoint.store(value);
                // The config schema stores the setpoint as an integer.
                if let Err(e) = self.store.set("unit.setpoint", &(value as i64).to_string()) {
                    self.events.error(&format!("Setpoint save failed: {e}"));
                } else {
                    self.events.debug(&format!("Setpoint saved: {value:.1}"));
                }
            }
            UiAction::RevertSetpoint(value) => {
                self.world.setpoint.store(value);
                self.events
                    .debug(&format!("Setpoint edit timed out, reverted to {value:.1}"));
            }
            UiAction::TriggerDefrost => {
                self.world
                    .flags
                    .trigger_defrost
                    .store(true, Ordering::Release);
                self.events.debug("Manual defrost requested");
            }
            UiAction::EnablePretrip => {
                self.world
                    .flags
                    .pretrip_enable
                    .store(true, Ordering::Release);
                self.events.debug("Pretrip enabled from panel");
            }
            UiAction::ToggleDemo => {
                let was = self.world.flags.demo_mode.fetch_xor(true, Ordering::AcqRel);
                self.events.debug(&format!(
                    "Demo mode {}",
                    if was { "disabled" } else { "enabled" }
                ));
            }
            UiAction::ResetAlarms => {
                self.monitor.reset();
            }
            UiAction::StartHotspot => {
                self.events.debug("Hotspot requested from panel");
                self.net.start_hotspot();
            }
        }
    }
}
