//! Sensor task: acquire → publish → control tick → conditions log.
//!
//! Runs once per second.  In demo mode the simulator stands in for the
//! one-wire bus, fed back with the current requested mode and setpoint so
//! the simulated box responds to what the controller is doing.  On
//! shutdown the task drives the relays to their safe state before
//! exiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

use crate::config::{ConfigStore, Settings};
use crate::control::{ControlInputs, Controller};
use crate::logs::EventLog;
use crate::ports::ProbeBus;
use crate::sim::DemoUnit;
use crate::world::{epoch_secs, WorldState, TEMP_SENTINEL};

use super::interruptible_sleep;

pub struct SensorTask {
    world: Arc<WorldState>,
    store: Arc<ConfigStore>,
    events: Arc<EventLog>,
    controller: Arc<Mutex<Controller>>,
    probes: Box<dyn ProbeBus>,
    demo: DemoUnit,
    last_conditions: u64,
}

impl SensorTask {
    pub fn new(
        world: Arc<WorldState>,
        store: Arc<ConfigStore>,
        events: Arc<EventLog>,
        controller: Arc<Mutex<Controller>>,
        probes: Box<dyn ProbeBus>,
        demo: DemoUnit,
    ) -> Self {
        Self {
            world,
            store,
            events,
            controller,
            probes,
            demo,
            last_conditions: 0,
        }
    }

    /// Task body for the supervisor.
    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.world.running() {
            self.tick_once(epoch_secs());
            interruptible_sleep(&self.world, Duration::from_secs(1));
        }
        self.controller
            .lock()
            .expect("controller mutex poisoned")
            .safe_shutdown(epoch_secs());
        Ok(())
    }

    /// One acquisition + control cycle.  Public so the integration tests
    /// can drive it with synthetic clocks.
    pub fn tick_once(&mut self, now: u64) {
        let settings = self.store.settings();
        let (return_t, supply_t, coil_t) = self.acquire(&settings);
        self.world.publish_temps(return_t, supply_t, coil_t);

        let inputs = ControlInputs {
            now,
            return_t: self.world.return_temp.load(),
            supply_t: self.world.supply_temp.load(),
            coil_t: self.world.coil_temp.load(),
            setpoint: self.world.setpoint.load(),
        };
        self.controller
            .lock()
            .expect("controller mutex poisoned")
            .tick(&inputs);

        if now.saturating_sub(self.last_conditions) >= settings.logging_interval_secs {
            self.last_conditions = now;
            let status = self.world.status_snapshot();
            self.events.conditions(
                inputs.setpoint,
                inputs.return_t,
                inputs.coil_t,
                inputs.supply_t,
                &status,
            );
        }
    }

    fn acquire(&mut self, settings: &Settings) -> (f32, f32, f32) {
        if self
            .world
            .flags
            .demo_mode
            .load(std::sync::atomic::Ordering::Acquire)
        {
            self.demo.set_mode(self.world.mode());
            self.demo.set_setpoint(self.world.setpoint.load());
            self.demo.update();
            (
                self.demo.read_return(),
                self.demo.read_supply(),
                self.demo.read_coil(),
            )
        } else {
            (
                self.read_probe(&settings.sensor_return),
                self.read_probe(&settings.sensor_supply),
                self.read_probe(&settings.sensor_coil),
            )
        }
    }

    fn read_probe(&mut self, sensor_id: &str) -> f32 {
        match self.probes.read_temp_f(sensor_id) {
            Ok(value) => value,
            Err(e) => {
                debug!("probe read failed: {e}");
                TEMP_SENTINEL
            }
        }
    }
}
