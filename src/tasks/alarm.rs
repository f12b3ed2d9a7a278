//! Alarm evaluation task.
//!
//! Once per second: snapshot mode and temperatures, run the alarm
//! engine, and if a shutdown alarm has latched while the unit is still
//! in a productive mode, invoke the Alarm mode-entry immediately rather
//! than waiting for the next control tick.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::alarm::AlarmMonitor;
use crate::control::Controller;
use crate::world::{epoch_secs, Mode, WorldState};

use super::interruptible_sleep;

pub struct AlarmTask {
    world: Arc<WorldState>,
    monitor: Arc<AlarmMonitor>,
    controller: Arc<Mutex<Controller>>,
}

impl AlarmTask {
    pub fn new(
        world: Arc<WorldState>,
        monitor: Arc<AlarmMonitor>,
        controller: Arc<Mutex<Controller>>,
    ) -> Self {
        Self {
            world,
            monitor,
            controller,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.world.running() {
            self.evaluate_once(epoch_secs());
            interruptible_sleep(&self.world, Duration::from_secs(1));
        }
        Ok(())
    }

    /// One evaluation pass.  Public for the integration tests.
    pub fn evaluate_once(&mut self, now: u64) {
        let mode = self.world.mode();
        self.monitor.evaluate(
            now,
            mode,
            self.world.return_temp.load(),
            self.world.supply_temp.load(),
            self.world.coil_temp.load(),
        );

        if self.monitor.shutdown() && self.world.mode() != Mode::Alarm {
            self.controller
                .lock()
                .expect("controller mutex poisoned")
                .enter(Mode::Alarm, now);
        }
    }
}
