//! Indicator lamp task: 200 ms refresh, cleared on exit.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::drivers::indicator::IndicatorEngine;
use crate::ports::IndicatorPort;
use crate::world::WorldState;

use super::interruptible_sleep;

const REFRESH_PERIOD_MS: u32 = 200;

pub struct IndicatorTask {
    world: Arc<WorldState>,
    port: Box<dyn IndicatorPort>,
    engine: IndicatorEngine,
}

impl IndicatorTask {
    pub fn new(world: Arc<WorldState>, port: Box<dyn IndicatorPort>) -> Self {
        Self {
            world,
            port,
            engine: IndicatorEngine::new(),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.world.running() {
            self.refresh_once(REFRESH_PERIOD_MS);
            interruptible_sleep(&self.world, Duration::from_millis(REFRESH_PERIOD_MS as u64));
        }
        if let Err(e) = self.port.clear() {
            warn!("indicator clear: {e}");
        }
        Ok(())
    }

    /// One engine tick + lamp write.  Public for the tests.
    pub fn refresh_once(&mut self, delta_ms: u32) {
        let flags = &self.world.flags;
        let lamps = self.engine.tick(
            delta_ms,
            self.world.mode(),
            flags.warning_alarm.load(Ordering::Acquire),
            flags.shutdown_alarm.load(Ordering::Acquire),
        );
        if let Err(e) = self.port.set(lamps) {
            warn!("indicator write: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryIndicator;
    use crate::drivers::indicator::{COLOUR_BLUE, COLOUR_GREEN, COLOUR_YELLOW};
    use crate::world::Mode;

    fn make_task() -> (IndicatorTask, Arc<WorldState>, MemoryIndicator) {
        let world = Arc::new(WorldState::new(55.0, 0, 1_000_000));
        let strip = MemoryIndicator::new();
        let task = IndicatorTask::new(world.clone(), Box::new(strip.clone()));
        (task, world, strip)
    }

    #[test]
    fn healthy_cooling_shows_green_and_blue() {
        let (mut task, world, strip) = make_task();
        world.status.lock().unwrap().mode = Mode::Cooling;
        task.refresh_once(200);
        assert_eq!(strip.lamps(), [COLOUR_GREEN, COLOUR_BLUE]);
    }

    #[test]
    fn shutdown_alarm_wig_wags_the_lamps() {
        let (mut task, world, strip) = make_task();
        world
            .flags
            .shutdown_alarm
            .store(true, Ordering::Release);
        task.refresh_once(200);
        let first = strip.lamps();
        task.refresh_once(250);
        let second = strip.lamps();
        assert_ne!(first, second);
        for lamps in [first, second] {
            assert!(
                lamps == [COLOUR_GREEN, COLOUR_YELLOW] || lamps == [COLOUR_YELLOW, COLOUR_GREEN]
            );
        }
    }
}
