//! Compressor-run accumulator.
//!
//! Observes the compressor-requested bit on every relay write (the relay
//! driver calls [`RunAccumulator::observe`] under the status mutex, so
//! each edge is seen exactly once).  The running total counts only closed
//! on-intervals; the in-progress interval is added at its off-edge and the
//! total is persisted right there, so a crash loses at most one open
//! interval.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::logs::EventLog;
use crate::world::WorldState;

pub struct RunAccumulator {
    world: Arc<WorldState>,
    store: Arc<ConfigStore>,
    events: Arc<EventLog>,
    last_on: bool,
}

impl RunAccumulator {
    pub fn new(world: Arc<WorldState>, store: Arc<ConfigStore>, events: Arc<EventLog>) -> Self {
        Self {
            world,
            store,
            events,
            last_on: false,
        }
    }

    /// Feed one observation of the compressor-requested bit.
    pub fn observe(&mut self, on: bool, now: u64) {
        let timers = &self.world.timers;
        match (self.last_on, on) {
            (false, true) => {
                timers.compressor_on_start.store(now, Ordering::Release);
            }
            (true, false) => {
                let started = timers.compressor_on_start.swap(0, Ordering::AcqRel);
                if started != 0 {
                    let interval = now.saturating_sub(started);
                    let total =
                        timers.compressor_on_total.fetch_add(interval, Ordering::AcqRel) + interval;
                    self.persist(total);
                }
            }
            _ => {}
        }
        self.last_on = on;
    }

    /// Closed-interval total in seconds.
    pub fn total_seconds(&self) -> u64 {
        self.world.timers.compressor_on_total.load(Ordering::Acquire)
    }

    fn persist(&self, total: u64) {
        if let Err(e) = self
            .store
            .set("unit.compressor_run_seconds", &total.to_string())
        {
            self.events
                .error(&format!("Failed to persist compressor run seconds: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make() -> (tempfile::TempDir, RunAccumulator, Arc<WorldState>, Arc<ConfigStore>) {
        let dir = tempdir().unwrap();
        let world = Arc::new(WorldState::new(55.0, 0, 1_000_000));
        let store = Arc::new(ConfigStore::open(dir.path().join("config.env")).unwrap());
        let events = Arc::new(EventLog::new(dir.path().join("logs"), false));
        let acc = RunAccumulator::new(world.clone(), store.clone(), events);
        (dir, acc, world, store)
    }

    #[test]
    fn on_edge_records_start_without_adding() {
        let (_dir, mut acc, world, _store) = make();
        acc.observe(true, 1_000_000);
        assert_eq!(acc.total_seconds(), 0);
        assert_eq!(
            world.timers.compressor_on_start.load(Ordering::Relaxed),
            1_000_000
        );
    }

    #[test]
    fn off_edge_closes_interval_and_persists() {
        let (_dir, mut acc, world, store) = make();
        acc.observe(true, 1_000_000);
        acc.observe(false, 1_000_090);
        assert_eq!(acc.total_seconds(), 90);
        assert_eq!(world.timers.compressor_on_start.load(Ordering::Relaxed), 0);
        assert_eq!(store.get("unit.compressor_run_seconds"), "90");
    }

    #[test]
    fn steady_state_is_a_no_op() {
        let (_dir, mut acc, _world, _store) = make();
        acc.observe(true, 1_000_000);
        acc.observe(true, 1_000_050);
        acc.observe(false, 1_000_100);
        acc.observe(false, 1_000_200);
        assert_eq!(acc.total_seconds(), 100);
    }

    #[test]
    fn total_is_non_decreasing_across_cycles() {
        let (_dir, mut acc, _world, _store) = make();
        let mut last = 0;
        let mut now = 1_000_000;
        for run in [30u64, 120, 5, 600] {
            acc.observe(true, now);
            now += run;
            acc.observe(false, now);
            now += 60;
            let total = acc.total_seconds();
            assert!(total >= last);
            last = total;
        }
        assert_eq!(last, 30 + 120 + 5 + 600);
    }

    #[test]
    fn persisted_total_restores_as_initial_value() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ConfigStore::open(dir.path().join("config.env")).unwrap());
        store.set("unit.compressor_run_seconds", "4321").unwrap();

        let restored: u64 = store.get("unit.compressor_run_seconds").parse().unwrap();
        let world = Arc::new(WorldState::new(55.0, restored, 2_000_000));
        let events = Arc::new(EventLog::new(dir.path().join("logs"), false));
        let mut acc = RunAccumulator::new(world, store, events);
        assert_eq!(acc.total_seconds(), 4321);
        acc.observe(true, 2_000_000);
        acc.observe(false, 2_000_010);
        assert_eq!(acc.total_seconds(), 4331);
    }
}
