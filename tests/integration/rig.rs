//! Shared test rig: a fully-wired unit on in-memory adapters.

use std::sync::{Arc, Mutex};

use reeferd::adapters::memory::{FixedProbes, MemoryGpio, StaticNet};
use reeferd::alarm::AlarmMonitor;
use reeferd::config::ConfigStore;
use reeferd::control::relays::{RelayDriver, RelaySettings};
use reeferd::control::Controller;
use reeferd::logs::EventLog;
use reeferd::runtime::RunAccumulator;
use reeferd::sim::DemoUnit;
use reeferd::tasks::alarm::AlarmTask;
use reeferd::tasks::input::InputTask;
use reeferd::tasks::sensor::SensorTask;
use reeferd::world::WorldState;

/// Boot epoch used by every scenario.
pub const T0: u64 = 1_700_000_000;

pub struct Rig {
    _dir: tempfile::TempDir,
    pub world: Arc<WorldState>,
    pub store: Arc<ConfigStore>,
    pub monitor: Arc<AlarmMonitor>,
    pub probes: FixedProbes,
    pub gpio: MemoryGpio,
    pub net: Arc<StaticNet>,
    pub sensor: SensorTask,
    pub alarm: AlarmTask,
    pub input: InputTask,
}

impl Rig {
    /// Build a unit with active-low relays and all defaults, then apply
    /// `(key, value)` config overrides.
    pub fn new(overrides: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::open(dir.path().join("config.env")).unwrap());
        // Probe ids route FixedProbes reads by suffix.
        store.set("sensor.return", "28-000000-return").unwrap();
        store.set("sensor.supply", "28-000000-supply").unwrap();
        store.set("sensor.coil", "28-000000-coil").unwrap();
        for (key, value) in overrides {
            store.set(key, value).unwrap();
        }
        let settings = store.settings();

        let setpoint: f32 = store.get("unit.setpoint").parse().unwrap();
        let world = Arc::new(WorldState::new(setpoint, 0, T0));
        let events = Arc::new(EventLog::new(dir.path().join("logs"), true));
        let monitor = Arc::new(AlarmMonitor::new(world.clone(), events.clone()));
        let net = Arc::new(StaticNet::new(Some("192.168.4.21"), true));
        let gpio = MemoryGpio::new();
        let probes = FixedProbes::new(60.0, 55.0, 50.0);

        let accumulator = RunAccumulator::new(world.clone(), store.clone(), events.clone());
        let relays = RelayDriver::new(
            Box::new(gpio.clone()),
            RelaySettings {
                active_low: settings.relay_active_low,
                fan_continuous: settings.fan_continuous,
                electric_heat: settings.electric_heat,
            },
            accumulator,
        );
        let controller = Arc::new(Mutex::new(Controller::new(
            world.clone(),
            store.clone(),
            events.clone(),
            monitor.clone(),
            relays,
        )));
        controller.lock().unwrap().apply_initial(T0);

        let sensor = SensorTask::new(
            world.clone(),
            store.clone(),
            events.clone(),
            controller.clone(),
            Box::new(probes.clone()),
            DemoUnit::new(),
        );
        let alarm = AlarmTask::new(world.clone(), monitor.clone(), controller.clone());
        let input = InputTask::new(
            world.clone(),
            store.clone(),
            events,
            monitor.clone(),
            net.clone(),
            Box::new(gpio.clone()),
        );

        Self {
            _dir: dir,
            world,
            store,
            monitor,
            probes,
            gpio,
            net,
            sensor,
            alarm,
            input,
        }
    }

    /// One combined second: sensor tick then alarm evaluation.
    pub fn second(&mut self, now: u64) {
        self.sensor.tick_once(now);
        self.alarm.evaluate_once(now);
    }
}
