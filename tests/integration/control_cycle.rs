//! Cooling cycle, anti-cycle, defrost, and effectiveness scenarios.

use std::sync::atomic::Ordering;

use reeferd::ports::Relay;
use reeferd::world::Mode;

use crate::rig::{Rig, T0};

#[test]
fn cool_to_null_cycle_stamps_the_stop_timer() {
    let mut rig = Rig::new(&[("compressor.off_timer", "1"), ("unit.setpoint", "55")]);

    rig.probes.set(60.0, 55.0, 50.0);
    rig.second(T0);
    assert_eq!(rig.world.mode(), Mode::Cooling);
    // Active-low unit: energised compressor drives the line low.
    assert_eq!(rig.gpio.level(Relay::Compressor), Some(false));

    rig.probes.set(55.0, 50.0, 50.0);
    rig.second(T0 + 1);
    assert_eq!(rig.world.mode(), Mode::Null);
    assert_eq!(rig.gpio.level(Relay::Compressor), Some(true));
    assert_eq!(
        rig.world.timers.compressor_last_stop.load(Ordering::Relaxed),
        T0 + 1
    );
}

#[test]
fn anti_cycle_holds_then_releases() {
    let mut rig = Rig::new(&[("compressor.off_timer", "1"), ("unit.setpoint", "55")]);

    // Run a cycle down to Null.
    rig.probes.set(60.0, 55.0, 50.0);
    rig.second(T0);
    rig.probes.set(55.0, 50.0, 50.0);
    rig.second(T0 + 1);
    assert_eq!(rig.world.mode(), Mode::Null);

    // Box warms right back up: held off by the anti-cycle window.
    rig.probes.set(57.0, 52.0, 50.0);
    rig.second(T0 + 2);
    assert_eq!(rig.world.mode(), Mode::Null);
    assert!(rig.world.flags.anti_timer_active.load(Ordering::Relaxed));

    // One minute after the stop, the window opens.
    rig.second(T0 + 1 + 60);
    assert_eq!(rig.world.mode(), Mode::Cooling);
    assert!(!rig.world.flags.anti_timer_active.load(Ordering::Relaxed));
}

#[test]
fn defrost_timeout_warns_and_returns_to_null() {
    let mut rig = Rig::new(&[("unit.setpoint", "55")]);

    // Manual trigger with a frosted coil.
    rig.world.flags.trigger_defrost.store(true, Ordering::Release);
    rig.probes.set(55.0, 50.0, 20.0);
    rig.second(T0);
    assert_eq!(rig.world.mode(), Mode::Defrost);

    // Coil never warms; the timeout (45 min) forces the exit.
    rig.second(T0 + 45 * 60);
    assert_eq!(rig.world.mode(), Mode::Null);
    assert!(rig.world.flags.warning_alarm.load(Ordering::Relaxed));
    assert!(!rig.world.flags.shutdown_alarm.load(Ordering::Relaxed));
    assert_eq!(rig.monitor.codes(), vec![1004]);
}

#[test]
fn ineffective_cooling_shuts_the_unit_down() {
    let mut rig = Rig::new(&[("unit.setpoint", "40")]);

    // Warm box, supply barely below return: compressor runs, box stalls.
    rig.probes.set(50.0, 47.0, 41.0);
    rig.second(T0);
    assert_eq!(rig.world.mode(), Mode::Cooling);

    // Hold the stall for the full 30-minute window.
    rig.second(T0 + 15 * 60);
    assert_eq!(rig.world.mode(), Mode::Cooling);
    rig.second(T0 + 30 * 60);

    assert_eq!(rig.world.mode(), Mode::Alarm);
    assert!(rig.monitor.shutdown());
    assert_eq!(rig.monitor.codes(), vec![1001]);
    // Every relay de-energised (line high on an active-low unit).
    for relay in Relay::ALL {
        assert_eq!(rig.gpio.level(relay), Some(true), "{relay:?}");
    }

    // Productive control stays suppressed until reset.
    rig.second(T0 + 30 * 60 + 1);
    assert_eq!(rig.world.mode(), Mode::Alarm);

    rig.monitor.reset();
    rig.second(T0 + 30 * 60 + 2);
    assert_eq!(rig.world.mode(), Mode::Null);
}

#[test]
fn dead_return_probe_forces_shutdown_2000() {
    let mut rig = Rig::new(&[]);
    rig.probes
        .set(reeferd::world::TEMP_SENTINEL, 50.0, 45.0);
    rig.second(T0);
    assert_eq!(rig.world.mode(), Mode::Alarm);
    assert!(rig.monitor.codes().contains(&2000));
}

#[test]
fn fan_continuous_keeps_the_fan_on_in_null() {
    let mut rig = Rig::new(&[("unit.fan_continuous", "1"), ("unit.setpoint", "55")]);
    rig.probes.set(55.5, 50.0, 50.0);
    rig.second(T0);
    assert_eq!(rig.world.mode(), Mode::Null);
    let status = rig.world.status_snapshot();
    assert!(status.fan, "fan-requested bit forced on");
    assert_eq!(rig.gpio.level(Relay::Fan), Some(false), "energised line");
}
