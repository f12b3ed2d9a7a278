//! Pretrip diagnostic driven the way an operator runs it: setpoint 65,
//! long DEFROST press, then the unit walks cool → heat → cool.

use std::sync::atomic::Ordering;

use reeferd::ports::Button;
use reeferd::world::Mode;

use crate::rig::{Rig, T0};

/// Hold a button through the input task for `hold_ms`, then release.
fn hold_button(rig: &mut Rig, button: Button, start_ms: u64, hold_ms: u64) -> u64 {
    rig.gpio.set_pressed(button, true);
    let mut t = start_ms;
    while t < start_ms + hold_ms {
        rig.input.scan_once(t);
        t += 100;
    }
    rig.gpio.set_pressed(button, false);
    rig.input.scan_once(t + 100);
    rig.input.scan_once(t + 200);
    t + 200
}

#[test]
fn pretrip_success_runs_all_stages_and_stands_down() {
    let mut rig = Rig::new(&[("unit.setpoint", "65")]);

    // Long DEFROST press at setpoint 65 arms pretrip.
    hold_button(&mut rig, Button::Defrost, 0, 5_500);
    assert!(rig.world.flags.pretrip_enable.load(Ordering::Relaxed));

    // Stage 1: cooling engages.
    rig.probes.set(50.0, 48.0, 49.0);
    rig.second(T0);
    assert_eq!(rig.world.mode(), Mode::Cooling);

    // Return pulls 4 °F over the coil inside the 10-minute budget.
    rig.probes.set(50.0, 46.0, 45.0);
    rig.second(T0 + 120);
    assert_eq!(rig.world.mode(), Mode::Heating);

    // Stage 2: coil climbs 4 °F over return inside its budget.
    rig.probes.set(50.0, 56.0, 55.0);
    rig.second(T0 + 300);
    assert_eq!(rig.world.mode(), Mode::Cooling);

    // Stage 3: split re-established inside 5 minutes.
    rig.probes.set(50.0, 46.0, 45.0);
    rig.second(T0 + 420);

    assert_eq!(rig.world.mode(), Mode::Null);
    assert!(!rig.world.flags.pretrip_enable.load(Ordering::Relaxed));
    assert!(rig.monitor.warning());
    assert!(!rig.monitor.shutdown());
    assert_eq!(rig.monitor.codes(), vec![9000]);
}

#[test]
fn pretrip_heating_failure_raises_9002() {
    let mut rig = Rig::new(&[("unit.setpoint", "65")]);
    rig.world.flags.pretrip_enable.store(true, Ordering::Release);

    rig.probes.set(50.0, 48.0, 49.0);
    rig.second(T0);
    rig.probes.set(50.0, 46.0, 45.0);
    rig.second(T0 + 60);
    assert_eq!(rig.world.mode(), Mode::Heating);

    // Heat never develops; stage 2 budget is 10 minutes.
    rig.probes.set(50.0, 50.0, 50.0);
    rig.second(T0 + 60 + 600);
    assert_eq!(rig.world.mode(), Mode::Alarm);
    assert_eq!(rig.monitor.codes(), vec![9002]);
    assert!(!rig.world.flags.pretrip_enable.load(Ordering::Relaxed));
}
