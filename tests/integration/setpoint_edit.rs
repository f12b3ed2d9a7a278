//! The full setpoint-edit gesture: enter, step, fast-step, commit.

use std::sync::atomic::Ordering;

use reeferd::ports::Button;

use crate::rig::Rig;

/// Press and release a button through the scan loop; returns the time
/// after the release settled.
fn press(rig: &mut Rig, button: Button, start_ms: u64, hold_ms: u64) -> u64 {
    rig.gpio.set_pressed(button, true);
    let mut t = start_ms;
    while t <= start_ms + hold_ms {
        rig.input.scan_once(t);
        t += 100;
    }
    rig.gpio.set_pressed(button, false);
    rig.input.scan_once(t);
    rig.input.scan_once(t + 100);
    t + 100
}

#[test]
fn edit_session_steps_fast_steps_and_commits() {
    let mut rig = Rig::new(&[("unit.setpoint", "55")]);

    // Hold UP for 2.2 s: edit mode engages.
    let mut t = press(&mut rig, Button::Up, 0, 2_200);
    assert!(rig.world.flags.setpoint_edit.load(Ordering::Relaxed));
    assert_eq!(rig.world.setpoint.load(), 55.0, "entry hold does not step");

    // Four discrete presses: +1 °F each.
    for expected in [56.0, 57.0, 58.0, 59.0] {
        t = press(&mut rig, Button::Up, t + 100, 200);
        assert_eq!(rig.world.setpoint.load(), expected);
    }

    // A 4-second hold escalates to the 5 °F step.
    t = press(&mut rig, Button::Up, t + 100, 4_100);
    assert_eq!(rig.world.setpoint.load(), 65.0, "+1 on the edge, +5 at 4 s");

    // ALARM commits: published value persisted, edit mode closed.
    press(&mut rig, Button::Alarm, t + 100, 200);
    assert!(!rig.world.flags.setpoint_edit.load(Ordering::Relaxed));
    assert_eq!(rig.world.setpoint.load(), 65.0);
    assert_eq!(rig.store.get("unit.setpoint"), "65");
}

#[test]
fn abandoned_edit_reverts_after_ten_seconds() {
    let mut rig = Rig::new(&[("unit.setpoint", "55")]);

    let t = press(&mut rig, Button::Up, 0, 2_200);
    let t = press(&mut rig, Button::Up, t + 100, 200);
    assert_eq!(rig.world.setpoint.load(), 56.0);

    // No input for 10 s: back to the pre-edit value, nothing saved.
    let mut idle = t + 100;
    while idle <= t + 11_000 {
        rig.input.scan_once(idle);
        idle += 100;
    }
    assert!(!rig.world.flags.setpoint_edit.load(Ordering::Relaxed));
    assert_eq!(rig.world.setpoint.load(), 55.0);
    assert_eq!(rig.store.get("unit.setpoint"), "55");
}

#[test]
fn alarm_reset_gesture_clears_an_active_session() {
    let mut rig = Rig::new(&[("unit.setpoint", "55")]);
    rig.monitor.raise(reeferd::error::AlarmCode::DefrostTimeout);
    assert!(rig.monitor.any());

    press(&mut rig, Button::Alarm, 0, 5_500);
    assert!(!rig.monitor.any());
    assert!(rig.monitor.codes().is_empty());
}
