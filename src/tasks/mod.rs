//! Task supervision and the long-lived task loops.
//!
//! Every task body is a plain `FnMut() -> anyhow::Result<()>` that loops
//! until the shared `running` flag clears and then returns `Ok`.  The
//! supervisor wraps it: an `Err` or a panic is logged as an "Error" event
//! and the body is restarted after one second, for as long as the daemon
//! is running.  This is the sole recovery mechanism — individual tasks
//! never try to heal each other.

pub mod alarm;
pub mod display;
pub mod indicator;
pub mod input;
pub mod sensor;
pub mod telemetry;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::logs::EventLog;
use crate::world::WorldState;

/// Delay between a task failure and its restart.
const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Spawn `task` on its own OS thread under the restart wrapper.
pub fn spawn_supervised<F>(
    name: &'static str,
    world: Arc<WorldState>,
    events: Arc<EventLog>,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            while world.running() {
                match panic::catch_unwind(AssertUnwindSafe(&mut task)) {
                    Ok(Ok(())) => break,
                    Ok(Err(e)) => events.error(&format!("Task {name} failed: {e:#}")),
                    Err(payload) => {
                        events.error(&format!("Task {name} panicked: {}", panic_text(&payload)))
                    }
                }
                if !world.running() {
                    break;
                }
                thread::sleep(RESTART_DELAY);
            }
        })
        .unwrap_or_else(|e| panic!("failed to spawn {name} thread: {e}"))
}

/// Sleep in short slices so shutdown is observed promptly.
pub fn interruptible_sleep(world: &WorldState, total: Duration) {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = total;
    while world.running() && !remaining.is_zero() {
        let nap = remaining.min(SLICE);
        thread::sleep(nap);
        remaining -= nap;
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
