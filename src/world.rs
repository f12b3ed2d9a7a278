//! Shared world state.
//!
//! One logical object, physically split into independently-synchronised
//! cells so unrelated tasks never contend:
//!
//! * scalar cells (temperatures, setpoint, timers, flags) are atomics and
//!   may be read or written lock-free from any task;
//! * the multi-field [`StatusMap`] (mode + requested relay states) is the
//!   only invariant block and sits behind a single mutex, held briefly
//!   during mode transitions and relay writes.
//!
//! Each cell has exactly one writer; every other task reads a snapshot.
//! The alarm flags are written by the alarm engine and read by the control
//! evaluator, which breaks the alarm/control dependency cycle without any
//! shared object references.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

/// Published when a probe fails to convert or reads out of range.
pub const TEMP_SENTINEL: f32 = -327.0;

/// Current wall-clock time in whole seconds.
///
/// Timers are epoch seconds throughout: the persisted compressor-run
/// counter is defined in seconds and all control arithmetic uses
/// saturating subtraction, so a clock step backwards cannot underflow.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Round a temperature to 0.1 °F, preserving the sentinel.
pub fn round_tenth(value: f32) -> f32 {
    if value == TEMP_SENTINEL {
        return value;
    }
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Atomic f32
// ---------------------------------------------------------------------------

/// An `f32` cell with atomic replace semantics, bit-cast through `u32`.
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------

/// The unit's operating mode.  Only the mode-entry functions in the control
/// evaluator mutate this, always together with the relay vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Null,
    Cooling,
    Heating,
    Defrost,
    Alarm,
}

impl Mode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Cooling => "Cooling",
            Self::Heating => "Heating",
            Self::Defrost => "Defrost",
            Self::Alarm => "Alarm",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Status map
// ---------------------------------------------------------------------------

/// The authoritative mode + requested relay tuple.
///
/// Boolean fields are *requested* states; the relay driver applies the
/// unit's active-low/active-high polarity on the way to the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMap {
    pub mode: Mode,
    pub compressor: bool,
    pub fan: bool,
    pub valve: bool,
    pub electric_heater: bool,
}

impl StatusMap {
    /// Boot state: everything off, mode Null.
    pub fn initial() -> Self {
        Self {
            mode: Mode::Null,
            compressor: false,
            fan: false,
            valve: false,
            electric_heater: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Timers and flags
// ---------------------------------------------------------------------------

/// Monotonic bookkeeping timestamps, all epoch seconds.
pub struct Timers {
    /// Last transition into Null; seeds the anti-cycle window.
    pub compressor_last_stop: AtomicU64,
    /// Last exit from Defrost; seeds the defrost interval.
    pub defrost_last: AtomicU64,
    /// Zero when no defrost is in progress, else the entry time.
    pub defrost_start: AtomicU64,
    /// Entry time of the current mode; drives the on-display elapsed counter.
    pub state_entered: AtomicU64,
    /// Start of the in-progress compressor-on interval, zero when off.
    pub compressor_on_start: AtomicU64,
    /// Closed compressor-on seconds; persisted on every off-edge.
    pub compressor_on_total: AtomicU64,
}

/// Lock-free boolean cells shared between tasks.
pub struct Flags {
    /// Cleared by SIGINT; every task observes it at each sleep boundary.
    pub running: AtomicBool,
    /// Probe reads come from the simulator instead of hardware.
    pub demo_mode: AtomicBool,
    /// Delegate the control tick to the pretrip sequencer.
    pub pretrip_enable: AtomicBool,
    /// One-shot manual defrost request (button, API, or telemetry command).
    pub trigger_defrost: AtomicBool,
    /// The anti-cycle window is currently holding the compressor off.
    pub anti_timer_active: AtomicBool,
    /// The setpoint-edit UI is active (display flashes the setpoint line).
    pub setpoint_edit: AtomicBool,
    /// A shutdown alarm is latched; productive modes are suppressed.
    pub shutdown_alarm: AtomicBool,
    /// A warning alarm is latched; control continues.
    pub warning_alarm: AtomicBool,
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// Everything the tasks share.  Constructed once at boot and handed to each
/// task inside an `Arc`; no task ever re-creates or replaces it.
pub struct WorldState {
    pub return_temp: AtomicF32,
    pub supply_temp: AtomicF32,
    pub coil_temp: AtomicF32,
    pub setpoint: AtomicF32,
    pub status: Mutex<StatusMap>,
    pub timers: Timers,
    pub flags: Flags,
}

/// Seed subtracted from the boot time for the stop/defrost timers so a
/// freshly started unit is not pinned in the anti-cycle window.
const TIMER_BACKDATE_SECS: u64 = 400;

impl WorldState {
    /// Build the boot-time world.
    ///
    /// * `setpoint` — the persisted setpoint, already clamped by config.
    /// * `run_seconds` — the persisted compressor-run total.
    /// * `now` — current epoch seconds.
    pub fn new(setpoint: f32, run_seconds: u64, now: u64) -> Self {
        let backdated = now.saturating_sub(TIMER_BACKDATE_SECS);
        Self {
            return_temp: AtomicF32::new(TEMP_SENTINEL),
            supply_temp: AtomicF32::new(TEMP_SENTINEL),
            coil_temp: AtomicF32::new(TEMP_SENTINEL),
            setpoint: AtomicF32::new(setpoint),
            status: Mutex::new(StatusMap::initial()),
            timers: Timers {
                compressor_last_stop: AtomicU64::new(backdated),
                defrost_last: AtomicU64::new(now),
                defrost_start: AtomicU64::new(0),
                state_entered: AtomicU64::new(now),
                compressor_on_start: AtomicU64::new(0),
                compressor_on_total: AtomicU64::new(run_seconds),
            },
            flags: Flags {
                running: AtomicBool::new(true),
                demo_mode: AtomicBool::new(false),
                pretrip_enable: AtomicBool::new(false),
                trigger_defrost: AtomicBool::new(false),
                anti_timer_active: AtomicBool::new(false),
                setpoint_edit: AtomicBool::new(false),
                shutdown_alarm: AtomicBool::new(false),
                warning_alarm: AtomicBool::new(false),
            },
        }
    }

    /// Snapshot of the status block.
    pub fn status_snapshot(&self) -> StatusMap {
        *self.status.lock().expect("status mutex poisoned")
    }

    /// Current mode, read under the status mutex.
    pub fn mode(&self) -> Mode {
        self.status_snapshot().mode
    }

    pub fn running(&self) -> bool {
        self.flags.running.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.flags.running.store(false, Ordering::Release);
    }

    /// Publish a probe reading, rounded to 0.1 °F with the sentinel kept.
    pub fn publish_temps(&self, return_t: f32, supply_t: f32, coil_t: f32) {
        self.return_temp.store(round_tenth(return_t));
        self.supply_temp.store(round_tenth(supply_t));
        self.coil_temp.store(round_tenth(coil_t));
    }
}
