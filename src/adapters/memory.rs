//! In-memory adapters for demo mode and tests.
//!
//! Every adapter records what the core asked of it so tests can assert on
//! the full command history without touching real hardware.  Demo mode
//! reuses the same types: a unit with no LCD transport linked still runs
//! its full render pipeline against [`MemoryDisplay`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::error::GpioError;
use crate::ports::{
    Button, ButtonPort, DisplayPort, IndicatorPort, NetControl, ProbeBus, Relay, RelayPort, Rgb,
    SecureLink,
};

// ───────────────────────────────────────────────────────────────
// GPIO
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct GpioInner {
    /// Last written line level per relay; `None` until first write.
    relays: [Option<bool>; 4],
    /// Raw line level per button.  Pull-ups mean released reads high.
    buttons: [bool; 4],
}

/// Shared in-memory pin map.  Clones share state, letting a test hold one
/// handle while the relay driver and button task own their boxed copies.
#[derive(Clone)]
pub struct MemoryGpio {
    inner: Arc<Mutex<GpioInner>>,
}

impl MemoryGpio {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(GpioInner {
                relays: [None; 4],
                buttons: [true; 4],
            })),
        }
    }

    /// Last written line level, `None` if the relay was never driven.
    pub fn level(&self, relay: Relay) -> Option<bool> {
        self.inner.lock().unwrap().relays[relay_index(relay)]
    }

    /// Press or release a button (handles the active-low mapping).
    pub fn set_pressed(&self, button: Button, pressed: bool) {
        self.inner.lock().unwrap().buttons[button_index(button)] = !pressed;
    }
}

impl Default for MemoryGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayPort for MemoryGpio {
    fn write(&mut self, relay: Relay, level: bool) -> Result<(), GpioError> {
        self.inner.lock().unwrap().relays[relay_index(relay)] = Some(level);
        Ok(())
    }
}

impl ButtonPort for MemoryGpio {
    fn read(&mut self, button: Button) -> Result<bool, GpioError> {
        Ok(self.inner.lock().unwrap().buttons[button_index(button)])
    }
}

fn relay_index(relay: Relay) -> usize {
    match relay {
        Relay::Compressor => 0,
        Relay::Fan => 1,
        Relay::Valve => 2,
        Relay::ElectricHeater => 3,
    }
}

fn button_index(button: Button) -> usize {
    match button {
        Button::Up => 0,
        Button::Down => 1,
        Button::Defrost => 2,
        Button::Alarm => 3,
    }
}

// ───────────────────────────────────────────────────────────────
// Display
// ───────────────────────────────────────────────────────────────

struct DisplayInner {
    cells: [[[char; 20]; 4]; 2],
    backlight: bool,
    writes: usize,
}

/// Two 4×20 character grids with a write counter for diff assertions.
#[derive(Clone)]
pub struct MemoryDisplay {
    inner: Arc<Mutex<DisplayInner>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DisplayInner {
                cells: [[[' '; 20]; 4]; 2],
                backlight: true,
                writes: 0,
            })),
        }
    }

    /// One rendered line as a string.
    pub fn line(&self, display: usize, row: usize) -> String {
        self.inner.lock().unwrap().cells[display][row].iter().collect()
    }

    /// Total cell writes seen, for asserting the diff policy.
    pub fn cell_writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }

    pub fn backlight(&self) -> bool {
        self.inner.lock().unwrap().backlight
    }
}

impl Default for MemoryDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayPort for MemoryDisplay {
    fn write_cells(&mut self, display: u8, row: u8, cells: &[(u8, char)]) -> Result<(), GpioError> {
        let mut inner = self.inner.lock().unwrap();
        for &(col, glyph) in cells {
            inner.cells[display as usize][row as usize][col as usize] = glyph;
            inner.writes += 1;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), GpioError> {
        let mut inner = self.inner.lock().unwrap();
        inner.cells = [[[' '; 20]; 4]; 2];
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), GpioError> {
        self.inner.lock().unwrap().backlight = on;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Indicator
// ───────────────────────────────────────────────────────────────

/// Records the most recent lamp colours.
#[derive(Clone)]
pub struct MemoryIndicator {
    lamps: Arc<Mutex<[Rgb; 2]>>,
}

impl MemoryIndicator {
    pub fn new() -> Self {
        Self {
            lamps: Arc::new(Mutex::new([(0, 0, 0); 2])),
        }
    }

    pub fn lamps(&self) -> [Rgb; 2] {
        *self.lamps.lock().unwrap()
    }
}

impl Default for MemoryIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorPort for MemoryIndicator {
    fn set(&mut self, lamps: [Rgb; 2]) -> Result<(), GpioError> {
        *self.lamps.lock().unwrap() = lamps;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), GpioError> {
        *self.lamps.lock().unwrap() = [(0, 0, 0); 2];
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Secure link
// ───────────────────────────────────────────────────────────────

struct LinkInner {
    sent: Vec<Value>,
    replies: VecDeque<Value>,
}

/// Canned-reply telemetry link: records every payload, pops scripted
/// replies in order, and answers `{"status": "ok"}` when the script runs
/// dry.
#[derive(Clone)]
pub struct CannedLink {
    inner: Arc<Mutex<LinkInner>>,
}

impl CannedLink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LinkInner {
                sent: Vec::new(),
                replies: VecDeque::new(),
            })),
        }
    }

    pub fn push_reply(&self, reply: Value) {
        self.inner.lock().unwrap().replies.push_back(reply);
    }

    pub fn sent(&self) -> Vec<Value> {
        self.inner.lock().unwrap().sent.clone()
    }
}

impl Default for CannedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureLink for CannedLink {
    fn exchange(&mut self, payload: &Value, _timeout: Duration) -> anyhow::Result<Value> {
        let mut inner = self.inner.lock().unwrap();
        inner.sent.push(payload.clone());
        Ok(inner
            .replies
            .pop_front()
            .unwrap_or_else(|| serde_json::json!({ "status": "ok" })))
    }
}

// ───────────────────────────────────────────────────────────────
// Network control
// ───────────────────────────────────────────────────────────────

/// Fixed-address network stub with a hotspot latch.
pub struct StaticNet {
    wlan_ip: Option<String>,
    hotspot_ip: Mutex<Option<String>>,
    connected: AtomicBool,
    hotspot_requested: AtomicBool,
}

impl StaticNet {
    pub fn new(wlan_ip: Option<&str>, connected: bool) -> Self {
        Self {
            wlan_ip: wlan_ip.map(str::to_string),
            hotspot_ip: Mutex::new(None),
            connected: AtomicBool::new(connected),
            hotspot_requested: AtomicBool::new(false),
        }
    }

    pub fn hotspot_requested(&self) -> bool {
        self.hotspot_requested.load(Ordering::Acquire)
    }

    pub fn set_hotspot_ip(&self, ip: Option<&str>) {
        *self.hotspot_ip.lock().unwrap() = ip.map(str::to_string);
    }
}

impl NetControl for StaticNet {
    fn wlan_ip(&self) -> Option<String> {
        self.wlan_ip.clone()
    }

    fn hotspot_ip(&self) -> Option<String> {
        self.hotspot_ip.lock().unwrap().clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn start_hotspot(&self) {
        self.hotspot_requested.store(true, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// Probe stub
// ───────────────────────────────────────────────────────────────

/// Fixed-value probe bus for wiring tests.
#[derive(Clone)]
pub struct FixedProbes {
    temps: Arc<Mutex<(f32, f32, f32)>>,
}

impl FixedProbes {
    /// `(return, supply, coil)` in °F, keyed by sensor-id suffixes
    /// `-return`, `-supply`, anything else reads as coil.
    pub fn new(return_t: f32, supply_t: f32, coil_t: f32) -> Self {
        Self {
            temps: Arc::new(Mutex::new((return_t, supply_t, coil_t))),
        }
    }

    pub fn set(&self, return_t: f32, supply_t: f32, coil_t: f32) {
        *self.temps.lock().unwrap() = (return_t, supply_t, coil_t);
    }
}

impl ProbeBus for FixedProbes {
    fn read_temp_f(&mut self, sensor_id: &str) -> Result<f32, crate::error::ProbeError> {
        let (r, s, c) = *self.temps.lock().unwrap();
        if sensor_id.ends_with("-return") {
            Ok(r)
        } else if sensor_id.ends_with("-supply") {
            Ok(s)
        } else {
            Ok(c)
        }
    }
}
