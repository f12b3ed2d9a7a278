//! Port traits — the boundary between the control core and the device and
//! network layers.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ control core
//! ```
//!
//! The production adapters for the I²C LCD transport, the WS2811 DMA
//! strip, the mutually-authenticated TLS client, and the hotspot manager
//! live outside this crate; the demo/in-memory adapters in
//! [`crate::adapters`] satisfy the same traits so the whole core runs and
//! is tested without hardware.  Each device handle has a single owning
//! task; nothing here is shared between threads.

use std::time::Duration;

use serde_json::Value;

use crate::error::{GpioError, ProbeError};

// ───────────────────────────────────────────────────────────────
// Relays and buttons
// ───────────────────────────────────────────────────────────────

/// The four relay outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relay {
    Compressor,
    Fan,
    Valve,
    ElectricHeater,
}

impl Relay {
    pub const ALL: [Relay; 4] = [
        Relay::Compressor,
        Relay::Fan,
        Relay::Valve,
        Relay::ElectricHeater,
    ];

    /// Device-layer pin name.
    pub const fn pin_name(self) -> &'static str {
        match self {
            Self::Compressor => "compressor_pin",
            Self::Fan => "fan_pin",
            Self::Valve => "valve_pin",
            Self::ElectricHeater => "electric_heater_pin",
        }
    }
}

/// The four operator buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Defrost,
    Alarm,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Up, Button::Down, Button::Defrost, Button::Alarm];

    pub const fn pin_name(self) -> &'static str {
        match self {
            Self::Up => "up_button_pin",
            Self::Down => "down_button_pin",
            Self::Defrost => "defrost_pin",
            Self::Alarm => "alarm_pin",
        }
    }
}

/// Write-side GPIO port.  `level` is the physical line level; polarity
/// mapping has already happened in the relay driver.
pub trait RelayPort: Send {
    fn write(&mut self, relay: Relay, level: bool) -> Result<(), GpioError>;
}

/// Read-side GPIO port.  Returns the raw line level; buttons are wired
/// active-low with internal pull-ups, so pressed reads as `false`.
/// Debouncing is the input driver's job.
pub trait ButtonPort: Send {
    fn read(&mut self, button: Button) -> Result<bool, GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Probes
// ───────────────────────────────────────────────────────────────

/// One-wire temperature bus.  Ids look like `28-0316a279f0ff`.
pub trait ProbeBus: Send {
    /// Read one probe and return °F.
    fn read_temp_f(&mut self, sensor_id: &str) -> Result<f32, ProbeError>;
}

// ───────────────────────────────────────────────────────────────
// Displays and indicators
// ───────────────────────────────────────────────────────────────

/// Cell-level writes to the two 4×20 character displays.  The renderer
/// diffs its line buffers and only ships changed cells, keeping I²C
/// traffic minimal.
pub trait DisplayPort: Send {
    /// Write `cells` (column, glyph) on `row` of `display` (0 or 1).
    fn write_cells(&mut self, display: u8, row: u8, cells: &[(u8, char)]) -> Result<(), GpioError>;

    /// Clear both displays.
    fn clear(&mut self) -> Result<(), GpioError>;

    fn set_backlight(&mut self, on: bool) -> Result<(), GpioError>;
}

/// RGB colour triple for the indicator lamps.
pub type Rgb = (u8, u8, u8);

/// The two-lamp indicator strip.
pub trait IndicatorPort: Send {
    /// Lamp 0 is system health, lamp 1 is the mode lamp.
    fn set(&mut self, lamps: [Rgb; 2]) -> Result<(), GpioError>;

    fn clear(&mut self) -> Result<(), GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Network
// ───────────────────────────────────────────────────────────────

/// The remote telemetry exchange: one JSON document out, one JSON
/// document back.  Adapters enforce `timeout` with socket deadlines so a
/// hung peer cannot stall the telemetry task past its timebox.
pub trait SecureLink: Send {
    fn exchange(&mut self, payload: &Value, timeout: Duration) -> anyhow::Result<Value>;
}

/// Wi-Fi / hotspot collaborator.  Methods take `&self`; adapters handle
/// their own interior synchronisation because the handle is shared by the
/// display, telemetry, and button tasks.
pub trait NetControl: Send + Sync {
    /// Station-interface IPv4 address, if associated.
    fn wlan_ip(&self) -> Option<String>;

    /// Hotspot-interface IPv4 address, if the hotspot is up.
    fn hotspot_ip(&self) -> Option<String>;

    /// Cheap reachability probe toward the telemetry server.
    fn is_connected(&self) -> bool;

    /// Request the service hotspot; idempotent when already active.
    fn start_hotspot(&self);
}
