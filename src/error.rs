//! Unified error and alarm-code types.
//!
//! Every fallible boundary in the daemon funnels into one of the small
//! enums below, keeping task-loop error handling uniform.  Alarm codes are
//! the operator-facing vocabulary: they appear on the LCD, in the event
//! log, and in telemetry payloads.

use std::fmt;

// ---------------------------------------------------------------------------
// Alarm codes
// ---------------------------------------------------------------------------

/// Severity class of an alarm code.
///
/// A shutdown alarm suppresses every productive mode until reset; a warning
/// is advisory and control continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Shutdown,
    Warning,
}

/// The complete set of operator-facing alarm codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AlarmCode {
    /// Unit commanded to cool but supply air is not below return air.
    CoolingIneffective = 1001,
    /// Unit commanded to heat but supply air is not above return air.
    HeatingIneffective = 1002,
    /// Defrost ran past its configured timeout and was forced out.
    DefrostTimeout = 1004,
    /// Return-air probe out of range or unreadable.
    ReturnProbeFault = 2000,
    /// Coil probe out of range or unreadable.
    CoilProbeFault = 2001,
    /// Supply-air probe out of range or unreadable.
    SupplyProbeFault = 2002,
    /// Pretrip completed all stages.
    PretripPassed = 9000,
    /// Pretrip stage 1 (cooling) did not reach its target in time.
    PretripCoolFault = 9001,
    /// Pretrip stage 2 (heating) did not reach its target in time.
    PretripHeatFault = 9002,
    /// Pretrip stage 3 (re-cool) did not reach its target in time.
    PretripRecoolFault = 9003,
}

impl AlarmCode {
    /// The numeric code as shown on the LCD and in telemetry.
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn severity(self) -> Severity {
        match self {
            Self::DefrostTimeout | Self::SupplyProbeFault | Self::PretripPassed => {
                Severity::Warning
            }
            _ => Severity::Shutdown,
        }
    }
}

impl fmt::Display for AlarmCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::CoolingIneffective => "Unit not cooling",
            Self::HeatingIneffective => "Unit not heating",
            Self::DefrostTimeout => "Defrost timed out",
            Self::ReturnProbeFault => "Return sensor fault",
            Self::CoilProbeFault => "Coil sensor fault",
            Self::SupplyProbeFault => "Supply sensor fault",
            Self::PretripPassed => "Pretrip passed",
            Self::PretripCoolFault => "Pretrip cooling failed",
            Self::PretripHeatFault => "Pretrip heating failed",
            Self::PretripRecoolFault => "Pretrip re-cool failed",
        };
        write!(f, "{}: {}", self.code(), msg)
    }
}

// ---------------------------------------------------------------------------
// Device-layer errors
// ---------------------------------------------------------------------------

/// A probe could not produce a usable reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The sysfs node for the sensor id could not be opened.
    NotFound(String),
    /// The one-wire CRC line did not report a valid conversion.
    CrcFailed(String),
    /// The temperature field was missing or unparsable.
    BadPayload(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "sensor {id} not found"),
            Self::CrcFailed(id) => write!(f, "sensor {id} CRC check failed"),
            Self::BadPayload(id) => write!(f, "sensor {id} returned no temperature"),
        }
    }
}

impl std::error::Error for ProbeError {}

/// A relay or button operation failed at the device layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// The named pin is not mapped by the adapter.
    UnknownPin(&'static str),
    /// The underlying device write or read failed.
    Io(String),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPin(name) => write!(f, "unknown pin: {name}"),
            Self::Io(msg) => write!(f, "gpio I/O failed: {msg}"),
        }
    }
}

impl std::error::Error for GpioError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from the dotenv-style config store.
#[derive(Debug)]
pub enum ConfigError {
    /// Key is not part of the schema; writes are rejected.
    UnknownKey(String),
    /// Value does not parse as the schema type for its key.
    InvalidValue { key: String, value: String },
    /// Underlying file I/O failed.
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey(key) => write!(f, "unknown config key: {key}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value for {key}: {value:?}")
            }
            Self::Io(e) => write!(f, "config I/O error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
