//! Schema-validated configuration store.
//!
//! The on-disk format is a dotenv-style `KEY=VALUE` file.  Every key is
//! declared in a static schema with a type (Integer, Boolean, Text) and a
//! default; unknown keys and type-invalid values are rejected on write, and
//! defaults are materialised on first boot.  File writes happen under an
//! advisory exclusive lock so the daemon and external tooling (config
//! editor, API collaborator) never interleave partial writes.
//!
//! [`Settings`] is the typed, unit-converted view the tasks actually
//! consume.  It is re-parsed whenever a value changes and handed out by
//! cheap clone, keeping reads on the hot path lock-light.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use fs2::FileExt;
use log::warn;

use crate::error::ConfigError;

/// Value type a schema key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Boolean,
    Text,
}

/// (key, default, kind) rows.  Kept sorted for a stable file layout.
const SCHEMA: &[(&str, &str, ValueKind)] = &[
    ("api.key", "", ValueKind::Text),
    ("api.port", "8443", ValueKind::Integer),
    ("client.ca_file", "/etc/reeferd/ca.pem", ValueKind::Text),
    ("client.cert_file", "/etc/reeferd/client.pem", ValueKind::Text),
    ("client.key_file", "/etc/reeferd/client.key", ValueKind::Text),
    ("client.sent_mins", "5", ValueKind::Integer),
    ("client.server_ip", "127.0.0.1", ValueKind::Text),
    ("client.server_port", "9443", ValueKind::Integer),
    ("compressor.off_timer", "5", ValueKind::Integer),
    ("debug.code", "1", ValueKind::Integer),
    ("debug.enable_send_data", "0", ValueKind::Boolean),
    ("defrost.coil_temperature", "45", ValueKind::Integer),
    ("defrost.interval_hours", "8", ValueKind::Integer),
    ("defrost.timeout_mins", "45", ValueKind::Integer),
    ("logging.interval_sec", "300", ValueKind::Integer),
    ("logging.retention_period", "30", ValueKind::Integer),
    ("sensor.coil", "0", ValueKind::Text),
    ("sensor.return", "0", ValueKind::Text),
    ("sensor.supply", "0", ValueKind::Text),
    ("setpoint.high_limit", "80", ValueKind::Integer),
    ("setpoint.low_limit", "-20", ValueKind::Integer),
    ("setpoint.offset", "2", ValueKind::Integer),
    ("trl.number", "1234", ValueKind::Integer),
    ("unit.compressor_run_seconds", "0", ValueKind::Integer),
    ("unit.electric_heat", "1", ValueKind::Boolean),
    ("unit.fan_continuous", "0", ValueKind::Boolean),
    ("unit.number", "1", ValueKind::Integer),
    ("unit.relay_active_low", "1", ValueKind::Boolean),
    ("unit.setpoint", "55", ValueKind::Integer),
    ("wifi.enable_hotspot", "1", ValueKind::Boolean),
    ("wifi.hotspot_password", "reefer-service", ValueKind::Text),
];

fn schema_entry(key: &str) -> Option<&'static (&'static str, &'static str, ValueKind)> {
    SCHEMA.iter().find(|(k, _, _)| *k == key)
}

fn validate(kind: ValueKind, value: &str) -> bool {
    match kind {
        ValueKind::Integer => value.parse::<i64>().is_ok(),
        ValueKind::Boolean => value == "0" || value == "1",
        ValueKind::Text => true,
    }
}

// ---------------------------------------------------------------------------
// Typed settings view
// ---------------------------------------------------------------------------

/// Typed, unit-converted snapshot of the configuration.
///
/// Durations are normalised to seconds here so the control evaluator never
/// multiplies units at decision time.
#[derive(Debug, Clone)]
pub struct Settings {
    pub unit_number: i64,
    pub trl_number: i64,
    /// Anti-cycle minimum off duration.
    pub off_timer_secs: u64,
    /// Hysteresis band around the setpoint.
    pub offset: f32,
    pub defrost_interval_secs: u64,
    pub defrost_timeout_secs: u64,
    /// Coil temperature above which defrost terminates.
    pub defrost_coil_temp: f32,
    pub setpoint_low: f32,
    pub setpoint_high: f32,
    pub fan_continuous: bool,
    pub electric_heat: bool,
    pub relay_active_low: bool,
    pub sensor_return: String,
    pub sensor_supply: String,
    pub sensor_coil: String,
    pub logging_interval_secs: u64,
    pub log_retention_days: u64,
    pub debug_events: bool,
    pub send_data: bool,
    pub telemetry_interval_secs: u64,
    pub server_ip: String,
    pub server_port: u16,
    pub hotspot_enabled: bool,
}

impl Settings {
    fn from_values(values: &BTreeMap<String, String>) -> Self {
        let int = |key: &str| -> i64 {
            values
                .get(key)
                .and_then(|v| v.parse().ok())
                .or_else(|| schema_entry(key).and_then(|(_, d, _)| d.parse().ok()))
                .unwrap_or(0)
        };
        let text = |key: &str| -> String {
            values
                .get(key)
                .cloned()
                .or_else(|| schema_entry(key).map(|(_, d, _)| d.to_string()))
                .unwrap_or_default()
        };
        let flag = |key: &str| int(key) == 1;

        Self {
            unit_number: int("unit.number"),
            trl_number: int("trl.number"),
            off_timer_secs: int("compressor.off_timer").max(0) as u64 * 60,
            offset: int("setpoint.offset") as f32,
            defrost_interval_secs: int("defrost.interval_hours").max(0) as u64 * 3600,
            defrost_timeout_secs: int("defrost.timeout_mins").max(0) as u64 * 60,
            defrost_coil_temp: int("defrost.coil_temperature") as f32,
            setpoint_low: int("setpoint.low_limit") as f32,
            setpoint_high: int("setpoint.high_limit") as f32,
            fan_continuous: flag("unit.fan_continuous"),
            electric_heat: flag("unit.electric_heat"),
            relay_active_low: flag("unit.relay_active_low"),
            sensor_return: text("sensor.return"),
            sensor_supply: text("sensor.supply"),
            sensor_coil: text("sensor.coil"),
            logging_interval_secs: int("logging.interval_sec").max(0) as u64,
            log_retention_days: int("logging.retention_period").max(0) as u64,
            debug_events: int("debug.code") == 1,
            send_data: flag("debug.enable_send_data"),
            telemetry_interval_secs: int("client.sent_mins").max(0) as u64 * 60,
            server_ip: text("client.server_ip"),
            server_port: int("client.server_port").clamp(0, u16::MAX as i64) as u16,
            hotspot_enabled: flag("wifi.enable_hotspot"),
        }
    }

    /// Clamp a requested setpoint to the configured window and round to
    /// 0.1 °F.  Repeated application is a fixed point.
    pub fn clamp_setpoint(&self, requested: f32) -> f32 {
        crate::world::round_tenth(requested.clamp(self.setpoint_low, self.setpoint_high))
    }

    /// True when a sensor id has never been configured.
    pub fn sensors_unconfigured(&self) -> bool {
        self.sensor_return == "0" || self.sensor_supply == "0" || self.sensor_coil == "0"
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The shared configuration store.
///
/// Raw strings live behind a mutex (writers only); the parsed [`Settings`]
/// snapshot lives behind an `RwLock` and is rebuilt after every accepted
/// write.  Readers clone the snapshot.
pub struct ConfigStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
    parsed: RwLock<Settings>,
}

impl ConfigStore {
    /// Open (or create with defaults) the config file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut values: BTreeMap<String, String> = SCHEMA
            .iter()
            .map(|(k, d, _)| (k.to_string(), d.to_string()))
            .collect();

        if path.exists() {
            let body = fs::read_to_string(&path)?;
            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    continue;
                };
                let (key, value) = (key.trim(), value.trim());
                match schema_entry(key) {
                    Some((_, _, kind)) if validate(*kind, value) => {
                        values.insert(key.to_string(), value.to_string());
                    }
                    Some(_) => warn!("config: ignoring invalid value for {key}: {value:?}"),
                    None => warn!("config: ignoring unknown key {key}"),
                }
            }
        }

        let parsed = Settings::from_values(&values);
        let store = Self {
            path,
            values: Mutex::new(values),
            parsed: RwLock::new(parsed),
        };
        // Materialise defaults (and drop unknown keys) on disk.
        store.save_locked(&store.values.lock().expect("config mutex poisoned"))?;
        Ok(store)
    }

    /// The raw string value for `key`, or the schema default.
    pub fn get(&self, key: &str) -> String {
        self.values
            .lock()
            .expect("config mutex poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Validate, store, and persist one value, then refresh [`Settings`].
    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let Some((_, _, kind)) = schema_entry(key) else {
            return Err(ConfigError::UnknownKey(key.to_string()));
        };
        if !validate(*kind, value) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        let mut values = self.values.lock().expect("config mutex poisoned");
        values.insert(key.to_string(), value.to_string());
        self.save_locked(&values)?;
        *self.parsed.write().expect("settings lock poisoned") = Settings::from_values(&values);
        Ok(())
    }

    /// The current typed snapshot.
    pub fn settings(&self) -> Settings {
        self.parsed.read().expect("settings lock poisoned").clone()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_locked(&self, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = (|| {
            let mut out = &file;
            for (key, value) in values {
                writeln!(out, "{key}={value}")?;
            }
            out.flush()
        })();
        let _ = fs2::FileExt::unlock(&file);
        result.map_err(ConfigError::from)
    }
}
