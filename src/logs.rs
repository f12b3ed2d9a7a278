//! Durable event and conditions logs.
//!
//! Two newline-delimited, per-day log families under one directory:
//!
//! * `events-YYYY-MM-DD.log` — `[ts] LEVEL] message`.  Error lines are
//!   always written; Debug lines only when `debug.code = 1`.
//! * `conditions-YYYY-MM-DD.log` — a periodic one-line snapshot of
//!   setpoint, probes, mode, and relay states.
//!
//! Appends take an advisory exclusive lock on the day file so external
//! readers (log downloader, dashboards) never see interleaved partial
//! lines.  A retention sweep deletes files older than the configured
//! number of days.  Every line is mirrored to the process logger.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use fs2::FileExt;
use log::{debug, error, warn};

use crate::world::StatusMap;

/// Event severity, matching the on-disk level tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Error,
    Debug,
}

impl EventLevel {
    const fn tag(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Debug => "Debug",
        }
    }
}

/// Shared handle to the on-disk logs.  Cheap to clone behind an `Arc`.
pub struct EventLog {
    dir: PathBuf,
    debug_enabled: bool,
}

impl EventLog {
    pub fn new(dir: impl Into<PathBuf>, debug_enabled: bool) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("log directory {}: {e}", dir.display());
        }
        Self { dir, debug_enabled }
    }

    pub fn error(&self, message: &str) {
        error!("{message}");
        self.append_event(EventLevel::Error, message);
    }

    pub fn debug(&self, message: &str) {
        debug!("{message}");
        if self.debug_enabled {
            self.append_event(EventLevel::Debug, message);
        }
    }

    /// Append one conditions line.  Sentinel temperatures are written
    /// verbatim; downstream tooling filters on them.
    pub fn conditions(
        &self,
        setpoint: f32,
        return_t: f32,
        coil_t: f32,
        supply_t: f32,
        status: &StatusMap,
    ) {
        let line = format!(
            "{} - Setpoint: {setpoint:.1}, Return Sensor: {return_t:.1}, \
             Coil Sensor: {coil_t:.1}, Supply: {supply_t:.1}, Status: {}, \
             Compressor: {}, Fan: {}, Valve: {}, Electric_heater: {}",
            timestamp(),
            status.mode,
            py_bool(status.compressor),
            py_bool(status.fan),
            py_bool(status.valve),
            py_bool(status.electric_heater),
        );
        debug!("conditions: {line}");
        self.append(&self.day_file("conditions"), &line);
    }

    /// Delete log files older than `days`.
    pub fn clear_old_logs(&self, days: u64) {
        let cutoff = SystemTime::now() - std::time::Duration::from_secs(days * 86_400);
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("log cleanup: {e}");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_log = path.extension().map(|e| e == "log").unwrap_or(false);
            if !is_log {
                continue;
            }
            let old = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|m| m < cutoff)
                .unwrap_or(false);
            if old {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("log cleanup: {}: {e}", path.display());
                } else {
                    debug!("log cleanup: deleted {}", path.display());
                }
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append_event(&self, level: EventLevel, message: &str) {
        let line = format!("[{}] {}] {message}", timestamp(), level.tag());
        self.append(&self.day_file("events"), &line);
    }

    fn day_file(&self, base: &str) -> PathBuf {
        self.dir
            .join(format!("{base}-{}.log", Local::now().format("%Y-%m-%d")))
    }

    fn append(&self, path: &Path, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|file| {
                file.lock_exclusive()?;
                let write = writeln!(&file, "{line}");
                let _ = fs2::FileExt::unlock(&file);
                write
            });
        if let Err(e) = result {
            warn!("log append {}: {e}", path.display());
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Relay states are logged in the legacy True/False spelling so existing
/// conditions-log parsers keep working.
fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
