//! Display rendering: world snapshot → two 4×20 frames → cell diffs.
//!
//! Formatting is pure; [`ScreenBuffer`] tracks what each display already
//! shows and ships only changed cells through the port, which is what
//! keeps the I²C traffic down to a handful of bytes per refresh.

use crate::ports::DisplayPort;
use crate::world::{Mode, TEMP_SENTINEL};

pub const COLS: usize = 20;
pub const ROWS: usize = 4;

/// Everything the renderer needs, captured once per refresh.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub now: u64,
    pub mode: Mode,
    pub anti_cycle: bool,
    pub pretrip: bool,
    pub edit_mode: bool,
    pub setpoint: f32,
    pub return_t: f32,
    pub supply_t: f32,
    pub coil_t: f32,
    /// Entry time of the current mode (epoch seconds).
    pub state_entered: u64,
    pub alarm_codes: Vec<u16>,
    pub wlan_ip: Option<String>,
    pub hotspot_ip: Option<String>,
    pub run_seconds: u64,
}

/// Stateful frame builder; the flash toggle flips on every render so the
/// setpoint line blinks at display rate while editing.
pub struct Renderer {
    flash_on: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self { flash_on: false }
    }

    /// Build both frames.  Lines longer than 20 columns are truncated by
    /// the screen buffer on the way out.
    pub fn render(&mut self, snap: &RenderSnapshot) -> [[String; ROWS]; 2] {
        self.flash_on = !self.flash_on;

        let status_line = {
            let prefix = if snap.pretrip { "P-" } else { "" };
            let suffix = if snap.anti_cycle { " AC" } else { "" };
            format!("Status: {prefix}{}{suffix}", snap.mode)
        };

        let setpoint_line = if snap.edit_mode {
            if self.flash_on {
                format!("Setpoint = {:.1}", snap.setpoint)
            } else {
                String::new()
            }
        } else {
            format!(
                "SP: {:.1} RT: {}",
                snap.setpoint,
                fmt_temp(snap.return_t)
            )
        };

        let coil_line = format!(
            "CT: {} DT: {}",
            fmt_temp(snap.coil_t),
            fmt_temp(snap.supply_t)
        );

        let alarm_line = if snap.alarm_codes.is_empty() {
            "Normal".to_string()
        } else {
            let codes: Vec<String> = snap.alarm_codes.iter().map(u16::to_string).collect();
            format!("Alarms: {}", codes.join(" "))
        };

        let elapsed = snap.now.saturating_sub(snap.state_entered);
        let elapsed_line = format!(
            "{:02}:{:02}:{:02}",
            elapsed / 3600,
            (elapsed % 3600) / 60,
            elapsed % 60
        );

        let ip_line = format!(
            "IP:{}",
            snap.wlan_ip.as_deref().unwrap_or("xxx.xxx.xxx.xxx")
        );

        let bottom_line = match &snap.hotspot_ip {
            Some(ip) => format!("HP:{ip}"),
            None => format!(
                "Run Hours: {}:{:02}",
                snap.run_seconds / 3600,
                (snap.run_seconds % 3600) / 60
            ),
        };

        [
            [status_line.clone(), setpoint_line, coil_line, alarm_line],
            [status_line, elapsed_line, ip_line, bottom_line],
        ]
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// One decimal place; the sentinel renders as a dashed placeholder.
fn fmt_temp(value: f32) -> String {
    if value == TEMP_SENTINEL {
        "--.-".to_string()
    } else {
        format!("{value:.1}")
    }
}

// ---------------------------------------------------------------------------
// Screen buffer
// ---------------------------------------------------------------------------

/// Mirror of what both displays currently show.
pub struct ScreenBuffer {
    cells: [[[char; COLS]; ROWS]; 2],
}

impl ScreenBuffer {
    pub fn new() -> Self {
        Self {
            cells: [[[' '; COLS]; ROWS]; 2],
        }
    }

    /// Diff `frame` against the mirror and write only changed cells.
    pub fn apply(&mut self, port: &mut dyn DisplayPort, frame: &[[String; ROWS]; 2]) {
        for (display, rows) in frame.iter().enumerate() {
            for (row, text) in rows.iter().enumerate() {
                let mut padded = [' '; COLS];
                for (i, ch) in text.chars().take(COLS).enumerate() {
                    padded[i] = ch;
                }

                let current = &mut self.cells[display][row];
                let changed: Vec<(u8, char)> = padded
                    .iter()
                    .enumerate()
                    .filter(|&(col, ch)| current[col] != *ch)
                    .map(|(col, ch)| (col as u8, *ch))
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                if port.write_cells(display as u8, row as u8, &changed).is_ok() {
                    *current = padded;
                }
            }
        }
    }

    /// Forget the mirror, e.g. after the port was cleared.
    pub fn reset(&mut self) {
        self.cells = [[[' '; COLS]; ROWS]; 2];
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}
