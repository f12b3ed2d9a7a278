//! DS18B20 one-wire probe reader over sysfs.
//!
//! The kernel w1 driver exposes each probe as
//! `/sys/bus/w1/devices/<id>/w1_slave` with two lines:
//!
//! ```text
//! 6e 01 4b 46 7f ff 02 10 71 : crc=71 YES
//! 6e 01 4b 46 7f ff 02 10 71 t=22875
//! ```
//!
//! The first line must end in `YES` (conversion CRC passed); the second
//! carries the temperature in milli-°C after `t=`.  Values are converted
//! to °F here; rounding to 0.1° happens when the sensor task publishes.

use std::fs;
use std::path::PathBuf;

use crate::error::ProbeError;
use crate::ports::ProbeBus;

const W1_DEVICES: &str = "/sys/bus/w1/devices";

pub struct OneWireBus {
    base: PathBuf,
}

impl OneWireBus {
    pub fn new() -> Self {
        Self {
            base: PathBuf::from(W1_DEVICES),
        }
    }

    /// Test seam: read from an alternate device tree root.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn parse(sensor_id: &str, body: &str) -> Result<f32, ProbeError> {
        let mut lines = body.lines();
        let crc_line = lines
            .next()
            .ok_or_else(|| ProbeError::BadPayload(sensor_id.to_string()))?;
        if !crc_line.trim_end().ends_with("YES") {
            return Err(ProbeError::CrcFailed(sensor_id.to_string()));
        }
        let temp_line = lines
            .next()
            .ok_or_else(|| ProbeError::BadPayload(sensor_id.to_string()))?;
        let milli_c: f32 = temp_line
            .split_once("t=")
            .and_then(|(_, t)| t.trim().parse().ok())
            .ok_or_else(|| ProbeError::BadPayload(sensor_id.to_string()))?;
        Ok(celsius_to_fahrenheit(milli_c / 1000.0))
    }
}

impl Default for OneWireBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeBus for OneWireBus {
    fn read_temp_f(&mut self, sensor_id: &str) -> Result<f32, ProbeError> {
        let path = self.base.join(sensor_id).join("w1_slave");
        let body =
            fs::read_to_string(&path).map_err(|_| ProbeError::NotFound(sensor_id.to_string()))?;
        Self::parse(sensor_id, &body)
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}
