//! Relay driver: requested states → physical line levels.
//!
//! The driver is only ever called from inside a mode-entry function while
//! the status mutex is held, which gives the ordering guarantees the rest
//! of the system relies on: the device write is totally ordered after the
//! status mutation, and the run accumulator sees each compressor edge
//! exactly once.
//!
//! Mapping rules, in order:
//! 1. fan-continuous override: with `unit.fan_continuous` set and the mode
//!    outside {Alarm, Defrost}, the fan-requested bit is forced on before
//!    polarity mapping;
//! 2. polarity: level written = `active_low XOR requested`, so
//!    requested=true always means energised;
//! 3. units built without an electric heater suppress the heater write.

use log::warn;

use crate::ports::{Relay, RelayPort};
use crate::runtime::RunAccumulator;
use crate::world::{Mode, StatusMap};

/// The subset of unit configuration the driver needs.
#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub active_low: bool,
    pub fan_continuous: bool,
    pub electric_heat: bool,
}

pub struct RelayDriver {
    port: Box<dyn RelayPort>,
    settings: RelaySettings,
    accumulator: RunAccumulator,
}

impl RelayDriver {
    pub fn new(
        port: Box<dyn RelayPort>,
        settings: RelaySettings,
        accumulator: RunAccumulator,
    ) -> Self {
        Self {
            port,
            settings,
            accumulator,
        }
    }

    pub fn settings(&self) -> RelaySettings {
        self.settings
    }

    /// Apply the requested relay states to the device layer.
    ///
    /// Takes `&mut StatusMap` because the fan-continuous override is
    /// applied to the requested bit itself, keeping the status block and
    /// the physical outputs in agreement.
    pub fn apply(&mut self, status: &mut StatusMap, now: u64) {
        if self.settings.fan_continuous && !matches!(status.mode, Mode::Alarm | Mode::Defrost) {
            status.fan = true;
        }

        self.write(Relay::Compressor, status.compressor);
        self.write(Relay::Fan, status.fan);
        self.write(Relay::Valve, status.valve);
        if self.settings.electric_heat {
            self.write(Relay::ElectricHeater, status.electric_heater);
        }

        self.accumulator.observe(status.compressor, now);
    }

    /// Drive every relay to its de-energised level.  Used on shutdown and
    /// must succeed even when the status block is already dropped.
    pub fn safe_state(&mut self, now: u64) {
        for relay in Relay::ALL {
            if relay == Relay::ElectricHeater && !self.settings.electric_heat {
                continue;
            }
            self.write(relay, false);
        }
        self.accumulator.observe(false, now);
    }

    fn write(&mut self, relay: Relay, requested: bool) {
        let level = self.settings.active_low ^ requested;
        if let Err(e) = self.port.write(relay, level) {
            warn!("relay write {}: {e}", relay.pin_name());
        }
    }
}
