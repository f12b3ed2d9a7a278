//! Demo unit simulator.
//!
//! Produces plausibly-converging probe values driven by the current
//! requested mode and setpoint, so the whole control stack (state
//! machine, alarms, display, telemetry) runs realistically with no
//! hardware attached.
//!
//! Each mode pulls the three temperatures toward mode-specific targets at
//! fixed rates; every read carries a little Gaussian noise.  The refresh
//! interval ramps geometrically from a slow initial period down to the
//! target period, so a fresh demo "warms up" to realistic update rates.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::world::Mode;

/// Ambient the box drifts toward with everything off.
const AMBIENT_F: f32 = 60.0;

pub struct DemoUnit {
    mode: Mode,
    setpoint: f32,
    return_t: f32,
    supply_t: f32,
    coil_t: f32,
    rng: StdRng,
    noise: Normal<f32>,
    refresh_secs: f64,
    target_refresh_secs: f64,
    ramp: f64,
    last_update: Instant,
}

impl DemoUnit {
    pub fn new() -> Self {
        Self {
            mode: Mode::Null,
            setpoint: 40.0,
            return_t: AMBIENT_F,
            supply_t: AMBIENT_F,
            coil_t: AMBIENT_F,
            rng: StdRng::from_entropy(),
            noise: Normal::new(0.0, 0.3).expect("valid noise distribution"),
            refresh_secs: 5.0,
            target_refresh_secs: 1.0,
            ramp: 0.85,
            last_update: Instant::now(),
        }
    }

    /// Tell the simulator what the unit is currently being asked to do.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    /// Override the refresh ramp (initial period, target period, ratio).
    pub fn set_refresh(&mut self, initial_secs: f64, target_secs: f64, ramp: f64) {
        self.refresh_secs = initial_secs;
        self.target_refresh_secs = target_secs;
        self.ramp = ramp;
    }

    pub fn read_return(&mut self) -> f32 {
        self.return_t + self.noise.sample(&mut self.rng)
    }

    pub fn read_supply(&mut self) -> f32 {
        self.supply_t + self.noise.sample(&mut self.rng)
    }

    pub fn read_coil(&mut self) -> f32 {
        self.coil_t + self.noise.sample(&mut self.rng)
    }

    /// Advance the simulation if the refresh period has elapsed.
    pub fn update(&mut self) {
        if self.last_update.elapsed().as_secs_f64() < self.refresh_secs {
            return;
        }
        self.last_update = Instant::now();
        self.refresh_secs = (self.refresh_secs * self.ramp).max(self.target_refresh_secs);
        self.step();
    }

    /// One convergence step, refresh timing aside.
    pub fn step(&mut self) {
        match self.mode {
            Mode::Cooling => {
                self.return_t = (self.return_t - 0.20).max(self.setpoint - 2.0);
                self.supply_t = (self.supply_t - 0.25).max(self.setpoint - 5.0);
                self.coil_t = (self.coil_t - 0.35).max(self.setpoint - 10.0);
            }
            Mode::Heating => {
                self.return_t = (self.return_t + 0.15).min(self.setpoint + 2.0);
                self.supply_t = (self.supply_t + 0.25).min(self.setpoint + 5.0);
                self.coil_t = (self.coil_t + 0.35).min(self.setpoint + 10.0);
            }
            Mode::Defrost => {
                self.coil_t = (self.coil_t + 0.5).min(50.0);
                self.return_t = (self.return_t + 0.1).min(55.0);
                self.supply_t = (self.supply_t + 0.1).min(55.0);
            }
            Mode::Null | Mode::Alarm => {
                self.return_t += (AMBIENT_F - self.return_t) * 0.01;
                self.supply_t += (AMBIENT_F - self.supply_t) * 0.01;
                self.coil_t += (AMBIENT_F - self.coil_t) * 0.01;
            }
        }
    }

    /// Deterministic variant for tests: fixed seed, zero noise.
    #[cfg(test)]
    fn seeded() -> Self {
        let mut unit = Self::new();
        unit.rng = StdRng::seed_from_u64(7);
        unit.noise = Normal::new(0.0, 0.0).unwrap();
        unit
    }
}

impl Default for DemoUnit {
    fn default() -> Self {
        Self::new()
    }
}
