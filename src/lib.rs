//! reeferd — refrigeration unit controller.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  RpiGpio        OneWireBus      Memory* (demo/tests)         │
//! │  (relays+keys)  (probes)        (gpio/lcd/lamps/link/net)    │
//! │                                                              │
//! │  ─────────────── port trait boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │ WorldState · Controller · AlarmMonitor · SetpointUi │      │
//! │  │  (atomic cells + one status mutex, pure evaluators) │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  supervised OS threads: sensor · input · alarm · display     │
//! │  · indicator · telemetry                                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sensor task reads the probes (or the demo simulator) once per
//! second and drives the control evaluator; the alarm task watches
//! effectiveness and probe sanity; the input task runs the setpoint and
//! service-gesture machine; display and indicator tasks render the shared
//! state; the telemetry task exchanges snapshots with the remote server.
//! Everything meets in [`world::WorldState`].

pub mod adapters;
pub mod alarm;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod logs;
pub mod ports;
pub mod runtime;
pub mod setpoint;
pub mod sim;
pub mod tasks;
pub mod world;
