//! Device and network adapters.
//!
//! `onewire` reads the DS18B20 probes over sysfs and `gpio` drives the
//! relay and button pins over `/dev/gpiomem`; both are plain file-level
//! access.  `memory` holds the in-memory adapters used by demo mode and
//! the test suite.  The I²C LCD transport, the WS2811 strip, the TLS
//! client, and the hotspot manager are separate integrations that
//! implement the same port traits.

pub mod gpio;
pub mod memory;
pub mod onewire;
