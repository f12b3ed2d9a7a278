//! Telemetry task.
//!
//! Every `client.sent_mins` minutes, while the station link is up and
//! data sending is enabled, ship one snapshot document and interpret the
//! reply.  The reply's optional `status` field may carry a command:
//! `alarm_reset` or `defrost`.  A command is acted on immediately and
//! acknowledged by re-sending a fresh snapshot 10 s later.  Every
//! exchange is timeboxed; a hung or failed call is logged and skipped.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::alarm::AlarmMonitor;
use crate::config::{ConfigStore, Settings};
use crate::logs::EventLog;
use crate::ports::{NetControl, SecureLink};
use crate::world::{epoch_secs, WorldState};

use super::interruptible_sleep;

/// Hard deadline for one exchange.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(15);
/// Delay before the acknowledging re-send.
const ACK_DELAY: Duration = Duration::from_secs(10);

pub struct TelemetryTask {
    world: Arc<WorldState>,
    store: Arc<ConfigStore>,
    events: Arc<EventLog>,
    monitor: Arc<AlarmMonitor>,
    net: Arc<dyn NetControl>,
    link: Box<dyn SecureLink>,
    last_sent: u64,
}

impl TelemetryTask {
    pub fn new(
        world: Arc<WorldState>,
        store: Arc<ConfigStore>,
        events: Arc<EventLog>,
        monitor: Arc<AlarmMonitor>,
        net: Arc<dyn NetControl>,
        link: Box<dyn SecureLink>,
    ) -> Self {
        Self {
            world,
            store,
            events,
            monitor,
            net,
            link,
            last_sent: 0,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.world.running() {
            let now = epoch_secs();
            let settings = self.store.settings();
            if now.saturating_sub(self.last_sent) >= settings.telemetry_interval_secs {
                self.last_sent = now;
                self.exchange_once(now, &settings);
            }
            interruptible_sleep(&self.world, Duration::from_secs(1));
        }
        Ok(())
    }

    /// One send/interpret cycle.  Public for the integration tests.
    pub fn exchange_once(&mut self, now: u64, settings: &Settings) {
        if !settings.send_data {
            return;
        }
        if !self.net.is_connected() {
            return;
        }

        let payload = build_snapshot(&self.world, &self.monitor, settings, now);
        let reply = match self.link.exchange(&payload, EXCHANGE_TIMEOUT) {
            Ok(reply) => reply,
            Err(e) => {
                self.events.error(&format!("Telemetry exchange failed: {e:#}"));
                return;
            }
        };

        if let Some(command) = reply.get("status").and_then(Value::as_str) {
            if self.handle_command(command) {
                interruptible_sleep(&self.world, ACK_DELAY);
                let ack = build_snapshot(&self.world, &self.monitor, settings, epoch_secs());
                if let Err(e) = self.link.exchange(&ack, EXCHANGE_TIMEOUT) {
                    self.events.error(&format!("Telemetry ack failed: {e:#}"));
                }
            }
        }
    }

    /// Returns true when the reply carried an actionable command.
    fn handle_command(&mut self, command: &str) -> bool {
        match command {
            "alarm_reset" => {
                self.events.debug("Remote command: alarm reset");
                self.monitor.reset();
                true
            }
            "defrost" => {
                self.events.debug("Remote command: defrost");
                self.world
                    .flags
                    .trigger_defrost
                    .store(true, Ordering::Release);
                true
            }
            _ => false,
        }
    }
}

/// The snapshot document sent to the remote server.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: u64,
    pub unit_number: i64,
    pub trl_number: i64,
    pub alarm_codes: Vec<u16>,
    pub setpoint: f32,
    pub status: &'static str,
    pub relays: RelayStates,
    pub sensors: SensorReadings,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayStates {
    pub compressor: bool,
    pub fan: bool,
    pub valve: bool,
    pub electric_heater: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorReadings {
    pub return_temp: f32,
    pub supply_temp: f32,
    pub coil_temp: f32,
}

pub fn build_snapshot(
    world: &WorldState,
    monitor: &AlarmMonitor,
    settings: &Settings,
    now: u64,
) -> Value {
    let status = world.status_snapshot();
    let snapshot = Snapshot {
        timestamp: now,
        unit_number: settings.unit_number,
        trl_number: settings.trl_number,
        alarm_codes: monitor.codes(),
        setpoint: world.setpoint.load(),
        status: status.mode.name(),
        relays: RelayStates {
            compressor: status.compressor,
            fan: status.fan,
            valve: status.valve,
            electric_heater: status.electric_heater,
        },
        sensors: SensorReadings {
            return_temp: world.return_temp.load(),
            supply_temp: world.supply_temp.load(),
            coil_temp: world.coil_temp.load(),
        },
    };
    serde_json::to_value(snapshot).expect("snapshot serialises")
}
