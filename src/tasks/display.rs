//! Display renderer task.
//!
//! Every 100 ms: snapshot the world, build both frames, diff them against
//! the screen mirror, ship only changed cells.  On shutdown both displays
//! are cleared and the backlight goes off.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::alarm::AlarmMonitor;
use crate::drivers::display::{RenderSnapshot, Renderer, ScreenBuffer};
use crate::ports::{DisplayPort, NetControl};
use crate::world::{epoch_secs, WorldState};

use super::interruptible_sleep;

const REFRESH_PERIOD: Duration = Duration::from_millis(100);

pub struct DisplayTask {
    world: Arc<WorldState>,
    monitor: Arc<AlarmMonitor>,
    net: Arc<dyn NetControl>,
    port: Box<dyn DisplayPort>,
    renderer: Renderer,
    buffer: ScreenBuffer,
}

impl DisplayTask {
    pub fn new(
        world: Arc<WorldState>,
        monitor: Arc<AlarmMonitor>,
        net: Arc<dyn NetControl>,
        port: Box<dyn DisplayPort>,
    ) -> Self {
        Self {
            world,
            monitor,
            net,
            port,
            renderer: Renderer::new(),
            buffer: ScreenBuffer::new(),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        while self.world.running() {
            self.refresh_once(epoch_secs());
            interruptible_sleep(&self.world, REFRESH_PERIOD);
        }
        if let Err(e) = self.port.clear() {
            warn!("display clear: {e}");
        }
        if let Err(e) = self.port.set_backlight(false) {
            warn!("display backlight: {e}");
        }
        Ok(())
    }

    /// One snapshot + render + diff pass.  Public for the tests.
    pub fn refresh_once(&mut self, now: u64) {
        let status = self.world.status_snapshot();
        let flags = &self.world.flags;
        let snap = RenderSnapshot {
            now,
            mode: status.mode,
            anti_cycle: flags.anti_timer_active.load(Ordering::Acquire),
            pretrip: flags.pretrip_enable.load(Ordering::Acquire),
            edit_mode: flags.setpoint_edit.load(Ordering::Acquire),
            setpoint: self.world.setpoint.load(),
            return_t: self.world.return_temp.load(),
            supply_t: self.world.supply_temp.load(),
            coil_t: self.world.coil_temp.load(),
            state_entered: self.world.timers.state_entered.load(Ordering::Acquire),
            alarm_codes: self.monitor.codes(),
            wlan_ip: self.net.wlan_ip(),
            hotspot_ip: self.net.hotspot_ip(),
            run_seconds: self.world.timers.compressor_on_total.load(Ordering::Acquire),
        };
        let frames = self.renderer.render(&snap);
        self.buffer.apply(self.port.as_mut(), &frames);
    }
}
