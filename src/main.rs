use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use reeferd::adapters::gpio::RpiGpio;
use reeferd::adapters::memory::{CannedLink, MemoryDisplay, MemoryGpio, MemoryIndicator, StaticNet};
use reeferd::adapters::onewire::OneWireBus;
use reeferd::alarm::AlarmMonitor;
use reeferd::config::ConfigStore;
use reeferd::control::relays::{RelayDriver, RelaySettings};
use reeferd::control::Controller;
use reeferd::logs::EventLog;
use reeferd::ports::{ButtonPort, NetControl, ProbeBus, RelayPort, SecureLink};
use reeferd::runtime::RunAccumulator;
use reeferd::sim::DemoUnit;
use reeferd::tasks::alarm::AlarmTask;
use reeferd::tasks::display::DisplayTask;
use reeferd::tasks::indicator::IndicatorTask;
use reeferd::tasks::input::InputTask;
use reeferd::tasks::sensor::SensorTask;
use reeferd::tasks::spawn_supervised;
use reeferd::tasks::telemetry::TelemetryTask;
use reeferd::world::{epoch_secs, WorldState, TEMP_SENTINEL};

#[derive(Debug, Parser)]
#[command(version, about = "Refrigeration unit controller daemon")]
struct Cli {
    /// Run against the built-in unit simulator instead of hardware
    #[arg(short, long)]
    demo: bool,

    /// Configuration file
    #[arg(short, long, default_value = "/etc/reeferd/config.env")]
    config: PathBuf,

    /// Directory for event and conditions logs
    #[arg(long, default_value = "/var/log/reeferd")]
    log_dir: PathBuf,

    /// Legacy KEY=VALUE startup overrides (e.g. demo_mode=true)
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

/// Stand-in for the external mutually-authenticated TLS client.  Data
/// sending is disabled by default; if an operator enables it without the
/// client integration linked, every exchange reports this error.
struct UnlinkedClient;

impl SecureLink for UnlinkedClient {
    fn exchange(
        &mut self,
        _payload: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<serde_json::Value> {
        bail!("telemetry client integration is not linked")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::init();

    let demo = cli.demo || cli.overrides.iter().any(|kv| kv == "demo_mode=true");

    if !demo && unsafe { libc::geteuid() } != 0 {
        bail!("reeferd must run as root to reach /dev/gpiomem (use --demo for the simulator)");
    }

    let store = Arc::new(
        ConfigStore::open(&cli.config)
            .with_context(|| format!("open config {}", cli.config.display()))?,
    );
    let settings = store.settings();

    let events = Arc::new(EventLog::new(&cli.log_dir, settings.debug_events));
    events.clear_old_logs(settings.log_retention_days);

    // The Wi-Fi/hotspot collaborator is an external integration; the
    // static stub keeps the display and telemetry paths honest about
    // being offline until it is wired in.
    let net: Arc<dyn NetControl> = Arc::new(StaticNet::new(None, false));

    if !demo && settings.sensors_unconfigured() {
        print_help_screen(&store);
        if settings.hotspot_enabled {
            net.start_hotspot();
        }
        events.error("Sensor ids are not configured; stopping for service setup");
        bail!("sensor ids are not configured (set sensor.return/supply/coil)");
    }

    let now = epoch_secs();
    let run_seconds = store
        .get("unit.compressor_run_seconds")
        .parse()
        .unwrap_or(0);
    let setpoint =
        settings.clamp_setpoint(store.get("unit.setpoint").parse().unwrap_or(55.0));
    let world = Arc::new(WorldState::new(setpoint, run_seconds, now));
    world.flags.demo_mode.store(demo, Ordering::Release);

    let sigint = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, sigint.clone())
        .context("register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, sigint.clone())
        .context("register SIGTERM handler")?;

    // ── Device adapters ───────────────────────────────────────
    let (relay_port, button_port, probes): (
        Box<dyn RelayPort>,
        Box<dyn ButtonPort>,
        Box<dyn ProbeBus>,
    ) = if demo {
        info!("demo mode: GPIO and probes are simulated");
        let gpio = MemoryGpio::new();
        (
            Box::new(gpio.clone()),
            Box::new(gpio),
            Box::new(reeferd::adapters::memory::FixedProbes::new(
                TEMP_SENTINEL,
                TEMP_SENTINEL,
                TEMP_SENTINEL,
            )),
        )
    } else {
        (
            Box::new(RpiGpio::open().context("open relay GPIO")?),
            Box::new(RpiGpio::open().context("open button GPIO")?),
            Box::new(OneWireBus::new()),
        )
    };

    // LCD and LED transports are external integrations; until they are
    // linked the renderers run against in-memory panes.
    if !demo {
        warn!("LCD/LED transports not linked; panel output is buffered only");
    }
    let display_port = MemoryDisplay::new();
    let indicator_port = MemoryIndicator::new();
    let link: Box<dyn SecureLink> = if demo {
        Box::new(CannedLink::new())
    } else {
        Box::new(UnlinkedClient)
    };

    // ── Control assembly ──────────────────────────────────────
    let monitor = Arc::new(AlarmMonitor::new(world.clone(), events.clone()));
    let accumulator = RunAccumulator::new(world.clone(), store.clone(), events.clone());
    let relay_driver = RelayDriver::new(
        relay_port,
        RelaySettings {
            active_low: settings.relay_active_low,
            fan_continuous: settings.fan_continuous,
            electric_heat: settings.electric_heat,
        },
        accumulator,
    );
    let controller = Arc::new(Mutex::new(Controller::new(
        world.clone(),
        store.clone(),
        events.clone(),
        monitor.clone(),
        relay_driver,
    )));
    controller
        .lock()
        .expect("controller mutex poisoned")
        .apply_initial(now);

    events.debug(&format!(
        "Service starting v{} (unit {}, relays active-{}, demo={})",
        env!("CARGO_PKG_VERSION"),
        settings.unit_number,
        if settings.relay_active_low { "low" } else { "high" },
        demo,
    ));

    // ── Tasks ─────────────────────────────────────────────────
    let mut handles = Vec::new();

    let mut sensor = SensorTask::new(
        world.clone(),
        store.clone(),
        events.clone(),
        controller.clone(),
        probes,
        DemoUnit::new(),
    );
    handles.push(spawn_supervised(
        "sensor",
        world.clone(),
        events.clone(),
        move || sensor.run(),
    ));

    let mut input = InputTask::new(
        world.clone(),
        store.clone(),
        events.clone(),
        monitor.clone(),
        net.clone(),
        button_port,
    );
    handles.push(spawn_supervised(
        "input",
        world.clone(),
        events.clone(),
        move || input.run(),
    ));

    let mut alarm = AlarmTask::new(world.clone(), monitor.clone(), controller.clone());
    handles.push(spawn_supervised(
        "alarm",
        world.clone(),
        events.clone(),
        move || alarm.run(),
    ));

    let mut display = DisplayTask::new(
        world.clone(),
        monitor.clone(),
        net.clone(),
        Box::new(display_port),
    );
    handles.push(spawn_supervised(
        "display",
        world.clone(),
        events.clone(),
        move || display.run(),
    ));

    let mut indicator = IndicatorTask::new(world.clone(), Box::new(indicator_port));
    handles.push(spawn_supervised(
        "indicator",
        world.clone(),
        events.clone(),
        move || indicator.run(),
    ));

    let mut telemetry = TelemetryTask::new(
        world.clone(),
        store.clone(),
        events.clone(),
        monitor.clone(),
        net.clone(),
        link,
    );
    handles.push(spawn_supervised(
        "telemetry",
        world.clone(),
        events.clone(),
        move || telemetry.run(),
    ));

    info!("reeferd running; press Ctrl-C to stop");

    // ── Shutdown ──────────────────────────────────────────────
    while world.running() && !sigint.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(200));
    }
    events.debug("Shutdown requested");
    world.request_stop();
    for handle in handles {
        let _ = handle.join();
    }
    events.debug("Service stopped");
    Ok(())
}

/// Printed when the unit has never been through service setup.
fn print_help_screen(store: &ConfigStore) {
    println!("reeferd v{} — service setup required", env!("CARGO_PKG_VERSION"));
    println!();
    println!("One or more probe ids are unset. Connect to the service");
    println!("hotspot and set sensor.return / sensor.supply / sensor.coil,");
    println!("or edit the config file directly. Current configuration:");
    println!();
    println!("  Unit Number:        {}", store.get("unit.number"));
    println!("  TRL Number:         {}", store.get("trl.number"));
    println!("  Setpoint:           {} F", store.get("unit.setpoint"));
    println!("  Setpoint Offset:    {} F", store.get("setpoint.offset"));
    println!(
        "  Defrost Interval:   {} hours",
        store.get("defrost.interval_hours")
    );
    println!(
        "  Defrost Timeout:    {} minutes",
        store.get("defrost.timeout_mins")
    );
    println!(
        "  Defrost Coil Temp:  {} F",
        store.get("defrost.coil_temperature")
    );
    println!(
        "  Compressor Off Timer: {} minutes",
        store.get("compressor.off_timer")
    );
    println!("  Return Sensor:      {}", store.get("sensor.return"));
    println!("  Supply Sensor:      {}", store.get("sensor.supply"));
    println!("  Coil Sensor:        {}", store.get("sensor.coil"));
}
