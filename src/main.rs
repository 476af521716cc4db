// src/main.rs

//! Polls the configured sensors and prints one JSON line per reading.
//!
//! Usage: `envpoll [config.yml]`. Without a file, one SHTC3 called "chamber"
//! on /dev/i2c-1 is polled every 5 seconds.

use anyhow::{bail, Context};
use envpoll::common::hal_traits::linux::Delay;
use envpoll::poller::StdioSink;
use envpoll::sensor::{self, BoxedDriver};
use envpoll::{PollerConfig, Poller, SharedBus, ShutdownSignal, SystemTimer};
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => PollerConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.to_string_lossy()))?,
        None => PollerConfig::default(),
    };

    let shutdown = ShutdownSignal::new();
    shutdown
        .install_os_handler()
        .context("installing shutdown hook")?;

    let bus = SharedBus::open(&config.bus)
        .with_context(|| format!("opening {}", config.bus.display()))?;

    let mut drivers: Vec<BoxedDriver<'_, _>> = Vec::with_capacity(config.sensors.len());
    for sensor_config in &config.sensors {
        match sensor::build(sensor_config, &bus, Delay) {
            Ok(driver) => drivers.push(driver),
            Err(e) => bail!("{}: {}", sensor_config.label(), e),
        }
    }

    let mut poller = Poller::new(drivers, config.interval(), SystemTimer).parallel(config.parallel);
    poller.run(&mut StdioSink::stdio(), &shutdown);

    // drivers borrow the bus
    drop(poller.into_sensors());
    drop(bus.close());
    info!("closed {}", config.bus.display());
    Ok(())
}
