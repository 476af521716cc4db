// src/sensor/mod.rs

// Capability traits shared by every driver, plus one module per chip family.

pub mod hih6030;
pub mod mcp9808;
pub mod shtc3;

pub use hih6030::Hih6030;
pub use mcp9808::Mcp9808;
pub use shtc3::Shtc3;

use crate::common::{BusAddress, SensorError, TimestampedReading, Transport};
use crate::config::{DriverKind, SensorConfig};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// What every sensor driver can do, whatever chip sits behind it.
pub trait Driver {
    /// Bus error type of the transport the driver talks through.
    type Error: Debug;

    /// Human-readable name, fixed at construction.
    fn identity(&self) -> &str;

    /// Address on the shared bus, fixed at construction.
    fn address(&self) -> BusAddress;

    /// Cheapest check that the expected chip answers at `address()`.
    ///
    /// Any failure comes back as `SensorError::NotConnected` wrapping the cause.
    fn probe(&self) -> Result<(), SensorError<Self::Error>>;

    /// Takes a fresh measurement and stamps it.
    fn snapshot(&self) -> Result<TimestampedReading, SensorError<Self::Error>>;

    /// `snapshot()` encoded as one JSON line.
    fn snapshot_json(&self) -> Result<String, SensorError<Self::Error>> {
        Ok(self.snapshot()?.to_json()?)
    }
}

/// Temperature-only chips.
pub trait TemperatureSensor: Driver {
    /// Ambient temperature in °C.
    fn read_temperature(&self) -> Result<f32, SensorError<Self::Error>>;
}

/// Chips measuring relative humidity together with temperature.
pub trait HumiditySensor: Driver {
    /// Returns `(percent RH, °C)` from a single measurement.
    fn read_humidity_and_temperature(&self) -> Result<(f32, f32), SensorError<Self::Error>>;
}

/// A driver behind a trait object, borrowing the bus for `'a`.
pub type BoxedDriver<'a, E> = Box<dyn Driver<Error = E> + Send + Sync + 'a>;

/// Name used when none was configured, e.g. `mcp9808-0x18`.
pub fn default_name(prefix: &str, address: BusAddress) -> String {
    format!("{}-{}", prefix, address)
}

/// Builds and probes the driver described by `config`.
///
/// `delay` is handed to drivers that wait out a conversion; the others drop it.
pub fn build<'a, B, D>(
    config: &SensorConfig,
    bus: &'a B,
    delay: D,
) -> Result<BoxedDriver<'a, B::Error>, SensorError<B::Error>>
where
    B: Transport + Sync,
    D: DelayNs + Send + 'a,
{
    let name = config.name.clone();
    let address = match config.address {
        Some(a) => Some(BusAddress::new(a).map_err(|_| SensorError::InvalidAddress(a))?),
        None => None,
    };

    let driver: BoxedDriver<'a, B::Error> = match config.driver {
        DriverKind::Mcp9808 => {
            let address = address.ok_or(SensorError::MissingAddress)?;
            Box::new(Mcp9808::new(bus, address, name)?)
        }
        DriverKind::Hih6030 => Box::new(Hih6030::new(
            bus,
            address.unwrap_or(hih6030::DEFAULT_ADDRESS),
            name,
            delay,
        )?),
        DriverKind::Shtc3 => Box::new(Shtc3::new(bus, name, config.mode.unwrap_or_default(), delay)?),
    };

    log::info!("{}: {} ready at {}", driver.identity(), config.driver, driver.address());
    Ok(driver)
}
