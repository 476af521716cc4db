// src/lib.rs

pub mod common;
pub mod config;
pub mod poller;
pub mod sensor;

// Re-export key types for convenience
pub use common::{BusAddress, Reading, SensorError, SharedBus, TimestampedReading, Transport};
pub use config::{ConfigError, PollerConfig};
pub use poller::{Poller, ShutdownSignal, SystemTimer};
pub use sensor::{Driver, HumiditySensor, TemperatureSensor};
