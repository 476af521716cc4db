// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod address;
pub mod crc;
pub mod error;
pub mod hal_traits;
pub mod timing;
pub mod types;

// --- Re-export key types/traits/functions for easier access ---

pub use address::BusAddress;

pub use crc::{calculate_crc8, verify_word, SENSIRION_CRC};
#[cfg(test)]
pub(crate) use crc::encode_word;

pub use error::{IdentityMismatch, SensorError};

pub use hal_traits::{SharedBus, Transport};

// timing.rs holds constants; reach them via common::timing::*

pub use types::{Reading, TimestampedReading};
