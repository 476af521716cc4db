// src/common/error.rs

use core::fmt;

/// Identity registers answered, but not with the values the driver expects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityMismatch {
    #[error("wrong manufacturer ID ({found:#06x} != {expected:#06x})")]
    WrongManufacturerId { found: u16, expected: u16 },

    #[error("wrong device ID ({found:#06x} != {expected:#06x})")]
    WrongDeviceId { found: u16, expected: u16 },
}

/// Errors raised by the sensor drivers, generic over the bus error `E`.
///
/// Display is written out by hand because `NotConnected` nests the error
/// that caused it.
#[derive(Debug, thiserror::Error)]
pub enum SensorError<E = ()>
where
    E: fmt::Debug,
{
    /// Underlying bus error from the transport.
    Transport(E),

    /// Address does not fit in 7 bits.
    InvalidAddress(u8),

    /// Address outside the range the chip family can be strapped to.
    AddressOutOfRange { address: u8, min: u8, max: u8 },

    /// The chip family has no default address and none was given.
    MissingAddress,

    /// Received CRC does not match the one calculated over the data bytes.
    ChecksumMismatch { expected: u8, calculated: u8 },

    /// Manufacturer/device/chip ID check failed.
    Identity(IdentityMismatch),

    /// Probe failed; carries the cause.
    NotConnected(Box<SensorError<E>>),

    /// The device returned a measurement it had already reported.
    /// The decoded values are still valid and carried along.
    StaleData { humidity: f32, temperature: f32 },

    /// The device is in command mode and produced no valid measurement.
    CommandMode,

    /// A reading could not be serialized.
    Encode(serde_json::Error),
}

// Plain `From` impls: `Display` already prints the wrapped error, so it is
// not reported again as `source()`.
impl<E: fmt::Debug> From<IdentityMismatch> for SensorError<E> {
    fn from(mismatch: IdentityMismatch) -> Self {
        SensorError::Identity(mismatch)
    }
}

impl<E: fmt::Debug> From<serde_json::Error> for SensorError<E> {
    fn from(e: serde_json::Error) -> Self {
        SensorError::Encode(e)
    }
}

impl<E: fmt::Debug> SensorError<E> {
    pub fn not_connected(cause: SensorError<E>) -> Self {
        SensorError::NotConnected(Box::new(cause))
    }

    /// True for conditions where the numeric value is still usable.
    pub fn is_soft(&self) -> bool {
        matches!(self, SensorError::StaleData { .. })
    }

    /// Returns the innermost cause, looking through `NotConnected`.
    pub fn root_cause(&self) -> &SensorError<E> {
        match self {
            SensorError::NotConnected(cause) => cause.root_cause(),
            other => other,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SensorError::*;
        match self {
            Transport(e) => write!(f, "I/O error: {:?}", e),
            InvalidAddress(address) => {
                write!(f, "invalid I2C address {:#04x}: must fit in 7 bits", address)
            }
            AddressOutOfRange { address, min, max } => write!(
                f,
                "i2c address must be within {:#04x} and {:#04x} (got {:#04x})",
                min, max, address
            ),
            MissingAddress => write!(f, "no I2C address configured"),
            ChecksumMismatch { expected, calculated } => write!(
                f,
                "crc failed ({:#04x} != {:#04x})",
                calculated, expected
            ),
            Identity(mismatch) => write!(f, "{}", mismatch),
            NotConnected(cause) => write!(f, "sensor not connected: {}", cause),
            StaleData { .. } => write!(f, "reading stale data"),
            CommandMode => write!(f, "device in command mode"),
            Encode(e) => write!(f, "failed to encode reading: {}", e),
        }
    }
}
