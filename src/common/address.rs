// src/common/address.rs

use super::error::SensorError;
use core::convert::TryFrom;
use core::fmt;

/// A 7-bit address on the shared I2C bus.
///
/// Immutable once a driver has been built around it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct BusAddress(u8);

impl BusAddress {
    /// Highest address representable in 7-bit addressing.
    pub const MAX: u8 = 0x7F;

    /// Creates a new `BusAddress` if the value fits in 7 bits.
    /// Returns `Result<Self, SensorError<()>>` because validation itself
    /// cannot cause a bus error.
    pub fn new(address: u8) -> Result<Self, SensorError<()>> {
        if address <= Self::MAX {
            Ok(BusAddress(address))
        } else {
            Err(SensorError::InvalidAddress(address))
        }
    }

    /// Address constants for chips with a factory-fixed address.
    pub(crate) const fn new_unchecked(address: u8) -> Self {
        BusAddress(address)
    }

    #[inline]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Checks the address against a chip-family range, inclusive on both ends.
    pub fn ensure_within<E: fmt::Debug>(self, min: u8, max: u8) -> Result<Self, SensorError<E>> {
        if (min..=max).contains(&self.0) {
            Ok(self)
        } else {
            Err(SensorError::AddressOutOfRange {
                address: self.0,
                min,
                max,
            })
        }
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = SensorError<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BusAddress> for u8 {
    fn from(value: BusAddress) -> Self {
        value.0
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}
