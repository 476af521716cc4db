// src/sensor/mcp9808.rs

//! Microchip MCP9808 digital temperature sensor.
//!
//! Plain register reads: write the register pointer, read two bytes back.
//! No conversion delay, the ambient register is updated continuously.

use super::{default_name, Driver, TemperatureSensor};
use crate::common::{
    BusAddress, IdentityMismatch, Reading, SensorError, TimestampedReading, Transport,
};
use std::sync::{Mutex, PoisonError};

/// The three address pins select 0x18..=0x1F.
pub const ADDRESS_MIN: u8 = 0x18;
pub const ADDRESS_MAX: u8 = 0x1F;

const MANUFACTURER_ID: u16 = 0x0054;
const DEVICE_ID: u16 = 0x0400;
/// Low byte of the device ID register is the silicon revision.
const DEVICE_ID_MASK: u16 = 0xFF00;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    AmbientTemperature = 0x05,
    ManufacturerId = 0x06,
    DeviceId = 0x07,
}

impl Register {
    pub fn pointer(&self) -> u8 {
        *self as _
    }
}

#[derive(Debug)]
pub struct Mcp9808<'a, B> {
    bus: &'a B,
    address: BusAddress,
    name: String,
    lock: Mutex<()>,
}

impl<'a, B: Transport> Mcp9808<'a, B> {
    /// Validates the address, then checks manufacturer and device IDs.
    ///
    /// Without a `name` the driver is called `mcp9808-<address>`.
    pub fn new(
        bus: &'a B,
        address: BusAddress,
        name: Option<String>,
    ) -> Result<Self, SensorError<B::Error>> {
        let address = address.ensure_within(ADDRESS_MIN, ADDRESS_MAX)?;
        let sensor = Mcp9808 {
            bus,
            address,
            name: name.unwrap_or_else(|| default_name("mcp9808", address)),
            lock: Mutex::new(()),
        };
        sensor.probe()?;
        Ok(sensor)
    }

    /// Reads a 16-bit big-endian register.
    pub fn read_register16(&self, register: Register) -> Result<u16, SensorError<B::Error>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut reply = [0u8; 2];
        self.bus
            .transact(self.address, &[register.pointer()], &mut reply)
            .map_err(SensorError::Transport)?;
        Ok(u16::from_be_bytes(reply))
    }

    pub fn check_manufacturer_id(&self) -> Result<(), SensorError<B::Error>> {
        let found = self.read_register16(Register::ManufacturerId)?;
        if found != MANUFACTURER_ID {
            return Err(IdentityMismatch::WrongManufacturerId {
                found,
                expected: MANUFACTURER_ID,
            }
            .into());
        }
        Ok(())
    }

    pub fn check_device_id(&self) -> Result<(), SensorError<B::Error>> {
        let found = self.read_register16(Register::DeviceId)?;
        if found & DEVICE_ID_MASK != DEVICE_ID {
            return Err(IdentityMismatch::WrongDeviceId {
                found,
                expected: DEVICE_ID,
            }
            .into());
        }
        Ok(())
    }
}

impl<B: Transport> Driver for Mcp9808<'_, B> {
    type Error = B::Error;

    fn identity(&self) -> &str {
        &self.name
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn probe(&self) -> Result<(), SensorError<Self::Error>> {
        self.check_manufacturer_id()
            .and_then(|_| self.check_device_id())
            .map_err(SensorError::not_connected)
    }

    fn snapshot(&self) -> Result<TimestampedReading, SensorError<Self::Error>> {
        let celsius = self.read_temperature()?;
        Ok(TimestampedReading::now(&self.name, Reading::Temperature { celsius }))
    }
}

impl<B: Transport> TemperatureSensor for Mcp9808<'_, B> {
    fn read_temperature(&self) -> Result<f32, SensorError<Self::Error>> {
        let raw = self.read_register16(Register::AmbientTemperature)?;
        Ok(decode_temperature(raw))
    }
}

/// Converts the ambient temperature register to °C.
///
/// Bits 0-11 hold the magnitude in 1/16 °C, bit 12 is the sign.
/// Bits 13-15 are alert flags and are ignored.
pub fn decode_temperature(raw: u16) -> f32 {
    let mut celsius = f32::from(raw & 0x0FFF) / 16.0;
    if raw & 0x1000 != 0 {
        celsius -= 256.0;
    }
    celsius
}
