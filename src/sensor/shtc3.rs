// src/sensor/shtc3.rs

//! Sensirion SHTC3 humidity and temperature sensor.
//!
//! Every command is a 16-bit word; every word the chip returns is followed by
//! its CRC-8.

use super::{default_name, Driver, HumiditySensor};
use crate::common::timing::{
    self, SHTC3_LOW_POWER_MEASUREMENT_TIME, SHTC3_NORMAL_MEASUREMENT_TIME, SHTC3_WAKEUP_TIME,
};
use crate::common::{
    verify_word, BusAddress, IdentityMismatch, Reading, SensorError, TimestampedReading,
    Transport,
};
use core::time::Duration;
use embedded_hal::delay::DelayNs;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};

/// The only address this part answers on.
pub const ADDRESS: BusAddress = BusAddress::new_unchecked(0x70);

const CHIP_ID_MASK: u16 = 0x083F;
const CHIP_ID: u16 = 0x0807;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    ReadIdRegister = 0xEFC8,
    /// Normal mode, clock stretching, humidity first.
    MeasureNormal = 0x58E0,
    /// Low-power mode, clock stretching, humidity first.
    MeasureLowPower = 0x401A,
    Sleep = 0xB098,
    WakeUp = 0x3517,
    SoftReset = 0x805D,
}

impl Command {
    pub fn to_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

/// Trade-off between repeatability and conversion time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementMode {
    #[default]
    Normal,
    LowPower,
}

impl MeasurementMode {
    pub fn command(self) -> Command {
        match self {
            MeasurementMode::Normal => Command::MeasureNormal,
            MeasurementMode::LowPower => Command::MeasureLowPower,
        }
    }

    pub fn settle_time(self) -> Duration {
        match self {
            MeasurementMode::Normal => SHTC3_NORMAL_MEASUREMENT_TIME,
            MeasurementMode::LowPower => SHTC3_LOW_POWER_MEASUREMENT_TIME,
        }
    }
}

/// Relative humidity, %.
pub fn decode_humidity(raw: u16) -> f32 {
    f32::from(raw) / 65536.0 * 100.0
}

/// Temperature, °C.
pub fn decode_temperature(raw: u16) -> f32 {
    f32::from(raw) / 65536.0 * 175.0 - 45.0
}

pub struct Shtc3<'a, B, D> {
    bus: &'a B,
    name: String,
    mode: MeasurementMode,
    delay: Mutex<D>,
}

impl<'a, B, D> Shtc3<'a, B, D>
where
    B: Transport,
    D: DelayNs,
{
    /// Creates the driver at [`ADDRESS`] and checks the chip ID.
    pub fn new(
        bus: &'a B,
        name: Option<String>,
        mode: MeasurementMode,
        delay: D,
    ) -> Result<Self, SensorError<B::Error>> {
        let sensor = Shtc3 {
            bus,
            name: name.unwrap_or_else(|| default_name("shtc3", ADDRESS)),
            mode,
            delay: Mutex::new(delay),
        };
        sensor.probe()?;
        Ok(sensor)
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    /// Reads a CRC-protected 16-bit register.
    pub fn read_register16(&self, register: u16) -> Result<u16, SensorError<B::Error>> {
        let _guard = self.delay.lock().unwrap_or_else(PoisonError::into_inner);

        let mut reply = [0u8; 3];
        self.bus
            .transact(ADDRESS, &register.to_be_bytes(), &mut reply)
            .map_err(SensorError::Transport)?;
        verify_word(&reply)
    }

    pub fn check_chip_id(&self) -> Result<(), SensorError<B::Error>> {
        let found = self.read_register16(Command::ReadIdRegister as u16)?;
        if found & CHIP_ID_MASK != CHIP_ID {
            return Err(IdentityMismatch::WrongDeviceId {
                found,
                expected: CHIP_ID,
            }
            .into());
        }
        Ok(())
    }

    /// One measurement in the configured mode, returning `(percent RH, °C)`.
    ///
    /// Both word groups are checked before anything is decoded.
    pub fn measure(&self) -> Result<(f32, f32), SensorError<B::Error>> {
        let mut delay = self.delay.lock().unwrap_or_else(PoisonError::into_inner);

        self.send(self.mode.command())?;
        timing::settle(&mut *delay, self.mode.settle_time());

        let mut frame = [0u8; 6];
        self.bus
            .transact(ADDRESS, &[], &mut frame)
            .map_err(SensorError::Transport)?;

        let humidity = verify_word(&[frame[0], frame[1], frame[2]])?;
        let temperature = verify_word(&[frame[3], frame[4], frame[5]])?;
        Ok((decode_humidity(humidity), decode_temperature(temperature)))
    }

    /// Puts the chip into sleep mode. It ignores everything but
    /// [`wake_up`](Self::wake_up) afterwards.
    pub fn sleep(&self) -> Result<(), SensorError<B::Error>> {
        let _guard = self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        self.send(Command::Sleep)
    }

    pub fn wake_up(&self) -> Result<(), SensorError<B::Error>> {
        self.command_then_wait(Command::WakeUp, SHTC3_WAKEUP_TIME)
    }

    pub fn soft_reset(&self) -> Result<(), SensorError<B::Error>> {
        self.command_then_wait(Command::SoftReset, SHTC3_WAKEUP_TIME)
    }

    fn command_then_wait(
        &self,
        command: Command,
        duration: Duration,
    ) -> Result<(), SensorError<B::Error>> {
        let mut delay = self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        self.send(command)?;
        timing::settle(&mut *delay, duration);
        Ok(())
    }

    // Caller holds the lock.
    fn send(&self, command: Command) -> Result<(), SensorError<B::Error>> {
        self.bus
            .transact(ADDRESS, &command.to_bytes(), &mut [])
            .map_err(SensorError::Transport)
    }
}

impl<B, D> Driver for Shtc3<'_, B, D>
where
    B: Transport,
    D: DelayNs,
{
    type Error = B::Error;

    fn identity(&self) -> &str {
        &self.name
    }

    fn address(&self) -> BusAddress {
        ADDRESS
    }

    fn probe(&self) -> Result<(), SensorError<Self::Error>> {
        self.check_chip_id().map_err(SensorError::not_connected)
    }

    fn snapshot(&self) -> Result<TimestampedReading, SensorError<Self::Error>> {
        let (percent, celsius) = self.measure()?;
        Ok(TimestampedReading::now(
            &self.name,
            Reading::Humidity { celsius, percent },
        ))
    }
}

impl<B, D> HumiditySensor for Shtc3<'_, B, D>
where
    B: Transport,
    D: DelayNs,
{
    fn read_humidity_and_temperature(&self) -> Result<(f32, f32), SensorError<Self::Error>> {
        self.measure()
    }
}
