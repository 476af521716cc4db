// src/sensor/hih6030.rs

//! Honeywell HIH6030 / HIHxxxx-021 humidity and temperature sensor.
//!
//! A measurement is requested with a one-byte write, converts for a fixed
//! time, then comes back as four bytes with two status bits on top. There is
//! no checksum on this family.

use super::{default_name, Driver, HumiditySensor};
use crate::common::timing::{self, HIH_MEASUREMENT_TIME};
use crate::common::{BusAddress, Reading, SensorError, TimestampedReading, Transport};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use std::sync::{Mutex, PoisonError};

/// Factory address; parts can be ordered with another one.
pub const DEFAULT_ADDRESS: BusAddress = BusAddress::new_unchecked(0x27);

const MEASUREMENT_REQUEST: u8 = 0x00;

/// Full scale of the 14-bit fields, `2^14 - 2`.
const FULL_SCALE: f32 = 16382.0;

const STATUS_STALE: u8 = 1 << 6;
const STATUS_COMMAND_MODE: u8 = 1 << 7;

/// Status bits from the top of the first response byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Normal,
    /// Already fetched since the last measurement cycle.
    StaleData,
    /// Device is in command mode; the numbers are meaningless.
    CommandMode,
}

impl Status {
    pub fn from_byte(b: u8) -> Self {
        if b & STATUS_COMMAND_MODE != 0 {
            Status::CommandMode
        } else if b & STATUS_STALE != 0 {
            Status::StaleData
        } else {
            Status::Normal
        }
    }
}

/// One decoded response frame, status included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hih6030Measurement {
    /// Relative humidity, %.
    pub humidity: f32,
    /// °C.
    pub temperature: f32,
    pub status: Status,
}

impl Hih6030Measurement {
    /// Maps the status onto the error taxonomy, returning `(percent RH, °C)`
    /// only for a normal frame.
    pub fn into_result<E: Debug>(self) -> Result<(f32, f32), SensorError<E>> {
        match self.status {
            Status::Normal => Ok((self.humidity, self.temperature)),
            Status::StaleData => Err(SensorError::StaleData {
                humidity: self.humidity,
                temperature: self.temperature,
            }),
            Status::CommandMode => Err(SensorError::CommandMode),
        }
    }
}

/// Decodes a 4-byte response frame.
pub fn decode(frame: &[u8; 4]) -> Hih6030Measurement {
    Hih6030Measurement {
        humidity: decode_humidity(u16::from_be_bytes([frame[0], frame[1]])),
        temperature: decode_temperature(u16::from_be_bytes([frame[2], frame[3]])),
        status: Status::from_byte(frame[0]),
    }
}

/// Relative humidity from bytes 0-1; the status bits are masked off.
pub fn decode_humidity(word: u16) -> f32 {
    f32::from(word & 0x3FFF) / FULL_SCALE * 100.0
}

/// Temperature from bytes 2-3; the two low bits are unused.
pub fn decode_temperature(word: u16) -> f32 {
    f32::from(word >> 2) / FULL_SCALE * 165.0 - 40.0
}

pub struct Hih6030<'a, B, D> {
    bus: &'a B,
    address: BusAddress,
    name: String,
    /// Held for the whole request/wait/read sequence.
    delay: Mutex<D>,
}

impl<'a, B, D> Hih6030<'a, B, D>
where
    B: Transport,
    D: DelayNs,
{
    /// Creates the driver and checks the device answers with a measurement.
    pub fn new(
        bus: &'a B,
        address: BusAddress,
        name: Option<String>,
        delay: D,
    ) -> Result<Self, SensorError<B::Error>> {
        let sensor = Hih6030 {
            bus,
            address,
            name: name.unwrap_or_else(|| default_name("hih6030", address)),
            delay: Mutex::new(delay),
        };
        sensor.probe()?;
        Ok(sensor)
    }

    /// Runs one measurement cycle and returns the frame with its status.
    pub fn measure(&self) -> Result<Hih6030Measurement, SensorError<B::Error>> {
        let mut delay = self.delay.lock().unwrap_or_else(PoisonError::into_inner);

        self.bus
            .transact(self.address, &[MEASUREMENT_REQUEST], &mut [])
            .map_err(SensorError::Transport)?;

        timing::settle(&mut *delay, HIH_MEASUREMENT_TIME);

        let mut frame = [0u8; 4];
        self.bus
            .transact(self.address, &[], &mut frame)
            .map_err(SensorError::Transport)?;

        Ok(decode(&frame))
    }
}

impl<B, D> Driver for Hih6030<'_, B, D>
where
    B: Transport,
    D: DelayNs,
{
    type Error = B::Error;

    fn identity(&self) -> &str {
        &self.name
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    /// No ID registers on this family, so a measurement stands in.
    /// A stale frame still proves the device is there.
    fn probe(&self) -> Result<(), SensorError<Self::Error>> {
        match self.measure().map(Hih6030Measurement::into_result::<B::Error>) {
            Ok(Ok(_)) | Ok(Err(SensorError::StaleData { .. })) => Ok(()),
            Ok(Err(e)) | Err(e) => Err(SensorError::not_connected(e)),
        }
    }

    fn snapshot(&self) -> Result<TimestampedReading, SensorError<Self::Error>> {
        let (percent, celsius) = self.read_humidity_and_temperature()?;
        Ok(TimestampedReading::now(
            &self.name,
            Reading::Humidity { celsius, percent },
        ))
    }
}

impl<B, D> HumiditySensor for Hih6030<'_, B, D>
where
    B: Transport,
    D: DelayNs,
{
    fn read_humidity_and_temperature(&self) -> Result<(f32, f32), SensorError<Self::Error>> {
        self.measure()?.into_result()
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SharedBus;
    use core::time::Duration;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::sync::{Arc, Barrier};
    use std::thread;

    const ADDR: u8 = 0x27;

    // 50 %RH, 42.5 °C
    const MID_FRAME: [u8; 4] = [0x1F, 0xFF, 0x7F, 0xFC];

    fn cycle(frame: [u8; 4]) -> [I2cTransaction; 2] {
        [
            I2cTransaction::write(ADDR, vec![0x00]),
            I2cTransaction::read(ADDR, frame.to_vec()),
        ]
    }

    #[test]
    fn test_temperature_endpoints() {
        assert_eq!(decode_temperature(0), -40.0);
        assert_eq!(decode_temperature(16382 << 2), 125.0);
        // low two bits are ignored
        assert_eq!(decode_temperature(0x0003), -40.0);
    }

    #[test]
    fn test_humidity_endpoints() {
        assert_eq!(decode_humidity(0), 0.0);
        assert_eq!(decode_humidity(16382), 100.0);
        // status bits are ignored
        assert_eq!(decode_humidity(0xC000), 0.0);
    }

    #[test]
    fn test_decode_monotonic() {
        let mut last_hum = f32::MIN;
        let mut last_temp = f32::MIN;
        for raw in 0u16..=0x3FFF {
            let hum = decode_humidity(raw);
            let temp = decode_temperature(raw << 2);
            assert!(hum >= last_hum, "humidity dropped at {raw}");
            assert!(temp >= last_temp, "temperature dropped at {raw}");
            last_hum = hum;
            last_temp = temp;
        }
    }

    #[test]
    fn test_status_bits() {
        assert_eq!(Status::from_byte(0x00), Status::Normal);
        assert_eq!(Status::from_byte(0x3F), Status::Normal);
        assert_eq!(Status::from_byte(0x40), Status::StaleData);
        assert_eq!(Status::from_byte(0x80), Status::CommandMode);
        assert_eq!(Status::from_byte(0xC0), Status::CommandMode);
    }

    #[test]
    fn test_stale_frame_keeps_values() {
        let m = decode(&[0x5F, 0xFF, 0x7F, 0xFC]);
        assert_eq!(m.status, Status::StaleData);
        assert_eq!(m.humidity, 50.0);
        assert_eq!(m.temperature, 42.5);

        match m.into_result::<()>() {
            Err(SensorError::StaleData { humidity, temperature }) => {
                assert_eq!(humidity, 50.0);
                assert_eq!(temperature, 42.5);
            }
            other => panic!("expected stale data, got {:?}", other),
        }
    }

    #[test]
    fn test_command_mode_is_an_error() {
        let m = decode(&[0xDF, 0xFF, 0x7F, 0xFC]);
        assert_eq!(m.status, Status::CommandMode);
        assert!(matches!(m.into_result::<()>(), Err(SensorError::CommandMode)));
    }

    #[test]
    fn test_new_probes_and_reads() {
        let mut expectations = cycle(MID_FRAME).to_vec();
        expectations.extend(cycle(MID_FRAME));
        let bus = SharedBus::new(I2cMock::new(&expectations));
        {
            let address = BusAddress::new(ADDR).unwrap();
            let sensor = Hih6030::new(&bus, address, None, NoopDelay::new()).unwrap();
            assert_eq!(sensor.identity(), "hih6030-0x27");

            let snap = sensor.snapshot().unwrap();
            assert_eq!(snap.reading, Reading::Humidity { celsius: 42.5, percent: 50.0 });
        }
        bus.close().done();
    }

    #[test]
    fn test_stale_probe_counts_as_present() {
        let mut expectations = cycle([0x5F, 0xFF, 0x7F, 0xFC]).to_vec();
        expectations.extend(cycle([0x5F, 0xFF, 0x7F, 0xFC]));
        let bus = SharedBus::new(I2cMock::new(&expectations));
        {
            let sensor =
                Hih6030::new(&bus, DEFAULT_ADDRESS, Some("EDFA-back".into()), NoopDelay::new())
                    .unwrap();
            let err = sensor.read_humidity_and_temperature().unwrap_err();
            assert!(err.is_soft());
        }
        bus.close().done();
    }

    #[test]
    fn test_command_mode_probe_is_not_connected() {
        let bus = SharedBus::new(I2cMock::new(&cycle([0x9F, 0xFF, 0x7F, 0xFC])));
        {
            let result = Hih6030::new(&bus, DEFAULT_ADDRESS, None, NoopDelay::new());
            let err = result.err().unwrap();
            assert!(matches!(err.root_cause(), SensorError::CommandMode));
        }
        bus.close().done();
    }

    #[test]
    fn test_bus_error_during_request() {
        let expectations = [I2cTransaction::write(ADDR, vec![0x00]).with_error(ErrorKind::Other)];
        let bus = SharedBus::new(I2cMock::new(&expectations));
        {
            let result = Hih6030::new(&bus, DEFAULT_ADDRESS, None, NoopDelay::new());
            let err = result.err().unwrap();
            assert!(matches!(err, SensorError::NotConnected(_)));
            assert!(matches!(err.root_cause(), SensorError::Transport(ErrorKind::Other)));
        }
        bus.close().done();
    }

    // --- Ordering of request, wait and read ---

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Write(Vec<u8>),
        Wait(u64),
        Read,
    }

    struct MockTransport {
        events: Arc<Mutex<Vec<Event>>>,
        frame: [u8; 4],
    }

    impl Transport for MockTransport {
        type Error = ();

        fn transact(&self, _: BusAddress, write: &[u8], read: &mut [u8]) -> Result<(), ()> {
            let mut events = self.events.lock().unwrap();
            if !write.is_empty() {
                events.push(Event::Write(write.to_vec()));
            }
            if !read.is_empty() {
                read.copy_from_slice(&self.frame);
                events.push(Event::Read);
            }
            Ok(())
        }
    }

    struct RecordingDelay(Arc<Mutex<Vec<Event>>>);

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            {
                let mut events = self.0.lock().unwrap();
                match events.last_mut() {
                    Some(Event::Wait(total)) => *total += u64::from(ns),
                    _ => events.push(Event::Wait(u64::from(ns))),
                }
            }
            // long enough for another thread to slip in if it could
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_request_waits_before_read() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let bus = MockTransport {
            events: events.clone(),
            frame: MID_FRAME,
        };
        let sensor = Hih6030::new(
            &bus,
            DEFAULT_ADDRESS,
            None,
            RecordingDelay(events.clone()),
        )
        .unwrap();
        events.lock().unwrap().clear();

        let m = sensor.measure().unwrap();
        assert_eq!(m.status, Status::Normal);
        assert_eq!(
            *events.lock().unwrap(),
            vec![Event::Write(vec![0x00]), Event::Wait(40_000_000), Event::Read]
        );
    }

    #[test]
    fn test_concurrent_measurements_do_not_interleave() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let bus = MockTransport {
            events: events.clone(),
            frame: MID_FRAME,
        };
        let sensor = Hih6030::new(&bus, DEFAULT_ADDRESS, None, RecordingDelay(events.clone()))
            .unwrap();
        events.lock().unwrap().clear();

        let start = Barrier::new(2);
        thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    start.wait();
                    assert_eq!(sensor.measure().unwrap().status, Status::Normal);
                });
            }
        });

        let one = [Event::Write(vec![0x00]), Event::Wait(40_000_000), Event::Read];
        assert_eq!(*events.lock().unwrap(), [one.clone(), one].concat());
    }

    // --- Shared bus across drivers ---

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum BusEvent {
        Begin,
        End,
    }

    /// Records the start and end of every raw bus transaction.
    struct RecordingI2c {
        events: Arc<Mutex<Vec<BusEvent>>>,
    }

    impl ErrorType for RecordingI2c {
        type Error = ErrorKind;
    }

    impl I2c for RecordingI2c {
        fn transaction(&mut self, _: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
            self.events.lock().unwrap().push(BusEvent::Begin);
            thread::sleep(Duration::from_millis(2));
            for op in operations {
                if let Operation::Read(buf) = op {
                    buf.copy_from_slice(&MID_FRAME);
                }
            }
            self.events.lock().unwrap().push(BusEvent::End);
            Ok(())
        }
    }

    #[test]
    fn test_drivers_sharing_a_bus_never_overlap() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let bus = SharedBus::new(RecordingI2c {
            events: events.clone(),
        });
        let front = Hih6030::new(&bus, DEFAULT_ADDRESS, None, NoopDelay::new()).unwrap();
        let back =
            Hih6030::new(&bus, BusAddress::new(0x28).unwrap(), None, NoopDelay::new()).unwrap();
        events.lock().unwrap().clear();

        let start = Barrier::new(2);
        thread::scope(|scope| {
            for sensor in [&front, &back] {
                let start = &start;
                scope.spawn(move || {
                    start.wait();
                    for _ in 0..3 {
                        sensor.measure().unwrap();
                    }
                });
            }
        });

        let events = events.lock().unwrap();
        // 2 drivers x 3 measurements x (request + read)
        assert_eq!(events.len(), 2 * 3 * 2 * 2);
        assert!(events
            .chunks(2)
            .all(|pair| pair == [BusEvent::Begin, BusEvent::End]));
    }
}
