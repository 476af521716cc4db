// src/common/timing.rs

use core::time::Duration;
use embedded_hal::delay::DelayNs;

// Nominal values from the datasheets, rounded up. The drivers wait these
// fixed durations; none of them poll the device for readiness.

// === HIH6030 / HIHxxxx-021 ===

/// Measurement cycle is ~36.65 ms per the Honeywell I2C application note.
pub const HIH_MEASUREMENT_TIME: Duration = Duration::from_millis(40);

// === SHTC3 ===

/// Normal-mode measurement, max 12.1 ms.
pub const SHTC3_NORMAL_MEASUREMENT_TIME: Duration = Duration::from_millis(15);
/// Low-power measurement, max 0.8 ms.
pub const SHTC3_LOW_POWER_MEASUREMENT_TIME: Duration = Duration::from_millis(1);
/// Wake-up and soft-reset both complete within 240 µs.
pub const SHTC3_WAKEUP_TIME: Duration = Duration::from_millis(1);

// === Polling ===

/// Cadence between poll cycle starts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Blocks on `delay` for `duration`, at microsecond resolution.
pub fn settle<D: DelayNs>(delay: &mut D, duration: Duration) {
    let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
    delay.delay_us(micros);
}
