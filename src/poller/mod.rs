// src/poller/mod.rs

//! Fixed-cadence polling of a set of drivers.
//!
//! Each cycle starts `interval` after the previous one started; the time spent
//! talking to the sensors is subtracted from the pause. A sensor that fails
//! is reported and skipped, the rest of the cycle carries on.

pub mod shutdown;
pub mod sink;

pub use shutdown::{ShutdownError, ShutdownSignal};
pub use sink::{ReadingSink, StdioSink, WriterSink};

use crate::common::SensorError;
use crate::sensor::BoxedDriver;
use core::fmt::Debug;
use core::ops::Sub;
use core::time::Duration;
use std::thread;

/// Clock and sleep used by the poll loop.
pub trait PollTimer {
    type Instant: Copy + Sub<Self::Instant, Output = Duration>;

    fn now(&self) -> Self::Instant;

    /// Sleeps for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` if shutdown was requested.
    fn pause(&mut self, duration: Duration, shutdown: &ShutdownSignal) -> bool;
}

/// Wall clock, sleeping on the shutdown signal's condvar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimer;

impl PollTimer for SystemTimer {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn pause(&mut self, duration: Duration, shutdown: &ShutdownSignal) -> bool {
        shutdown.wait_timeout(duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    ShuttingDown,
}

/// Outcome of one pass over every sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub cycles: u64,
}

pub struct Poller<'a, E, T> {
    sensors: Vec<BoxedDriver<'a, E>>,
    interval: Duration,
    timer: T,
    parallel: bool,
    state: PollState,
}

impl<'a, E, T> Poller<'a, E, T>
where
    E: Debug + Send,
    T: PollTimer,
{
    pub fn new(sensors: Vec<BoxedDriver<'a, E>>, interval: Duration, timer: T) -> Self {
        Poller {
            sensors,
            interval,
            timer,
            parallel: false,
            state: PollState::Running,
        }
    }

    /// Snapshot the sensors of a cycle concurrently, one thread each.
    /// Output keeps the configured order either way.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Hands the drivers back, e.g. to drop them before closing the bus.
    pub fn into_sensors(self) -> Vec<BoxedDriver<'a, E>> {
        self.sensors
    }

    /// Runs a single cycle: every sensor is asked for a snapshot exactly once.
    pub fn poll_once<S: ReadingSink + ?Sized>(&self, sink: &mut S) -> CycleReport {
        let start = self.timer.now();
        let mut report = CycleReport::default();

        if self.parallel {
            let results = thread::scope(|scope| {
                let handles: Vec<_> = self
                    .sensors
                    .iter()
                    .map(|sensor| scope.spawn(move || sensor.snapshot_json()))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                    .collect::<Vec<_>>()
            });
            for (sensor, result) in self.sensors.iter().zip(results) {
                Self::deliver(sensor.identity(), result, sink, &mut report);
            }
        } else {
            for sensor in &self.sensors {
                Self::deliver(sensor.identity(), sensor.snapshot_json(), sink, &mut report);
            }
        }

        report.elapsed = self.timer.now() - start;
        log::debug!(
            "cycle done in {:?}: {} ok, {} failed",
            report.elapsed,
            report.succeeded,
            report.failed
        );
        report
    }

    /// Polls until `shutdown` is requested, then returns in `ShuttingDown`.
    ///
    /// The signal is checked before each cycle and interrupts the pause
    /// between cycles; a cycle in progress always completes.
    pub fn run<S: ReadingSink + ?Sized>(
        &mut self,
        sink: &mut S,
        shutdown: &ShutdownSignal,
    ) -> PollSummary {
        let mut summary = PollSummary::default();
        log::info!(
            "polling {} sensor(s) every {:?}",
            self.sensors.len(),
            self.interval
        );

        while self.state == PollState::Running {
            if shutdown.is_requested() {
                self.state = PollState::ShuttingDown;
                break;
            }

            let start = self.timer.now();
            self.poll_once(&mut *sink);
            summary.cycles += 1;

            let elapsed = self.timer.now() - start;
            if elapsed >= self.interval {
                log::warn!(
                    "cycle took {:?}, longer than the {:?} interval; starting the next one now",
                    elapsed,
                    self.interval
                );
            } else if self.timer.pause(self.interval - elapsed, shutdown) {
                self.state = PollState::ShuttingDown;
            }
        }

        log::info!("polling stopped after {} cycle(s)", summary.cycles);
        summary
    }

    fn deliver<S: ReadingSink + ?Sized>(
        name: &str,
        result: Result<String, SensorError<E>>,
        sink: &mut S,
        report: &mut CycleReport,
    ) {
        match result {
            Ok(line) => {
                sink.emit(&line);
                report.succeeded += 1;
            }
            Err(e) => {
                log::debug!("{}: {:?}", name, e);
                sink.report_failure(name, &e);
                report.failed += 1;
            }
        }
    }
}
