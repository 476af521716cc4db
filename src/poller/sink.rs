// src/poller/sink.rs

use core::fmt;
use std::io::{self, Write};

/// Where a poll cycle sends its results.
pub trait ReadingSink {
    /// One successfully encoded reading.
    fn emit(&mut self, line: &str);

    /// A sensor failed this cycle.
    fn report_failure(&mut self, sensor: &str, error: &dyn fmt::Display);
}

/// Writes data lines to one stream and diagnostics to another.
#[derive(Debug)]
pub struct WriterSink<O, D> {
    data: O,
    diagnostics: D,
}

/// JSON lines on stdout, `"<sensor>: <error>"` on stderr.
pub type StdioSink = WriterSink<io::Stdout, io::Stderr>;

impl StdioSink {
    pub fn stdio() -> Self {
        WriterSink::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, D: Write> WriterSink<O, D> {
    pub fn new(data: O, diagnostics: D) -> Self {
        WriterSink { data, diagnostics }
    }

    pub fn into_inner(self) -> (O, D) {
        (self.data, self.diagnostics)
    }
}

impl<O: Write, D: Write> ReadingSink for WriterSink<O, D> {
    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.data, "{}", line).and_then(|_| self.data.flush()) {
            log::warn!("dropped reading: {}", e);
        }
    }

    fn report_failure(&mut self, sensor: &str, error: &dyn fmt::Display) {
        if let Err(e) = writeln!(self.diagnostics, "{}: {}", sensor, error) {
            log::warn!("dropped diagnostic for {}: {}", sensor, e);
        }
    }
}
