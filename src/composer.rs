// Core composer - fans records out to every admitting sink

use crate::level::Severity;
use crate::record::Record;
use crate::sink::SinkSpec;
use chrono::{Local, SecondsFormat};
use std::io;

/// The narrow interface every log producer talks to
pub trait Dispatch: Send + Sync {
    /// Whether any destination admits `severity`
    fn enabled(&self, severity: Severity) -> bool;

    /// Deliver one record
    fn dispatch(&self, record: &Record);

    /// Flush buffered output
    fn sync(&self) -> io::Result<()> {
        Ok(())
    }

    /// Names of the destinations in dispatch order
    fn sink_names(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// Ordered collection of sinks, immutable once composed
#[derive(Debug)]
pub struct LoggerCore {
    sinks: Vec<SinkSpec>,
}

impl LoggerCore {
    /// Compose sinks in dispatch order
    pub fn compose(sinks: Vec<SinkSpec>) -> Self {
        Self { sinks }
    }

    pub fn sinks(&self) -> &[SinkSpec] {
        &self.sinks
    }

    /// Write `record` to every admitting sink, returning how many accepted it
    ///
    /// A failing sink is reported on stderr and does not stop the others.
    pub fn dispatch_record(&self, record: &Record) -> usize {
        let mut written = 0;
        for sink in self.sinks.iter().filter(|s| s.admits(record.severity)) {
            match sink.write_record(record) {
                Ok(()) => written += 1,
                Err(e) => report_write_error(sink.name(), &e),
            }
        }
        written
    }
}

impl Dispatch for LoggerCore {
    fn enabled(&self, severity: Severity) -> bool {
        self.sinks.iter().any(|s| s.admits(severity))
    }

    fn dispatch(&self, record: &Record) {
        self.dispatch_record(record);
    }

    fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(SinkSpec::name).collect()
    }

    fn sync(&self) -> io::Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.sync() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Internal error output of the logger
fn report_write_error(sink: &str, error: &io::Error) {
    eprintln!(
        "{} rollog: write error on {} sink: {}",
        Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        sink,
        error
    );
}
