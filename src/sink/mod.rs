// Sink module - write destinations paired with an encoder and a threshold

mod encoder;

pub use encoder::{Encoder, EncoderStyle};

use crate::config::TimeFormat;
use crate::error::Result;
use crate::level::Severity;
use crate::record::Record;
use crate::rotation::RotationPolicy;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

/// Name of the mandatory file sink
pub const FILE_SINK: &str = "file";

/// Name of the optional console sink
pub const CONSOLE_SINK: &str = "console";

/// A byte destination with its encoder and minimum severity
///
/// Writes are serialized by an internal lock so concurrent records are
/// never interleaved within one sink.
pub struct SinkSpec {
    name: &'static str,
    writer: Mutex<Box<dyn Write + Send>>,
    encoder: Encoder,
    min_severity: Severity,
}

impl SinkSpec {
    pub fn new(
        name: &'static str,
        writer: Box<dyn Write + Send>,
        encoder: Encoder,
        min_severity: Severity,
    ) -> Self {
        Self {
            name,
            writer: Mutex::new(writer),
            encoder,
            min_severity,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Whether a record of `severity` is written to this sink
    pub fn admits(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// Encode and write one record, then flush
    pub fn write_record(&self, record: &Record) -> io::Result<()> {
        let mut line = String::with_capacity(128);
        self.encoder.encode(record, &mut line);

        let mut writer = self.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    /// Flush buffered output
    pub fn sync(&self) -> io::Result<()> {
        self.lock().flush()
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panic mid-write leaves the writer usable
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SinkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSpec")
            .field("name", &self.name)
            .field("encoder", &self.encoder)
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

/// Builds the file sink and, optionally, the console sink
///
/// Both sinks share one threshold.
pub struct SinkBuilder {
    level: Severity,
    time_format: TimeFormat,
    console: Option<Box<dyn Write + Send>>,
}

impl SinkBuilder {
    pub fn new(level: Severity) -> Self {
        Self {
            level,
            time_format: TimeFormat::default(),
            console: None,
        }
    }

    pub fn time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    /// Echo records to stdout
    pub fn console(mut self, enabled: bool) -> Self {
        self.console = if enabled {
            Some(Box::new(io::stdout()))
        } else {
            None
        };
        self
    }

    /// Echo records to `writer` with the console encoding
    pub fn console_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.console = Some(writer);
        self
    }

    /// Open the rotating writer of `policy` and build the sinks
    ///
    /// # Returns
    /// * `Ok(Vec<SinkSpec>)` - File sink first, then the console sink if enabled
    /// * `Err(RollogError)` - The rotating writer could not be constructed
    pub fn build(self, policy: &RotationPolicy) -> Result<Vec<SinkSpec>> {
        let file = policy.open()?;
        Ok(self.build_with_file_writer(file))
    }

    /// Build the sinks around an already constructed file writer
    pub fn build_with_file_writer(self, file: Box<dyn Write + Send>) -> Vec<SinkSpec> {
        let mut sinks = vec![SinkSpec::new(
            FILE_SINK,
            file,
            Encoder::production(self.time_format.clone()),
            self.level,
        )];

        if let Some(console) = self.console {
            sinks.push(SinkSpec::new(
                CONSOLE_SINK,
                console,
                Encoder::development(self.time_format),
                self.level,
            ));
        }

        sinks
    }

    /// Single stdout sink of the lazy default logger
    pub fn console_only(level: Severity) -> SinkSpec {
        SinkSpec::new(
            CONSOLE_SINK,
            Box::new(io::stdout()),
            Encoder::development(TimeFormat::default()),
            level,
        )
    }
}
