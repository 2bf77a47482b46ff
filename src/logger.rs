//! Logger handle and severity-named entry points
//!
//! A [`Logger`] is a cheap, clonable handle over a [`Dispatch`]
//! implementation, normally a composed [`LoggerCore`]. Every entry point
//! is `#[track_caller]`, so the recorded caller is the code calling into
//! the logger rather than the logger itself.
//!
//! Records of ERROR and above carry a captured [`StackTrace`]. The PANIC
//! and FATAL entry points log and then hand back an [`Abort`]: the caller
//! decides whether to actually terminate with [`Abort::raise`].

use crate::composer::{Dispatch, LoggerCore};
use crate::config::{debug_env_enabled, LogConfig};
use crate::error::{RollogError, Result};
use crate::level::{resolve_level, Severity};
use crate::record::{Caller, FieldValue, Record};
use crate::rotation::{RotationParams, RotationPolicy};
use crate::sink::SinkBuilder;
use crate::stack::StackTrace;
use std::fmt::{self, Write as _};
use std::io;
use std::sync::Arc;

/// Placeholder for a value whose `Display` implementation failed
const FORMAT_ERROR: &str = "%!(FORMAT_ERROR)";

/// Function paths of the logging machinery itself
///
/// Leading frames under these paths are dropped from captured stacks, so
/// the first frame is the code that called into the logger or the facade.
const INTERNAL_FRAMES: &[&str] = &[
    "rollog::logger::Logger::",
    "rollog::logger::RecordBuilder",
    "rollog::logger::capture_stack",
    "rollog::facade::",
];

fn capture_stack() -> StackTrace {
    StackTrace::capture(0).trim_leading(INTERNAL_FRAMES)
}

/// What an [`Abort`] does when raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// Unwind with the message as panic payload
    Panic,
    /// Exit the process with status 1
    Fatal,
}

/// Termination requested by a PANIC or FATAL log call
#[must_use = "an Abort does nothing unless raised or handled"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    kind: AbortKind,
    message: String,
}

impl Abort {
    pub fn kind(&self) -> AbortKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Process exit status a FATAL abort terminates with
    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            AbortKind::Panic => None,
            AbortKind::Fatal => Some(1),
        }
    }

    /// Carry out the termination
    ///
    /// PANIC unwinds with the message as payload, so it can be caught by the
    /// caller's own supervision (`std::panic::catch_unwind`).
    ///
    /// FATAL calls `std::process::exit(1)`: destructors of live values do
    /// not run and scoped cleanup is skipped. This is intentional; the
    /// record itself has already been flushed to every sink.
    pub fn raise(self) -> ! {
        match self.kind {
            AbortKind::Panic => std::panic::panic_any(self.message),
            AbortKind::Fatal => std::process::exit(1),
        }
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<Abort> for RollogError {
    fn from(abort: Abort) -> Self {
        RollogError::Aborted(abort.message)
    }
}

/// Handle to a composed logger
#[derive(Clone)]
pub struct Logger {
    dispatcher: Arc<dyn Dispatch>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    /// Wrap a composed core
    pub fn new(core: LoggerCore) -> Self {
        Self {
            dispatcher: Arc::new(core),
        }
    }

    /// Wrap any dispatcher
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { dispatcher }
    }

    /// Build a logger from configuration
    ///
    /// Resolves the level (unknown names fall back to INFO with a
    /// diagnostic), resolves the rotation policy, opens the rotating
    /// writer and composes the sinks. Nothing is returned unless every
    /// step succeeded.
    pub fn from_config(config: &LogConfig) -> Result<Self> {
        config.validate()?;

        let level = resolve_level(&config.level);
        let policy = RotationPolicy::resolve(&RotationParams::from(config))?;
        let sinks = SinkBuilder::new(level)
            .time_format(config.time_format.clone())
            .console(config.console)
            .build(&policy)?;

        Ok(Self::new(LoggerCore::compose(sinks)))
    }

    /// Console-only logger used when nothing was initialized
    ///
    /// The threshold is DEBUG when the debug toggle is set in the
    /// environment, INFO otherwise.
    pub fn lazy_default() -> Self {
        let level = if debug_env_enabled() {
            Severity::Debug
        } else {
            Severity::Info
        };
        Self::new(LoggerCore::compose(vec![SinkBuilder::console_only(level)]))
    }

    /// Whether a record of `severity` would reach any sink
    pub fn enabled(&self, severity: Severity) -> bool {
        self.dispatcher.enabled(severity)
    }

    /// Deliver a fully built record as is
    pub fn dispatch(&self, record: &Record) {
        self.dispatcher.dispatch(record);
    }

    /// Flush every sink
    pub fn sync(&self) -> io::Result<()> {
        self.dispatcher.sync()
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.dispatcher.sink_names()
    }

    /// Start a structured record with typed fields
    #[track_caller]
    pub fn record(&self, severity: Severity, message: impl Into<String>) -> RecordBuilder<'_> {
        RecordBuilder {
            logger: self,
            record: Record::new(severity, message).with_caller(Caller::here()),
        }
    }

    #[inline(never)]
    #[track_caller]
    fn log(&self, severity: Severity, message: impl FnOnce() -> String) {
        if !self.enabled(severity) {
            return;
        }

        let mut record = Record::new(severity, message()).with_caller(Caller::here());
        if severity.captures_stack() {
            record.stack = Some(capture_stack());
        }
        self.dispatcher.dispatch(&record);
    }

    #[track_caller]
    fn abort(&self, severity: Severity, kind: AbortKind, message: String) -> Abort {
        self.log(severity, || message.clone());
        Abort { kind, message }
    }

    #[track_caller]
    pub fn debug(&self, parts: &[&dyn fmt::Display]) {
        self.log(Severity::Debug, || join(parts));
    }

    #[track_caller]
    pub fn info(&self, parts: &[&dyn fmt::Display]) {
        self.log(Severity::Info, || join(parts));
    }

    #[track_caller]
    pub fn warn(&self, parts: &[&dyn fmt::Display]) {
        self.log(Severity::Warn, || join(parts));
    }

    #[track_caller]
    pub fn error(&self, parts: &[&dyn fmt::Display]) {
        self.log(Severity::Error, || join(parts));
    }

    #[track_caller]
    pub fn dpanic(&self, parts: &[&dyn fmt::Display]) {
        self.log(Severity::DPanic, || join(parts));
    }

    #[track_caller]
    pub fn panic(&self, parts: &[&dyn fmt::Display]) -> Abort {
        self.abort(Severity::Panic, AbortKind::Panic, join(parts))
    }

    #[track_caller]
    pub fn fatal(&self, parts: &[&dyn fmt::Display]) -> Abort {
        self.abort(Severity::Fatal, AbortKind::Fatal, join(parts))
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Debug, || render(args));
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Info, || render(args));
    }

    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Warn, || render(args));
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Error, || render(args));
    }

    #[track_caller]
    pub fn dpanicf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::DPanic, || render(args));
    }

    #[track_caller]
    pub fn panicf(&self, args: fmt::Arguments<'_>) -> Abort {
        self.abort(Severity::Panic, AbortKind::Panic, render(args))
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> Abort {
        self.abort(Severity::Fatal, AbortKind::Fatal, render(args))
    }
}

/// Structured record under construction, see [`Logger::record`]
pub struct RecordBuilder<'a> {
    logger: &'a Logger,
    record: Record,
}

impl RecordBuilder<'_> {
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.record = self.record.with_field(key, value);
        self
    }

    /// Dispatch the record if its severity is enabled
    pub fn emit(self) {
        let RecordBuilder { logger, mut record } = self;
        if !logger.enabled(record.severity) {
            return;
        }
        if record.severity.captures_stack() {
            record.stack = Some(capture_stack());
        }
        logger.dispatch(&record);
    }
}

/// Join parts with a single space, degrading failed parts to a marker
fn join(parts: &[&dyn fmt::Display]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if write!(out, "{}", part).is_err() {
            out.push_str(FORMAT_ERROR);
        }
    }
    out
}

/// Render format arguments, never panicking on a failing `Display`
fn render(args: fmt::Arguments<'_>) -> String {
    let mut out = String::new();
    if fmt::write(&mut out, args).is_err() {
        out.push_str(FORMAT_ERROR);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        min: Option<Severity>,
        records: Mutex<Vec<Record>>,
    }

    impl Recorder {
        fn at(min: Severity) -> Arc<Self> {
            Arc::new(Self {
                min: Some(min),
                records: Mutex::new(Vec::new()),
            })
        }

        fn taken(&self) -> Vec<Record> {
            std::mem::take(&mut *self.records.lock().unwrap())
        }
    }

    impl Dispatch for Recorder {
        fn enabled(&self, severity: Severity) -> bool {
            self.min.map_or(false, |min| severity >= min)
        }

        fn dispatch(&self, record: &Record) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    struct Failing;

    impl fmt::Display for Failing {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_plain_parts_are_space_joined() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        logger.info(&[&"user", &42, &true]);

        let records = recorder.taken();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "user 42 true");
        assert_eq!(records[0].severity, Severity::Info);
    }

    #[test]
    fn test_formatted_message() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        logger.warnf(format_args!("x={}", 5));

        assert_eq!(recorder.taken()[0].message, "x=5");
    }

    #[test]
    fn test_caller_is_the_call_site() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        let line = line!() + 1;
        logger.infof(format_args!("here"));

        let caller = recorder.taken()[0].caller.unwrap();
        assert!(caller.file.ends_with("logger.rs"));
        assert_eq!(caller.line, line);
    }

    #[test]
    fn test_stack_only_from_error_up() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        logger.debugf(format_args!("quiet"));
        logger.warn(&[&"careful"]);
        logger.errorf(format_args!("broken"));
        logger.dpanic(&[&"odd"]);

        let records = recorder.taken();
        assert!(records[0].stack.is_none());
        assert!(records[1].stack.is_none());
        assert!(!records[2].stack.as_ref().unwrap().is_empty());
        assert!(!records[3].stack.as_ref().unwrap().is_empty());
    }

    #[inline(never)]
    fn report_failure(logger: &Logger) {
        logger.errorf(format_args!("failed"));
    }

    #[test]
    fn test_stack_starts_at_the_caller() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        report_failure(&logger);
        logger.record(Severity::Error, "structured").emit();

        let records = recorder.taken();
        let first = &records[0].stack.as_ref().unwrap().frames()[0];
        assert!(first.function.contains("report_failure"), "{}", first.function);

        let first = &records[1].stack.as_ref().unwrap().frames()[0];
        assert!(
            first.function.contains("test_stack_starts_at_the_caller"),
            "{}",
            first.function
        );
    }

    #[test]
    fn test_disabled_severity_is_not_dispatched() {
        let recorder = Recorder::at(Severity::Warn);
        let logger = Logger::with_dispatcher(recorder.clone());

        logger.debugf(format_args!("hidden"));
        logger.info(&[&"hidden"]);

        assert!(recorder.taken().is_empty());
    }

    #[test]
    fn test_failing_display_degrades() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        logger.info(&[&"value", &Failing]);
        logger.infof(format_args!("value {}", Failing));

        let records = recorder.taken();
        assert_eq!(records[0].message, format!("value {}", FORMAT_ERROR));
        assert!(records[1].message.ends_with(FORMAT_ERROR));
    }

    #[test]
    fn test_panic_returns_abort_after_logging() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        let abort = logger.panicf(format_args!("bad state {}", 7));

        assert_eq!(abort.kind(), AbortKind::Panic);
        assert_eq!(abort.message(), "bad state 7");
        assert_eq!(abort.exit_code(), None);

        let records = recorder.taken();
        assert_eq!(records[0].severity, Severity::Panic);
        assert!(records[0].stack.is_some());
    }

    #[test]
    fn test_raised_panic_carries_message() {
        let logger = Logger::with_dispatcher(Recorder::at(Severity::Debug));
        let abort = logger.panic(&[&"unrecoverable"]);

        let payload = std::panic::catch_unwind(move || -> () { abort.raise() }).unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "unrecoverable");
    }

    #[test]
    fn test_fatal_abort_even_when_disabled() {
        let recorder = Recorder::at(Severity::Fatal);
        let logger = Logger::with_dispatcher(recorder.clone());

        let abort = logger.fatal(&[&"shutting down"]);
        assert_eq!(abort.kind(), AbortKind::Fatal);
        assert_eq!(abort.exit_code(), Some(1));
        assert_eq!(recorder.taken().len(), 1);

        // Nothing admitted at all
        let quiet = Logger::with_dispatcher(Arc::new(Recorder::default()));
        let abort = quiet.fatalf(format_args!("still returned"));
        assert_eq!(abort.message(), "still returned");

        let err: RollogError = abort.into();
        assert!(matches!(err, RollogError::Aborted(_)));
    }

    #[test]
    fn test_record_builder_fields() {
        let recorder = Recorder::at(Severity::Debug);
        let logger = Logger::with_dispatcher(recorder.clone());

        logger
            .record(Severity::Error, "request failed")
            .field("status", 503)
            .field("path", "/api")
            .emit();

        let records = recorder.taken();
        assert_eq!(records[0].fields.len(), 2);
        assert_eq!(records[0].fields[0].value, FieldValue::I64(503));
        assert!(records[0].stack.is_some());
        assert!(records[0].caller.unwrap().file.ends_with("logger.rs"));
    }
}
