//! Bridge from `tracing` events into a [`Logger`]
//!
//! Install [`RollogLayer`] on a `tracing_subscriber` registry so that
//! `tracing::info!` and friends end up in the same sinks as the facade.
//! TRACE events are treated as DEBUG. The `message` field becomes the
//! record message; every other field is kept as a typed structured field.

use crate::level::Severity;
use crate::logger::Logger;
use crate::record::{Caller, FieldValue, Record};
use crate::stack::StackTrace;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// `tracing_subscriber` layer writing events through a [`Logger`]
#[derive(Debug, Clone)]
pub struct RollogLayer {
    logger: Logger,
}

impl RollogLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Layer over the process-wide logger
    pub fn global() -> Self {
        Self::new(crate::global::logger().clone())
    }
}

/// Map a `tracing` level onto a severity
pub fn severity_of(level: &Level) -> Severity {
    if *level == Level::ERROR {
        Severity::Error
    } else if *level == Level::WARN {
        Severity::Warn
    } else if *level == Level::INFO {
        Severity::Info
    } else {
        Severity::Debug
    }
}

impl<S> Layer<S> for RollogLayer
where
    S: Subscriber,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.logger.enabled(severity_of(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let severity = severity_of(metadata.level());
        if !self.logger.enabled(severity) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = Record::new(severity, visitor.message.unwrap_or_default());
        record.fields = visitor.fields;
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            record.caller = Some(Caller { file, line });
        }
        if severity.captures_stack() {
            record.stack = Some(StackTrace::capture(0));
        }

        self.logger.dispatch(&record);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<crate::record::Field>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: FieldValue) {
        if field.name() == "message" {
            self.message = Some(match value {
                FieldValue::Str(s) => s,
                other => format!("{:?}", other),
            });
            return;
        }
        self.fields.push(crate::record::Field {
            key: field.name().to_string(),
            value,
        });
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, FieldValue::Str(format!("{:?}", value)));
    }
}
