use crate::config::TimeFormat;
use crate::level::Severity;
use crate::record::Record;
use chrono::{DateTime, Local, SecondsFormat};
use colored::{ColoredString, Colorize};
use std::fmt::Write as _;

/// Layout family of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStyle {
    /// Plain capitalized levels, meant for files
    Production,
    /// Colorized levels, meant for an interactive terminal
    Development,
}

/// Turns records into tab-separated text lines
///
/// Layout: `<timestamp>\t<LEVEL>\t<file:line>\t<message>[\t<fields>]`,
/// followed by the stack trace on the next lines when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    style: EncoderStyle,
    time_format: TimeFormat,
    colorize: bool,
}

impl Encoder {
    pub fn production(time_format: TimeFormat) -> Self {
        Self {
            style: EncoderStyle::Production,
            time_format,
            colorize: false,
        }
    }

    pub fn development(time_format: TimeFormat) -> Self {
        Self {
            style: EncoderStyle::Development,
            time_format,
            colorize: true,
        }
    }

    pub fn style(&self) -> EncoderStyle {
        self.style
    }

    pub fn colorize(&self) -> bool {
        self.colorize
    }

    /// Append the encoded record to `buf`
    pub fn encode(&self, record: &Record, buf: &mut String) {
        buf.push_str(&self.format_time(&record.timestamp));
        buf.push('\t');

        if self.colorize {
            let _ = write!(buf, "{}", color_level(record.severity));
        } else {
            buf.push_str(record.severity.as_str());
        }

        if let Some(caller) = record.caller {
            let _ = write!(buf, "\t{}", caller);
        }

        buf.push('\t');
        buf.push_str(&record.message);

        if let Some(fields) = record.fields_json() {
            buf.push('\t');
            buf.push_str(&fields);
        }

        if let Some(ref stack) = record.stack {
            buf.push('\n');
            let _ = write!(buf, "{}", stack);
        }

        buf.push('\n');
    }

    fn format_time(&self, timestamp: &DateTime<Local>) -> String {
        let rfc3339 = || timestamp.to_rfc3339_opts(SecondsFormat::Secs, false);
        match self.time_format {
            TimeFormat::Rfc3339 => rfc3339(),
            TimeFormat::Custom(ref layout) => {
                let mut out = String::new();
                // Best effort: an unformattable layout degrades to RFC3339
                match write!(out, "{}", timestamp.format(layout)) {
                    Ok(()) => out,
                    Err(_) => rfc3339(),
                }
            }
        }
    }
}

fn color_level(severity: Severity) -> ColoredString {
    let name = severity.as_str();
    match severity {
        Severity::Debug => name.magenta(),
        Severity::Info => name.blue(),
        Severity::Warn => name.yellow(),
        Severity::Error | Severity::DPanic | Severity::Panic | Severity::Fatal => name.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Caller;
    use crate::stack::StackTrace;
    use chrono::TimeZone;

    fn fixed_record(severity: Severity, message: &str) -> Record {
        let mut record = Record::new(severity, message).with_caller(Caller {
            file: "src/main.rs",
            line: 42,
        });
        record.timestamp = Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        record
    }

    #[test]
    fn test_production_layout() {
        let record = fixed_record(Severity::Warn, "x=5");
        let mut line = String::new();
        Encoder::production(TimeFormat::Rfc3339).encode(&record, &mut line);

        let parts: Vec<&str> = line.trim_end().split('\t').collect();
        assert_eq!(parts.len(), 4);
        assert!(parts[0].starts_with("2024-05-06T07:08:09"));
        assert_eq!(parts[1], "WARN");
        assert_eq!(parts[2], "src/main.rs:42");
        assert_eq!(parts[3], "x=5");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_custom_time_format() {
        let record = fixed_record(Severity::Info, "hello");
        let mut line = String::new();
        Encoder::production(TimeFormat::Custom("%Y-%m-%d %H:%M:%S%.3f".to_string()))
            .encode(&record, &mut line);

        assert!(line.starts_with("2024-05-06 07:08:09.000\tINFO\t"));
    }

    #[test]
    fn test_fields_follow_message() {
        let record = fixed_record(Severity::Info, "served").with_field("status", 200);
        let mut line = String::new();
        Encoder::production(TimeFormat::Rfc3339).encode(&record, &mut line);

        assert!(line.trim_end().ends_with("served\t{\"status\":200}"));
    }

    #[test]
    fn test_stack_on_following_lines() {
        let record = fixed_record(Severity::Error, "boom").with_stack(StackTrace::capture(0));
        let mut line = String::new();
        Encoder::production(TimeFormat::Rfc3339).encode(&record, &mut line);

        let mut lines = line.lines();
        assert!(lines.next().unwrap().ends_with("\tboom"));
        assert!(lines.next().is_some());
    }

    #[test]
    fn test_development_keeps_level_name() {
        let record = fixed_record(Severity::Error, "boom");
        let mut line = String::new();
        let encoder = Encoder::development(TimeFormat::Rfc3339);
        encoder.encode(&record, &mut line);

        assert_eq!(encoder.style(), EncoderStyle::Development);
        assert!(encoder.colorize());
        assert!(line.contains("ERROR"));
    }
}
