// Level gate - severity names and threshold resolution

use crate::error::{RollogError, Result};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Ordered record severity
///
/// The derived ordering is the admission order: a sink admits a record
/// iff `record.severity >= sink.min_severity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    DPanic,
    Panic,
    Fatal,
}

impl Severity {
    /// All severities in ascending order
    pub const ALL: [Severity; 7] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::DPanic,
        Severity::Panic,
        Severity::Fatal,
    ];

    /// Capitalized name as written into log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::DPanic => "DPANIC",
            Severity::Panic => "PANIC",
            Severity::Fatal => "FATAL",
        }
    }

    /// Whether records of this severity carry a captured stack trace
    pub fn captures_stack(&self) -> bool {
        *self >= Severity::Error
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RollogError;

    /// Strict, case-insensitive parse. The empty string is INFO so that
    /// a zero-valued configuration is still useful.
    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" | "" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            "DPANIC" => Ok(Severity::DPanic),
            "PANIC" => Ok(Severity::Panic),
            "FATAL" => Ok(Severity::Fatal),
            _ => Err(RollogError::InvalidLevel(name.to_string())),
        }
    }
}

/// Resolve a level name, falling back to INFO on unknown input
///
/// Unknown names are reported on standard output and never fail.
pub fn resolve_level(name: &str) -> Severity {
    resolve_level_with(name, &mut std::io::stdout())
}

/// Resolve a level name, writing the fallback diagnostic to `diagnostics`
pub fn resolve_level_with<W: Write>(name: &str, diagnostics: &mut W) -> Severity {
    match name.parse() {
        Ok(severity) => severity,
        Err(_) => {
            let _ = writeln!(diagnostics, "invalid log level {}", name);
            Severity::Info
        }
    }
}
