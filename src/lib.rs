// Library exports for the rollog logging facility

pub mod bridge;
pub mod composer;
pub mod config;
pub mod error;
mod facade;
pub mod global;
pub mod level;
pub mod logger;
mod macros;
pub mod record;
pub mod rotation;
pub mod sink;
pub mod stack;

pub use bridge::RollogLayer;
pub use composer::{Dispatch, LoggerCore};
pub use config::{LogConfig, RollingBy, TimeFormat};
pub use error::{Result, RollogError};
pub use facade::{
    debug, debugf, dpanic, dpanicf, error, errorf, fatal, fatalf, info, infof, panic, panicf, sync,
    warn, warnf,
};
pub use global::{init, init_with, is_initialized, logger, try_init};
pub use level::{resolve_level, Severity};
pub use logger::{Abort, AbortKind, Logger, RecordBuilder};
pub use record::{Caller, FieldValue, Record};
pub use rotation::{Retention, RotationPolicy};
