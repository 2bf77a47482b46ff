//! `format!`-style logging through the process-wide logger
//!
//! ```no_run
//! rollog::warnf!("x={}", 5);
//! rollog::errorf!("request {} failed: {}", 17, "timeout");
//! ```

#[macro_export]
macro_rules! debugf {
    ($($arg:tt)+) => {
        $crate::debugf(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! infof {
    ($($arg:tt)+) => {
        $crate::infof(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! warnf {
    ($($arg:tt)+) => {
        $crate::warnf(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! errorf {
    ($($arg:tt)+) => {
        $crate::errorf(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! dpanicf {
    ($($arg:tt)+) => {
        $crate::dpanicf(::std::format_args!($($arg)+))
    };
}

/// Logs at PANIC, then unwinds with the message
#[macro_export]
macro_rules! panicf {
    ($($arg:tt)+) => {
        $crate::panicf(::std::format_args!($($arg)+)).raise()
    };
}

/// Logs at FATAL, then exits the process with status 1
#[macro_export]
macro_rules! fatalf {
    ($($arg:tt)+) => {
        $crate::fatalf(::std::format_args!($($arg)+)).raise()
    };
}
