// Package-level entry points - delegate to the process-wide logger

use crate::global::logger;
use crate::logger::Abort;
use std::fmt;

#[track_caller]
pub fn debug(parts: &[&dyn fmt::Display]) {
    logger().debug(parts);
}

#[track_caller]
pub fn info(parts: &[&dyn fmt::Display]) {
    logger().info(parts);
}

#[track_caller]
pub fn warn(parts: &[&dyn fmt::Display]) {
    logger().warn(parts);
}

#[track_caller]
pub fn error(parts: &[&dyn fmt::Display]) {
    logger().error(parts);
}

/// Logs at DPANIC and returns; never terminates
#[track_caller]
pub fn dpanic(parts: &[&dyn fmt::Display]) {
    logger().dpanic(parts);
}

/// Logs at PANIC; raise the returned [`Abort`] to unwind
#[track_caller]
pub fn panic(parts: &[&dyn fmt::Display]) -> Abort {
    logger().panic(parts)
}

/// Logs at FATAL; raise the returned [`Abort`] to exit with status 1
#[track_caller]
pub fn fatal(parts: &[&dyn fmt::Display]) -> Abort {
    logger().fatal(parts)
}

#[track_caller]
pub fn debugf(args: fmt::Arguments<'_>) {
    logger().debugf(args);
}

#[track_caller]
pub fn infof(args: fmt::Arguments<'_>) {
    logger().infof(args);
}

#[track_caller]
pub fn warnf(args: fmt::Arguments<'_>) {
    logger().warnf(args);
}

#[track_caller]
pub fn errorf(args: fmt::Arguments<'_>) {
    logger().errorf(args);
}

#[track_caller]
pub fn dpanicf(args: fmt::Arguments<'_>) {
    logger().dpanicf(args);
}

#[track_caller]
pub fn panicf(args: fmt::Arguments<'_>) -> Abort {
    logger().panicf(args)
}

#[track_caller]
pub fn fatalf(args: fmt::Arguments<'_>) -> Abort {
    logger().fatalf(args)
}

/// Flush every sink of the process-wide logger
pub fn sync() -> std::io::Result<()> {
    logger().sync()
}
