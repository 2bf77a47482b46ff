// Integration test for the console logger used when nothing was initialized
//
// Runs in its own process: it owns the process-wide logger and the debug
// toggle in the environment, so everything lives in a single test.

use rollog::config::DEBUG_ENV_VAR;
use rollog::sink::CONSOLE_SINK;
use rollog::{Logger, Severity};
use std::sync::{Arc, Barrier};
use std::thread;

const CALLERS: usize = 16;

#[test]
fn test_first_use_without_init_installs_console_default() {
    // The toggle decides the threshold of a fresh default
    std::env::remove_var(DEBUG_ENV_VAR);
    let quiet = Logger::lazy_default();
    assert!(!quiet.enabled(Severity::Debug));
    assert!(quiet.enabled(Severity::Info));

    std::env::set_var(DEBUG_ENV_VAR, "1");
    assert!(Logger::lazy_default().enabled(Severity::Debug));

    std::env::set_var(DEBUG_ENV_VAR, "0");
    assert!(!Logger::lazy_default().enabled(Severity::Debug));

    std::env::set_var(DEBUG_ENV_VAR, "true");
    assert!(!rollog::is_initialized());

    let barrier = Arc::new(Barrier::new(CALLERS));
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    rollog::debugf!("caller {}", i);
                } else {
                    rollog::info(&[&"caller", &i]);
                }
                rollog::logger() as *const Logger as usize
            })
        })
        .collect();

    let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(rollog::is_initialized());
    // Every caller got the same logger
    assert!(seen.iter().all(|&p| p == seen[0]));

    let logger = rollog::logger();
    assert_eq!(logger as *const Logger as usize, seen[0]);
    assert_eq!(logger.sink_names(), vec![CONSOLE_SINK]);
    assert!(logger.enabled(Severity::Debug));

    // The toggle is read once; the installed default keeps its threshold
    std::env::remove_var(DEBUG_ENV_VAR);
    assert!(rollog::logger().enabled(Severity::Debug));
    rollog::sync().unwrap();
}
