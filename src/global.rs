//! Process-wide logger
//!
//! A [`LoggerCell`] holds at most one logger for its whole lifetime. It is
//! filled either explicitly ([`LoggerCell::try_install`]) or lazily with the
//! console-only default the first time somebody needs a logger. Whichever
//! happens first wins; later installs are no-ops.

use crate::config::LogConfig;
use crate::error::Result;
use crate::logger::Logger;
use std::sync::{Mutex, OnceLock};

/// One-time initialized logger slot
pub struct LoggerCell {
    logger: OnceLock<Logger>,
    /// Serializes explicit installs so only one of them builds a logger
    install_lock: Mutex<()>,
}

impl LoggerCell {
    pub const fn new() -> Self {
        Self {
            logger: OnceLock::new(),
            install_lock: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<&Logger> {
        self.logger.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.logger.get().is_some()
    }

    /// The installed logger, or the one built by `make` if none exists yet
    ///
    /// Concurrent first calls run `make` exactly once; every caller sees
    /// the same fully constructed logger. The slow path takes the install
    /// lock, so an explicit install in progress always wins over `make`.
    pub fn get_or_init_with<F>(&self, make: F) -> &Logger
    where
        F: FnOnce() -> Logger,
    {
        if let Some(logger) = self.logger.get() {
            return logger;
        }

        let _guard = self
            .install_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.logger.get_or_init(make)
    }

    /// The installed logger, or the lazy console default
    pub fn get_or_default(&self) -> &Logger {
        self.get_or_init_with(|| {
            eprintln!("pipe log to stdout");
            Logger::lazy_default()
        })
    }

    /// Install a logger built by `build` unless one already exists
    ///
    /// # Returns
    /// * `Ok(true)` - `build` ran and its logger was installed
    /// * `Ok(false)` - A logger already existed, `build` did not run
    /// * `Err(RollogError)` - `build` failed, nothing was installed
    ///
    /// `build` runs under the install lock. It must not touch this cell
    /// from the same thread.
    pub fn try_install_with<F>(&self, build: F) -> Result<bool>
    where
        F: FnOnce() -> Result<Logger>,
    {
        let _guard = self
            .install_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.is_initialized() {
            return Ok(false);
        }

        let logger = build()?;
        Ok(self.logger.set(logger).is_ok())
    }

    /// Install the logger described by `config` unless one already exists
    pub fn try_install(&self, config: &LogConfig) -> Result<bool> {
        self.try_install_with(|| Logger::from_config(config))
    }
}

impl Default for LoggerCell {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LoggerCell = LoggerCell::new();

/// The process-wide logger, initializing the lazy default if needed
pub fn logger() -> &'static Logger {
    GLOBAL.get_or_default()
}

/// Whether a process-wide logger exists (explicit or lazy default)
pub fn is_initialized() -> bool {
    GLOBAL.is_initialized()
}

/// Install the process-wide logger from `config`
///
/// Returns `Ok(false)` without touching the file system when a logger
/// already exists.
pub fn try_init(config: &LogConfig) -> Result<bool> {
    GLOBAL.try_install(config)
}

/// Install an already built process-wide logger
pub fn init_with(logger: Logger) -> Result<bool> {
    GLOBAL.try_install_with(|| Ok(logger))
}

/// Install the process-wide logger from `config`, aborting on failure
///
/// A logger that cannot open its file is never installed half
/// configured: the error is surfaced as a panic.
pub fn init(config: &LogConfig) {
    if let Err(e) = try_init(config) {
        panic!("failed to initialize logger: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::LoggerCore;
    use crate::config::RollingBy;
    use crate::error::RollogError;
    use crate::level::Severity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn empty_logger() -> Logger {
        Logger::new(LoggerCore::compose(Vec::new()))
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let cell = Arc::new(LoggerCell::new());
        let constructed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let constructed = Arc::clone(&constructed);
                std::thread::spawn(move || {
                    cell.get_or_init_with(|| {
                        constructed.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                        empty_logger()
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert!(cell.is_initialized());
    }

    #[test]
    fn test_first_install_wins() {
        let cell = LoggerCell::new();
        let builds = AtomicUsize::new(0);

        let first = cell.try_install_with(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(empty_logger())
        });
        let second = cell.try_install_with(|| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(empty_logger())
        });

        assert!(first.unwrap());
        assert!(!second.unwrap());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_install_after_lazy_default_is_noop() {
        let cell = LoggerCell::new();
        cell.get_or_init_with(empty_logger);

        let installed = cell.try_install_with(|| panic!("must not build"));
        assert!(!installed.unwrap());
    }

    #[test]
    fn test_failed_install_leaves_cell_empty() {
        let cell = LoggerCell::new();

        let result = cell.try_install_with(|| Err(RollogError::LogFileError("nope".into())));
        assert!(result.is_err());
        assert!(!cell.is_initialized());

        assert!(cell.try_install_with(|| Ok(empty_logger())).unwrap());
    }

    #[test]
    fn test_lazy_default_waits_for_explicit_install() {
        let temp_dir = TempDir::new().unwrap();
        let config = LogConfig::new(
            temp_dir.path().join("app.log"),
            "debug",
            1,
            2,
            2,
            RollingBy::BY_DATE,
        );

        let cell = Arc::new(LoggerCell::new());
        let lazy_builds = Arc::new(AtomicUsize::new(0));
        let mut lazy_caller = None;

        let installed = cell.try_install_with(|| {
            let logger = Logger::from_config(&config)?;

            // First use from another thread while the file logger is being built
            let cell = Arc::clone(&cell);
            let lazy_builds = Arc::clone(&lazy_builds);
            lazy_caller = Some(std::thread::spawn(move || {
                cell.get_or_init_with(|| {
                    lazy_builds.fetch_add(1, Ordering::SeqCst);
                    empty_logger()
                })
                .enabled(Severity::Debug)
            }));
            std::thread::sleep(Duration::from_millis(50));

            Ok(logger)
        });

        assert!(installed.unwrap());
        let saw_debug = lazy_caller.unwrap().join().unwrap();

        assert_eq!(lazy_builds.load(Ordering::SeqCst), 0);
        // The other thread got the installed file logger, not an empty one
        assert!(saw_debug);
    }
}
