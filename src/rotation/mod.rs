//! Rotation policy resolution
//!
//! Turns the `init` parameters into one immutable [`RotationPolicy`] and
//! opens the rotating writer that enforces it:
//! - size-based: a single active file capped by size, see [`SizeRotatingWriter`]
//! - date-based: one file per day plus a stable link, see [`DateRotatingWriter`]

mod date;
mod size;

pub use date::DateRotatingWriter;
pub use size::SizeRotatingWriter;

use crate::config::{LogConfig, RollingBy};
use crate::error::{RollogError, Result};
use chrono::format::{Item, StrftimeItems};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Date token inserted before the file extension for date rolling
pub const DATE_ROLLING_SUFFIX: &str = ".%Y%m%d";

/// Rotation interval of date rolling
pub const DATE_ROTATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Age limit applied by date rolling when the resolved limit is zero
pub const DEFAULT_MAX_AGE_DAYS: u32 = 7;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// How old date-rolled files are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Delete files older than this many days
    MaxAge { days: u32 },
    /// Keep at most this many files
    MaxCount { count: u32 },
}

impl Retention {
    /// Pick the retention rule for date rolling
    ///
    /// Retains by age when `max_backups > max_age_days`, by count otherwise
    /// (equal values keep by count).
    pub fn resolve(max_backups: u32, max_age_days: u32) -> Self {
        if max_backups > max_age_days {
            Retention::MaxAge { days: max_age_days }
        } else {
            Retention::MaxCount { count: max_backups }
        }
    }

    /// The rule actually enforced when pruning
    ///
    /// A zero limit never disables pruning: it falls back to
    /// [`DEFAULT_MAX_AGE_DAYS`] so date-rolled files cannot pile up forever.
    pub fn effective(self) -> Self {
        match self {
            Retention::MaxAge { days: 0 } | Retention::MaxCount { count: 0 } => {
                Retention::MaxAge {
                    days: DEFAULT_MAX_AGE_DAYS,
                }
            }
            other => other,
        }
    }
}

/// Inputs of policy resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationParams {
    pub filename: PathBuf,
    pub rolling_by: RollingBy,
    pub max_size_mb: u64,
    pub max_backups: u32,
    pub max_age_days: u32,
    pub compress: bool,
    pub local_time: bool,
}

impl From<&LogConfig> for RotationParams {
    fn from(config: &LogConfig) -> Self {
        Self {
            filename: config.filename.clone(),
            rolling_by: config.rolling_by,
            max_size_mb: config.max_size_mb,
            max_backups: config.max_backups,
            max_age_days: config.max_age_days,
            compress: config.compress,
            local_time: config.local_time,
        }
    }
}

/// Resolved rotation configuration of one logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationPolicy {
    BySize {
        filename: PathBuf,
        max_size_bytes: u64,
        max_backups: u32,
        max_age_days: u32,
        compress: bool,
        local_time: bool,
    },
    ByDate {
        file_path_template: String,
        link_path: PathBuf,
        rotation_interval: Duration,
        retention: Retention,
    },
}

impl RotationPolicy {
    /// Resolve the policy for the given parameters
    ///
    /// Fails when the date template derived from the filename cannot be
    /// formatted. No file is touched here.
    pub fn resolve(params: &RotationParams) -> Result<Self> {
        match params.rolling_by {
            RollingBy::Size => Ok(RotationPolicy::BySize {
                filename: params.filename.clone(),
                max_size_bytes: params.max_size_mb.saturating_mul(BYTES_PER_MB),
                max_backups: params.max_backups,
                max_age_days: params.max_age_days,
                compress: params.compress,
                local_time: params.local_time,
            }),
            RollingBy::Date => {
                let file_path_template = date_template(&params.filename);
                validate_template(&file_path_template)?;

                Ok(RotationPolicy::ByDate {
                    file_path_template,
                    link_path: params.filename.clone(),
                    rotation_interval: DATE_ROTATION_INTERVAL,
                    retention: Retention::resolve(params.max_backups, params.max_age_days),
                })
            }
        }
    }

    /// Which variant this policy is
    pub fn rolling_by(&self) -> RollingBy {
        match self {
            RotationPolicy::BySize { .. } => RollingBy::Size,
            RotationPolicy::ByDate { .. } => RollingBy::Date,
        }
    }

    /// Construct the rotating writer enforcing this policy
    ///
    /// The active file is opened eagerly so that an unusable path fails
    /// here rather than on the first record.
    pub fn open(&self) -> Result<Box<dyn Write + Send>> {
        match self {
            RotationPolicy::BySize {
                filename,
                max_size_bytes,
                max_backups,
                max_age_days,
                compress,
                local_time,
            } => {
                let writer = SizeRotatingWriter::new(
                    filename,
                    *max_size_bytes,
                    *max_backups,
                    *max_age_days,
                    *compress,
                    *local_time,
                )?;
                Ok(Box::new(writer))
            }
            RotationPolicy::ByDate {
                file_path_template,
                link_path,
                rotation_interval,
                retention,
            } => {
                let writer = DateRotatingWriter::new(
                    file_path_template,
                    link_path,
                    *rotation_interval,
                    *retention,
                )?;
                Ok(Box::new(writer))
            }
        }
    }
}

/// Insert the date token before the extension, or append it
///
/// The extension starts at the last `.` of the file name, leading dot
/// included: `logs/app.log` becomes `logs/app.%Y%m%d.log`, `logs/.app`
/// becomes `logs/.%Y%m%d.app` and `logs/app` becomes `logs/app.%Y%m%d`.
pub fn date_template(path: &Path) -> String {
    let full = path.to_string_lossy();
    let name_start = full
        .rfind(|c| c == '/' || c == std::path::MAIN_SEPARATOR)
        .map_or(0, |i| i + 1);

    match full[name_start..].rfind('.') {
        Some(dot) => {
            let (base, ext) = full.split_at(name_start + dot);
            format!("{}{}{}", base, DATE_ROLLING_SUFFIX, ext)
        }
        None => format!("{}{}", full, DATE_ROLLING_SUFFIX),
    }
}

fn validate_template(template: &str) -> Result<()> {
    if StrftimeItems::new(template).any(|item| matches!(item, Item::Error)) {
        return Err(RollogError::InvalidPathTemplate(template.to_string()));
    }
    Ok(())
}
