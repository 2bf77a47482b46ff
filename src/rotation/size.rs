use crate::error::{RollogError, Result};
use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Timestamp embedded in backup names
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

const COMPRESS_SUFFIX: &str = ".gz";

/// SizeRotatingWriter keeps a single active log file capped by size
///
/// When the next write would push the file past `max_size` it is renamed to
/// `<stem>-<timestamp><ext>` and a fresh file is opened. Backups beyond
/// `max_backups`, or older than `max_age_days`, are then removed and the
/// rest are gzipped when `compress` is set. A zero limit disables it.
pub struct SizeRotatingWriter {
    /// Path of the active log file
    filename: PathBuf,
    /// Maximum size in bytes before rotation
    max_size: u64,
    max_backups: u32,
    max_age_days: u32,
    compress: bool,
    /// Name backups in local time rather than UTC
    local_time: bool,
    file: File,
    /// Current size of the active file
    size: u64,
}

/// A rotated file found next to the active one
#[derive(Debug)]
struct Backup {
    path: PathBuf,
    timestamp: NaiveDateTime,
    compressed: bool,
}

impl SizeRotatingWriter {
    /// Open (or create) the active log file
    ///
    /// # Returns
    /// * `Ok(SizeRotatingWriter)` - The file is open for appending
    /// * `Err(RollogError)` - The directory or file could not be created
    pub fn new(
        filename: &Path,
        max_size: u64,
        max_backups: u32,
        max_age_days: u32,
        compress: bool,
        local_time: bool,
    ) -> Result<Self> {
        if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                RollogError::LogFileError(format!(
                    "Failed to create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = open_append(filename)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            filename: filename.to_path_buf(),
            max_size,
            max_backups,
            max_age_days,
            compress,
            local_time,
            file,
            size,
        })
    }

    /// Path of the active log file
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Current size of the active log file
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Maximum size before rotation
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Write `buf`, rotating first if it would not fit
    pub(crate) fn write_at(&mut self, buf: &[u8], now: DateTime<Utc>) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.max_size {
            return Err(RollogError::WriteTooLarge {
                len: buf.len(),
                max: self.max_size,
            }
            .into());
        }

        if self.size + len > self.max_size {
            self.rotate(now)?;
        }

        let n = self.file.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    /// Force a rotation regardless of the current size
    pub fn rotate_now(&mut self) -> Result<()> {
        self.rotate(Utc::now())
    }

    fn rotate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.file.flush()?;

        let backup = self.backup_name(now);
        fs::rename(&self.filename, &backup).map_err(|e| {
            RollogError::LogRotationError(format!(
                "Failed to rename {} to {}: {}",
                self.filename.display(),
                backup.display(),
                e
            ))
        })?;

        self.file = open_append(&self.filename)?;
        self.size = 0;

        // Retention failures never fail the write that triggered rotation
        if let Err(e) = self.mill(now) {
            eprintln!("rollog: failed to clean up log backups: {}", e);
        }

        Ok(())
    }

    fn backup_name(&self, now: DateTime<Utc>) -> PathBuf {
        let timestamp = if self.local_time {
            now.with_timezone(&Local).format(BACKUP_TIME_FORMAT).to_string()
        } else {
            now.format(BACKUP_TIME_FORMAT).to_string()
        };
        let (stem, ext) = self.name_parts();
        self.directory().join(format!("{}-{}{}", stem, timestamp, ext))
    }

    fn directory(&self) -> PathBuf {
        match self.filename.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// File stem and extension (with its dot) of the active file
    fn name_parts(&self) -> (String, String) {
        let stem = self
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .filename
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }

    /// Backups sorted newest first
    fn list_backups(&self) -> Result<Vec<Backup>> {
        let (stem, ext) = self.name_parts();
        let prefix = format!("{}-", stem);
        let compressed_ext = format!("{}{}", ext, COMPRESS_SUFFIX);

        let mut backups = Vec::new();
        for entry in fs::read_dir(self.directory())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };

            let (middle, compressed) = if let Some(m) = rest.strip_suffix(&compressed_ext) {
                (m, true)
            } else if let Some(m) = rest.strip_suffix(&ext) {
                (m, false)
            } else {
                continue;
            };

            if let Ok(timestamp) = NaiveDateTime::parse_from_str(middle, BACKUP_TIME_FORMAT) {
                backups.push(Backup {
                    path: entry.path(),
                    timestamp,
                    compressed,
                });
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Apply count, age and compression rules to existing backups
    fn mill(&self, now: DateTime<Utc>) -> Result<()> {
        let mut backups = self.list_backups()?;
        let mut remove = Vec::new();

        if self.max_backups > 0 {
            // A backup and its compressed copy count once
            let mut kept: HashSet<NaiveDateTime> = HashSet::new();
            let (keep, drop): (Vec<_>, Vec<_>) = backups.into_iter().partition(|b| {
                if kept.contains(&b.timestamp) {
                    return true;
                }
                if kept.len() < self.max_backups as usize {
                    kept.insert(b.timestamp);
                    return true;
                }
                false
            });
            backups = keep;
            remove.extend(drop);
        }

        if self.max_age_days > 0 {
            let reference = if self.local_time {
                now.with_timezone(&Local).naive_local()
            } else {
                now.naive_utc()
            };
            let cutoff = reference - Duration::days(i64::from(self.max_age_days));
            let (keep, drop): (Vec<_>, Vec<_>) =
                backups.into_iter().partition(|b| b.timestamp >= cutoff);
            backups = keep;
            remove.extend(drop);
        }

        for backup in &remove {
            fs::remove_file(&backup.path)?;
        }

        if self.compress {
            for backup in backups.iter().filter(|b| !b.compressed) {
                compress_file(&backup.path)?;
            }
        }

        Ok(())
    }
}

impl Write for SizeRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(buf, Utc::now())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            RollogError::LogFileError(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// Gzip `path` into `path.gz` and remove the original
fn compress_file(path: &Path) -> Result<()> {
    let mut target = path.as_os_str().to_owned();
    target.push(COMPRESS_SUFFIX);

    let mut source = File::open(path)?;
    let mut encoder = GzEncoder::new(File::create(PathBuf::from(target))?, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)?;
    Ok(())
}
