use super::Retention;
use crate::error::{RollogError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// DateRotatingWriter writes into one file per rotation period
///
/// The file name is `file_path_template` formatted with the start of the
/// current period (local time). Every time the period changes the link path
/// is re-pointed at the new file and old files are pruned by `retention`.
pub struct DateRotatingWriter {
    /// strftime template of the per-period file
    template: String,
    /// Stable alias of the current file
    link_path: PathBuf,
    interval: Duration,
    retention: Retention,
    /// Path of the file currently written to
    current_path: PathBuf,
    file: File,
}

impl DateRotatingWriter {
    /// Open the file of the current period and point the link at it
    ///
    /// # Returns
    /// * `Ok(DateRotatingWriter)` - The current file is open for appending
    /// * `Err(RollogError)` - Invalid template, or the file could not be created
    pub fn new(
        template: &str,
        link_path: &Path,
        interval: Duration,
        retention: Retention,
    ) -> Result<Self> {
        if StrftimeItems::new(template).any(|item| matches!(item, Item::Error)) {
            return Err(RollogError::InvalidPathTemplate(template.to_string()));
        }
        if interval.as_secs() == 0 {
            return Err(RollogError::ConfigValidationError(
                "rotation interval must be at least one second".to_string(),
            ));
        }

        let current_path = filename_for(template, interval, Local::now().naive_local())?;
        let file = open_append(&current_path)?;

        let writer = Self {
            template: template.to_string(),
            link_path: link_path.to_path_buf(),
            interval,
            retention,
            current_path,
            file,
        };
        writer.after_switch();

        Ok(writer)
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Stable alias of the current file
    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub(crate) fn write_at(&mut self, buf: &[u8], now: NaiveDateTime) -> io::Result<usize> {
        let path = filename_for(&self.template, self.interval, now)?;
        if path != self.current_path {
            self.file.flush()?;
            self.file = open_append(&path)?;
            self.current_path = path;
            self.after_switch();
        }

        self.file.write(buf)
    }

    /// Re-link and prune; failures are reported, never propagated
    fn after_switch(&self) {
        if let Err(e) = update_link(&self.current_path, &self.link_path) {
            eprintln!(
                "rollog: failed to link {} to {}: {}",
                self.link_path.display(),
                self.current_path.display(),
                e
            );
        }
        if let Err(e) = self.purge() {
            eprintln!("rollog: failed to prune old log files: {}", e);
        }
    }

    /// Delete files matching the template according to the retention rule
    ///
    /// A zero limit prunes by the default age instead, see
    /// [`Retention::effective`]. Returns the number of files removed.
    pub fn purge(&self) -> Result<usize> {
        let directory = parent_dir(Path::new(&self.template));
        let file_template = Path::new(&self.template)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut matches: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in fs::read_dir(&directory)? {
            let entry = entry?;
            // The link itself never counts
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !matches_template(&file_template, &name) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            matches.push((entry.path(), modified));
        }

        let doomed: Vec<PathBuf> = match self.retention.effective() {
            Retention::MaxAge { days } => {
                let max_age = Duration::from_secs(u64::from(days) * 24 * 60 * 60);
                let cutoff = SystemTime::now()
                    .checked_sub(max_age)
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                matches
                    .into_iter()
                    .filter(|(_, modified)| *modified < cutoff)
                    .map(|(path, _)| path)
                    .collect()
            }
            Retention::MaxCount { count } => {
                let count = count as usize;
                if matches.len() <= count {
                    Vec::new()
                } else {
                    matches.sort_by_key(|(_, modified)| *modified);
                    let excess = matches.len() - count;
                    matches
                        .into_iter()
                        .take(excess)
                        .map(|(path, _)| path)
                        .collect()
                }
            }
        };

        for path in &doomed {
            if *path == self.current_path {
                continue;
            }
            fs::remove_file(path)?;
        }

        Ok(doomed.iter().filter(|p| **p != self.current_path).count())
    }
}

impl Write for DateRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_at(buf, Local::now().naive_local())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// File name for the rotation period containing `now`
///
/// Periods start at local midnight and repeat every `interval`.
pub fn filename_for(template: &str, interval: Duration, now: NaiveDateTime) -> Result<PathBuf> {
    let midnight = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
    let interval_secs = interval.as_secs().max(1) as i64;
    let elapsed = (now - midnight).num_seconds();
    let period_start = midnight + ChronoDuration::seconds(elapsed / interval_secs * interval_secs);

    let mut name = String::new();
    write!(name, "{}", period_start.format(template))
        .map_err(|_| RollogError::InvalidPathTemplate(template.to_string()))?;
    Ok(PathBuf::from(name))
}

/// Whether `name` is `template` with every strftime directive replaced by digits
///
/// Only the span between the first and last directive is treated as a
/// wildcard, which covers templates produced by `date_template`.
fn matches_template(template: &str, name: &str) -> bool {
    let Some(first) = template.find('%') else {
        return template == name;
    };
    let last = template.rfind('%').unwrap_or(first);
    let prefix = &template[..first];
    // A directive is `%` plus one character
    let suffix = template.get(last + 2..).unwrap_or("");

    match name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
    {
        Some(middle) => !middle.is_empty() && middle.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn open_append(path: &Path) -> Result<File> {
    let directory = parent_dir(path);
    fs::create_dir_all(&directory).map_err(|e| {
        RollogError::LogFileError(format!(
            "Failed to create log directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            RollogError::LogFileError(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// Atomically point `link` at `target`
#[cfg(unix)]
fn update_link(target: &Path, link: &Path) -> io::Result<()> {
    // Relative target when both live in the same directory
    let link_target = if parent_dir(target) == parent_dir(link) {
        target
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| target.to_path_buf())
    } else {
        target.to_path_buf()
    };

    let mut tmp = link.as_os_str().to_owned();
    tmp.push("_symlink");
    let tmp = PathBuf::from(tmp);

    if fs::symlink_metadata(&tmp).is_ok() {
        fs::remove_file(&tmp)?;
    }
    std::os::unix::fs::symlink(&link_target, &tmp)?;
    fs::rename(&tmp, link)
}

#[cfg(not(unix))]
fn update_link(_target: &Path, _link: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn day(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_filename_for_day() {
        let path = filename_for("logs/app.%Y%m%d.log", DAY, day(2024, 3, 7, 23)).unwrap();
        assert_eq!(path, PathBuf::from("logs/app.20240307.log"));
    }

    #[test]
    fn test_filename_for_hourly_interval() {
        let hourly = Duration::from_secs(3600);
        let path = filename_for("app.%Y%m%d%H.log", hourly, day(2024, 3, 7, 5)).unwrap();
        assert_eq!(path, PathBuf::from("app.2024030705.log"));
    }

    #[test]
    fn test_matches_template() {
        assert!(matches_template("app.%Y%m%d.log", "app.20240101.log"));
        assert!(matches_template("app.%Y%m%d", "app.20240101"));
        assert!(matches_template(".%Y%m%d.app", ".20240101.app"));
        assert!(!matches_template("app.%Y%m%d.log", "app.log"));
        assert!(!matches_template("app.%Y%m%d.log", "app.2024x101.log"));
        assert!(!matches_template("app.%Y%m%d.log", "other.20240101.log"));
    }

    #[test]
    fn test_switches_file_when_day_changes() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("app.log");
        let template = super::super::date_template(&link);

        let mut writer =
            DateRotatingWriter::new(&template, &link, DAY, Retention::MaxCount { count: 0 })
                .unwrap();

        writer.write_at(b"monday\n", day(2024, 3, 4, 10)).unwrap();
        writer.write_at(b"tuesday\n", day(2024, 3, 5, 1)).unwrap();
        writer.flush().unwrap();

        let monday = temp_dir.path().join("app.20240304.log");
        let tuesday = temp_dir.path().join("app.20240305.log");
        assert_eq!(fs::read_to_string(&monday).unwrap(), "monday\n");
        assert_eq!(fs::read_to_string(&tuesday).unwrap(), "tuesday\n");
        assert_eq!(writer.current_path(), tuesday.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_link_points_at_current_file() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("app.log");
        let template = super::super::date_template(&link);

        let mut writer =
            DateRotatingWriter::new(&template, &link, DAY, Retention::MaxCount { count: 0 })
                .unwrap();
        writer.write_at(b"hello\n", day(2024, 3, 4, 10)).unwrap();
        writer.flush().unwrap();

        let target = fs::read_link(&link).unwrap();
        assert_eq!(target, PathBuf::from("app.20240304.log"));
        assert_eq!(fs::read_to_string(&link).unwrap(), "hello\n");
    }

    #[test]
    fn test_count_retention_keeps_newest() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("app.log");
        let template = super::super::date_template(&link);

        let mut writer =
            DateRotatingWriter::new(&template, &link, DAY, Retention::MaxCount { count: 2 })
                .unwrap();
        for d in 1..=4 {
            writer.write_at(b"x\n", day(2024, 3, d, 12)).unwrap();
            // Distinct modification times
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        let remaining: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| matches_template("app.%Y%m%d.log", n))
            .collect();
        assert_eq!(remaining.len(), 2);
        assert!(temp_dir.path().join("app.20240304.log").exists());
    }

    #[test]
    fn test_invalid_template_fails() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("app.log");
        let result = DateRotatingWriter::new(
            "app.%Q.log",
            &link,
            DAY,
            Retention::MaxCount { count: 1 },
        );
        assert!(matches!(result, Err(RollogError::InvalidPathTemplate(_))));
    }
}
