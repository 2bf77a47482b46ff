use crate::error::{RollogError, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that lowers the lazy default threshold to DEBUG
pub const DEBUG_ENV_VAR: &str = "ROLLOG_DEBUG";

/// How the log file is split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollingBy {
    /// Rotate when the active file exceeds its size cap
    #[serde(alias = "by_size")]
    Size,
    /// Rotate once per day into date-suffixed files
    #[serde(alias = "by_date")]
    Date,
}

impl RollingBy {
    pub const BY_SIZE: RollingBy = RollingBy::Size;
    pub const BY_DATE: RollingBy = RollingBy::Date;
}

impl Default for RollingBy {
    fn default() -> Self {
        RollingBy::Size
    }
}

/// Timestamp layout used by both encoders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// RFC3339 with second precision and the local offset
    Rfc3339,
    /// Any chrono strftime layout, e.g. `%Y-%m-%d %H:%M:%S%.3f`
    Custom(String),
}

impl Default for TimeFormat {
    fn default() -> Self {
        TimeFormat::Rfc3339
    }
}

impl TimeFormat {
    /// Check that a custom layout only contains valid strftime items
    pub fn validate(&self) -> Result<()> {
        if let TimeFormat::Custom(layout) = self {
            if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
                return Err(RollogError::InvalidTimeFormat(layout.clone()));
            }
        }
        Ok(())
    }
}

/// Logger configuration, the serialized form of `init`'s parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base path of the log file
    pub filename: PathBuf,

    /// Minimum severity name (case-insensitive, empty means INFO)
    #[serde(default)]
    pub level: String,

    /// Size cap of the active file in megabytes (size rolling only)
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    /// Number of rotated files to keep
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,

    /// Number of days to keep rotated files
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Rotation strategy
    #[serde(default)]
    pub rolling_by: RollingBy,

    /// Also print every record to stdout
    #[serde(default)]
    pub console: bool,

    /// Timestamp layout
    #[serde(default)]
    pub time_format: TimeFormat,

    /// Gzip rotated backups (size rolling only)
    #[serde(default = "default_true")]
    pub compress: bool,

    /// Name backups after local time instead of UTC (size rolling only)
    #[serde(default = "default_true")]
    pub local_time: bool,
}

// Default value functions for serde
fn default_max_size_mb() -> u64 {
    100
}

fn default_max_backups() -> u32 {
    7
}

fn default_max_age_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

impl LogConfig {
    /// Create a configuration with the positional parameters of `Init`
    pub fn new(
        filename: impl Into<PathBuf>,
        level: impl Into<String>,
        max_size_mb: u64,
        max_backups: u32,
        max_age_days: u32,
        rolling_by: RollingBy,
    ) -> Self {
        Self {
            filename: filename.into(),
            level: level.into(),
            max_size_mb,
            max_backups,
            max_age_days,
            rolling_by,
            console: false,
            time_format: TimeFormat::default(),
            compress: true,
            local_time: true,
        }
    }

    /// Echo records to stdout as well
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Use a custom timestamp layout
    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    /// Load a configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<LogConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RollogError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(RollogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.filename = expand_env_in_path(&config.filename);
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML configuration, either flat or under a `[log]` table
    fn parse_toml(contents: &str) -> Result<LogConfig> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ConfigFile {
            Nested { log: LogConfig },
            Flat(LogConfig),
        }

        let config_file: ConfigFile = toml::from_str(contents)
            .map_err(|e| RollogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;

        Ok(match config_file {
            ConfigFile::Nested { log } => log,
            ConfigFile::Flat(config) => config,
        })
    }

    /// Parse a JSON configuration
    fn parse_json(contents: &str) -> Result<LogConfig> {
        serde_json::from_str(contents)
            .map_err(|e| RollogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.filename.as_os_str().is_empty() {
            return Err(RollogError::MissingConfigField("filename".to_string()));
        }

        if self.rolling_by == RollingBy::Size && self.max_size_mb == 0 {
            return Err(RollogError::ConfigValidationError(
                "max_size_mb must be at least 1 for size rolling".to_string(),
            ));
        }

        self.time_format.validate()
    }
}

/// Whether the debug toggle is set in the environment
pub fn debug_env_enabled() -> bool {
    debug_toggle(std::env::var(DEBUG_ENV_VAR).ok().as_deref())
}

fn debug_toggle(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "off" | "no"
        ),
    }
}

/// Expand `$VAR` and `${VAR}` in a string
///
/// A bare `$VAR` name is the longest run of ASCII letters, digits and
/// underscores. References to unset variables are kept verbatim.
fn expand_env_in_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(dollar) = rest.find('$') {
        result.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let (name, token_len) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .char_indices()
                .find(|&(i, c)| !is_name_char(i, c))
                .map_or(after.len(), |(i, _)| i);
            (&after[..end], end)
        };

        let token = &rest[dollar..dollar + 1 + token_len];
        match std::env::var(name) {
            Ok(value) if !name.is_empty() => result.push_str(&value),
            _ => result.push_str(token),
        }
        rest = &rest[dollar + 1 + token_len..];
    }

    result.push_str(rest);
    result
}

fn is_name_char(position: usize, c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (position > 0 && c.is_ascii_digit())
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_in_string(&path.to_string_lossy()))
}
