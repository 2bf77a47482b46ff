use thiserror::Error;

/// Main error type for the rollog logging facility
#[derive(Debug, Error)]
pub enum RollogError {
    // Level-related errors
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Log file and rotation errors
    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    #[error("Log rotation failed: {0}")]
    LogRotationError(String),

    #[error("Invalid file path template: {0}")]
    InvalidPathTemplate(String),

    #[error("Write length {len} exceeds maximum file size {max}")]
    WriteTooLarge { len: usize, max: u64 },

    // Encoding errors
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    // Termination requested by a panic or fatal entry point
    #[error("Aborted: {0}")]
    Aborted(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for rollog operations
pub type Result<T> = std::result::Result<T, RollogError>;

impl From<RollogError> for std::io::Error {
    fn from(err: RollogError) -> Self {
        match err {
            RollogError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}
