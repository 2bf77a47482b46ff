use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rollog::{LogConfig, RollingBy, RollogLayer, TimeFormat};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// rollog - leveled logging into rotating files
#[derive(Parser)]
#[command(name = "rollog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Load settings from a TOML or JSON file (overrides the flags below)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base path of the log file
    #[arg(short, long, default_value = "rollog.log")]
    file: PathBuf,

    /// Minimum severity (debug, info, warn, error, dpanic, panic, fatal)
    #[arg(short, long, default_value = "info")]
    level: String,

    /// Rotation strategy
    #[arg(short, long, value_enum, default_value = "size")]
    rolling: Rolling,

    /// Size cap of the active file in megabytes
    #[arg(long, default_value = "100")]
    max_size_mb: u64,

    /// Number of rotated files to keep
    #[arg(long, default_value = "7")]
    max_backups: u32,

    /// Number of days to keep rotated files
    #[arg(long, default_value = "7")]
    max_age_days: u32,

    /// Echo records to stdout
    #[arg(long)]
    console: bool,

    /// Custom strftime timestamp layout
    #[arg(long)]
    time_format: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Rolling {
    Size,
    Date,
}

impl From<Rolling> for RollingBy {
    fn from(rolling: Rolling) -> Self {
        match rolling {
            Rolling::Size => RollingBy::Size,
            Rolling::Date => RollingBy::Date,
        }
    }
}

impl Cli {
    fn log_config(&self) -> Result<LogConfig> {
        if let Some(ref path) = self.config {
            return LogConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()));
        }

        let mut config = LogConfig::new(
            self.file.clone(),
            self.level.clone(),
            self.max_size_mb,
            self.max_backups,
            self.max_age_days,
            self.rolling.into(),
        )
        .with_console(self.console);

        if let Some(ref layout) = self.time_format {
            config = config.with_time_format(TimeFormat::Custom(layout.clone()));
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.log_config()?;

    rollog::try_init(&config).context("initializing logger")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")))
        .with(RollogLayer::global())
        .init();

    rollog::debug(&[&"debug line from", &"rollog"]);
    rollog::info(&[&"logging to", &config.filename.display()]);
    rollog::warnf!("rolling by {:?}, keeping {} backups", config.rolling_by, config.max_backups);
    rollog::errorf!("sample error with stack trace");
    rollog::dpanic(&[&"dpanic logs and returns"]);
    rollog::logger()
        .record(rollog::Severity::Info, "structured")
        .field("pid", std::process::id())
        .field("console", config.console)
        .emit();
    tracing::info!(source = "tracing", "bridged event");

    rollog::sync().context("flushing sinks")?;
    Ok(())
}
