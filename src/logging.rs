use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const LOG_FILE_PREFIX: &str = "fundamental-screener.log";
/// Used when RUST_LOG is unset: our own spans at debug, dependencies at info
pub const DEFAULT_FILTER: &str = "info,fundamental_screener=debug";

/// Log directory, overridable with SCREENER_LOG_DIR
pub fn log_dir() -> String {
    std::env::var("SCREENER_LOG_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string())
}

/// Console output plus a daily-rotated JSON file under `log_dir()`.
/// Fails if a global subscriber is already installed.
pub fn init_logging() -> Result<()> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    let json_file = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(json_file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
