//! Logging bootstrap for the CLI.
//!
//! Logs go to stderr so command output on stdout stays clean. The filter is
//! the explicit level when given, otherwise `RUST_LOG`, otherwise
//! [`DEFAULT_LOG_LEVEL`].

use anyhow::{bail, Result};

use crate::config::DEFAULT_LOG_LEVEL;

/// Initializes `env_logger`. Calling it again is a no-op.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL),
    );
    if let Some(level) = level {
        builder.parse_filters(normalize_level(level)?);
    }
    builder.format_timestamp_secs();

    // Already initialized (e.g. under a test harness)
    let _ = builder.try_init();
    Ok(())
}

pub fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => bail!("Unsupported log level `{other}`; expected trace|debug|info|warn|error|off"),
    }
}
