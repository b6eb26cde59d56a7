//! Logging setup using `tracing` + `tracing-subscriber`
//!
//! The level comes from the `CMDX_LOG` environment variable ("error", "warn",
//! "info", "debug" or "trace") and defaults to `warn`, so regular runs only
//! show the script output. Logs go to stderr.

use tracing::Level;
use tracing_subscriber::fmt;

/// Environment variable selecting the log level
pub const LOG_ENV: &str = "CMDX_LOG";

/// Initialise the global logging subscriber
///
/// Only the first call installs a subscriber.
pub fn init_logging() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| parse_level_str(&s))
        .unwrap_or(Level::WARN);

    let _ = fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
