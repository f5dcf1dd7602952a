//! Structured logging setup for apkforge
//!
//! Logs go to stderr through `tracing-subscriber`; stdout is reserved for
//! reports. Configuration comes from:
//!
//! - `APKFORGE_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! - `APKFORGE_LOG_JSON` - `true` for JSON lines
//! - `RUST_LOG` - standard filtering, added on top of the above
//!
//! `--log-level`, `-v` and `-q` on the command line override the
//! environment.
//!
//! # Example
//!
//! ```no_run
//! use apkforge::util::{init_logging, LoggingConfig};
//! use tracing::info;
//!
//! init_logging(LoggingConfig::default());
//! info!(step = "reinstall", "Starting step");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub const LOG_LEVEL_ENV: &str = "APKFORGE_LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "APKFORGE_LOG_JSON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,

    /// JSON lines instead of the human console format
    pub use_json: bool,

    /// Include the module target (e.g. apkforge::gradle::fixer)
    pub include_target: bool,

    /// Include file and line number
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Resolves the level from command-line flags first, then the project
    /// configuration, then `APKFORGE_LOG_LEVEL`. An explicit `--log-level`
    /// beats `-v`/`-q`.
    pub fn from_cli(
        log_level: Option<&str>,
        verbose: bool,
        quiet: bool,
        configured: Option<&str>,
    ) -> Self {
        let level = if let Some(level_str) = log_level {
            parse_level(level_str)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else if let Some(level_str) = configured {
            parse_level(level_str)
        } else {
            level_from_env()
        };

        Self {
            level,
            use_json: json_from_env(),
            include_location: level == Level::TRACE,
            ..Default::default()
        }
    }
}

/// Case-insensitive; anything unknown falls back to INFO with a warning on
/// stderr.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn level_from_env() -> Level {
    let level_str = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
    parse_level(&level_str)
}

fn json_from_env() -> bool {
    env::var(LOG_JSON_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(false)
}

fn build_filter(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("apkforge={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}
