//! `env_logger` setup for the updater binary
//!
//! Library crates log through `tracing`; its `log` feature forwards events to
//! the `log` facade, which this logger prints.

use log::{LevelFilter, info, warn};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Process-wide logging bootstrap
pub struct LoggingTransformer;

impl LoggingTransformer {
    /// Initialize logging once at startup
    ///
    /// `level` is the baseline; `RUST_LOG` directives are applied on top, e.g.
    /// `RUST_LOG=unicert_unifi=debug`.
    pub fn init(level: LevelFilter) {
        INIT_LOGGER.call_once(|| {
            let result = env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .format_timestamp_micros()
                .try_init();

            match result {
                Ok(()) => info!("Logging initialized at {level}"),
                Err(e) => warn!("Logger already installed: {e}"),
            }
        });
    }

    /// Initialize logging for tests; safe to call repeatedly
    pub fn init_test() {
        let _ = env_logger::Builder::from_default_env()
            .is_test(true)
            .try_init();
    }

    /// Map a `LOG_LEVEL` value to a filter; unknown values mean `info`
    #[must_use]
    pub fn parse_level(value: &str) -> LevelFilter {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        }
    }
}
