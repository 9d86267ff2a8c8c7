//! Subscriber setup for the binary
//!
//! Log lines always go to stderr so rendered output on stdout stays clean.

use formwork_config::{LogFormat, LoggingConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Filter directive from CLI flags, falling back to the config value
///
/// `--verbose` wins over `--log-level`, which wins over `logging.level`.
pub fn filter_directive(
    verbose: bool,
    log_level: Option<LogLevel>,
    config: &LoggingConfig,
) -> String {
    if verbose {
        return LevelFilter::DEBUG.to_string().to_lowercase();
    }
    match log_level {
        Some(level) => LevelFilter::from(level).to_string().to_lowercase(),
        None => config.level.clone(),
    }
}

/// Install the global subscriber
///
/// An invalid directive falls back to `warn` instead of aborting.
pub fn init(verbose: bool, log_level: Option<LogLevel>, config: &LoggingConfig) {
    let directive = filter_directive(verbose, log_level, config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{}': {}, using 'warn'", directive, e);
        EnvFilter::new("warn")
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Ignore the error when a subscriber is already installed (tests)
    let _ = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
