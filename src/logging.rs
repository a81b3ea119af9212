//! Logging initialization for the CLI.
//!
//! Logs go to stderr so stdout stays reserved for command output.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gomajor::config::{DEFAULT_LOG_FILTER, LOG_ENV};

/// Initialize the tracing subscriber.
///
/// `GOMAJOR_LOG` takes precedence. Otherwise `verbosity` selects the level:
/// 0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE.
pub fn init(verbosity: u8, json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => DEFAULT_LOG_FILTER,
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
