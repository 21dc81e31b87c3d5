//! Log subscriber setup using tracing.
//!
//! Logs go to stderr so stdout carries only command output. `RUST_LOG`
//! overrides the filter chosen from the command-line flags.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used without `--verbose`.
pub const DEFAULT_FILTER: &str = "info";

/// Filter used with `--verbose`.
pub const VERBOSE_FILTER: &str = "info,flagsync_client=debug,flagsync_migrate=debug";

/// Pick the filter directive for the given verbosity.
#[must_use]
pub fn filter_for(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Initialize the tracing subscriber.
///
/// With `json` every event is written as one flattened JSON object, suitable
/// for log aggregation; otherwise the human-readable format is used.
pub fn init_logging(verbose: bool, json: bool) {
    let filter = filter_for(verbose);
    let filter_layer =
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(filter)) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("FATAL: Failed to create log filter: {e}");
                std::process::exit(1);
            }
        };

    let registry = tracing_subscriber::registry().with(filter_layer);

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(filter = %filter, json = json, "Logging initialized");
    }
}

/// Initialize logging for tests (with simpler output).
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}
