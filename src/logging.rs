//! Diagnostics via `tracing` and the line-oriented run log.
//!
//! The run log is what an operator reads while a batch is going: one line per
//! event. Where the lines end up is up to the [`LogSink`] the runner is given.

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    // Run log lines stay visible when no progress bar is drawn.
    let default_level = if verbose {
        "debug"
    } else {
        "warn,wavebatch::run=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed (tests); keep it.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Accepts one human-readable line at a time.
pub trait LogSink {
    fn line(&self, line: &str);
}

/// Forwards run log lines to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, line: &str) {
        tracing::info!(target: "wavebatch::run", "{line}");
    }
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn line(&self, line: &str) {
        (**self).line(line);
    }
}
