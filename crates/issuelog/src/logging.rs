//! Diagnostic channel setup.
//!
//! Store appends are echoed here at `error` level under the store prefix, and
//! swallowed persistence failures show up as warnings. Nothing written here
//! feeds back into the stores.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much of the diagnostic channel reaches stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Entry echoes and other errors only.
    Quiet,
    /// Adds persistence warnings and lifecycle messages.
    #[default]
    Normal,
    /// Adds slot loads and schema upgrades.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Most detailed level let through.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Directive used when `RUST_LOG` is unset.
#[must_use]
pub fn default_directive(verbosity: Verbosity) -> String {
    format!("issuelog={}", verbosity.level())
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins over `verbosity` when set. Stdout is left to summaries and
/// JSON exports. Repeated calls are no-ops.
///
/// # Examples
///
/// ```no_run
/// use issuelog::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
}

/// Test subscriber: warnings and errors through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
