//! Logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
/// Calling this twice is harmless: the second install is ignored.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}
