//! Tracing subscriber setup for the console process.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global fmt subscriber.
///
/// `filter` wins over `RUST_LOG`; with neither set everything at `info` and
/// above is printed. Installing twice is harmless, the second call is ignored.
pub(crate) fn init(filter: Option<&str>) {
    let env_filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_filter(env_filter),
        )
        .try_init();
}
