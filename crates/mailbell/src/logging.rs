//! Logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless; the
/// second call is ignored.
pub fn init_logging(default_filter: &str) {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if let Err(e) = result {
        tracing::debug!("Logging already initialized: {e}");
    }
}
