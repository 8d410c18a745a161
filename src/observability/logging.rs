//! Structured logging.
//!
//! The wrapper writes to two named channels, expressed as tracing targets:
//! [`STATS_TARGET`] for timing/outcome records and [`EXCEPTIONS_TARGET`] for
//! full error traces. Filtering them works like any other target, e.g.
//! `RUST_LOG=stats=debug,exceptions=info`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Target of the stats channel.
pub const STATS_TARGET: &str = "stats";

/// Target of the exceptions channel.
pub const EXCEPTIONS_TARGET: &str = "exceptions";

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
