//! Opt-in `tracing` setup for hosts embedding `chart-scope`.
//!
//! Lifecycle events (ignored attach targets, stale purges, post-teardown
//! no-ops) are emitted under the `chart_scope` target.

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_TRACING_FILTER: &str = "chart_scope=info";

/// Installs a compact global subscriber. Needs the `telemetry` feature.
///
/// Returns `false` when the feature is off or the host already installed one.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACING_FILTER));
        return tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
