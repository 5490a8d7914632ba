use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Logs go to stderr so `--json` reports on stdout stay machine-readable.
/// Calling this again once a subscriber is installed does nothing.
pub fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    // Fails only when a global subscriber already exists
    let _ = Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
