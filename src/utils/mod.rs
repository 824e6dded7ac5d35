//! Small shared utilities.

/// Initializes the tracing subscriber for logging.
///
/// Sets up an environment-filtered formatting subscriber. Typically called
/// once at the start of a binary or test harness.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
