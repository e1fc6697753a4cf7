#![forbid(unsafe_code)]

//! JSON log output for jsync's `tracing` events.

/// Install a global JSON subscriber filtered by `RUST_LOG`, defaulting to
/// `info,jsync=debug`. Fails if a global subscriber is already set.
pub fn init_json() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jsync=debug".into()),
        )
        .try_init()
}
