//! Logging setup for the nestling binaries.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with a compact format at INFO level.
///
/// `RUST_LOG` overrides the default level when set.
pub fn init() {
    init_with_level("info")
}

/// Initialize tracing with the given default level, `RUST_LOG` permitting
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .init();
}
