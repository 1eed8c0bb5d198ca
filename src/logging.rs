// src/logging.rs
//
// Tracing subscriber setup. RUST_LOG, when set, overrides the --log-level
// flag so field debugging never needs a restart with different flags.

use tracing_subscriber::EnvFilter;

pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
