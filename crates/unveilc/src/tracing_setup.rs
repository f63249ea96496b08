//! Tracing initialization.
//!
//! Controlled by `UNVEIL_LOG` (`RUST_LOG` syntax), falling back to
//! `RUST_LOG`, defaulting to `warn`.

use std::sync::OnceLock;

use tracing_subscriber::{prelude::*, EnvFilter, Registry};

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber. Safe to call multiple times.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env("UNVEIL_LOG")
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        Registry::default()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .with(filter)
            .init();
    });
}
