//! Structured logging setup.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Pick the filter from `RUST_LOG`, falling back to the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for all diagnostics
//! - Safe to call more than once (later calls are ignored), which keeps tests
//!   that each build a server from fighting over the global subscriber

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize logging for the process.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chainserve={}", config.log_level)));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}
