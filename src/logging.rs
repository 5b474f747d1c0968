//! Logging utilities
//!
//! The pool reports node state transitions through `tracing`; this module
//! installs a `tracing-subscriber` for applications that don't bring their
//! own.

use crate::config::PoolSettings;
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `log_level`. With `json` set, events are
/// written as JSON lines, otherwise in the plain `fmt` format.
pub fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("Invalid log level: {}", log_level))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .try_init()
        .context("A global tracing subscriber is already installed")
}

/// Initialize tracing from loaded settings
pub fn init_from_settings(settings: &PoolSettings) -> Result<()> {
    init_tracing(&settings.log_level, settings.log_json)
}
