//! Tracing initialization.
//!
//! Thin wrapper over `tracing-subscriber`: level comes from the settings
//! file unless `RUST_LOG` overrides it.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Call once per process, typically right after loading [`crate::Settings`].
/// Returns an error if a subscriber is already installed or the filter
/// directive fails to parse.
pub fn init(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}
