//! Tracing initialization.
//!
//! Structured logging via tracing-subscriber with an env filter. Call once
//! at process startup; the library itself only emits events.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::error::{Error, Result};

/// Initialize the fmt subscriber. `RUST_LOG` overrides the default level.
pub fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Config(format!("failed to init tracing subscriber: {e}")))?;

    Ok(())
}
