//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigTrait};

/// Installs the global tracing subscriber.
///
/// JSON output in prod, pretty output otherwise. `RUST_LOG` overrides the
/// configured level. Returns an error when a subscriber is already installed.
pub fn configure_logger(cfg: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level()));

    if cfg.is_prod() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init()?;
    }
    Ok(())
}
