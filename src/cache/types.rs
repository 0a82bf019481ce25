//! Registered request types.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigTrait};
use crate::model::{Fetcher, RegisterOptions};

/// Pacing for refreshing types that cannot long-poll and set no timer.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A fetcher together with its resolved options.
pub(crate) struct RegisteredType {
    pub name: String,
    pub fetcher: Arc<dyn Fetcher>,
    pub opts: RegisterOptions,
    /// Long-poll bound for refresh fetches and the default `get` wait.
    pub query_timeout: Duration,
    /// Idle time before eviction.
    pub ttl: Duration,
}

impl RegisteredType {
    pub fn new(name: String, fetcher: Arc<dyn Fetcher>, cfg: &Config) -> Self {
        let mut opts = fetcher.options();
        if opts.refresh && !opts.supports_blocking && opts.refresh_timer.is_zero() {
            opts.refresh_timer = MIN_POLL_INTERVAL;
        }
        let query_timeout = opts
            .query_timeout
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| cfg.query_timeout());
        let ttl = opts
            .last_get_ttl
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| cfg.entry_ttl());
        Self {
            name,
            fetcher,
            opts,
            query_timeout,
            ttl,
        }
    }
}
