//! Fetcher capability contract.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Request, Value};

/// Options handed to a fetcher for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Block until the source index moves past this value.
    pub min_index: u64,
    /// Long-poll bound the source should honour.
    pub max_wait: Duration,
    pub allow_stale: bool,
    /// Set when the cache holds a value it can keep on a not-modified reply.
    pub allow_not_modified: bool,
}

/// FetchResult is what a fetcher reports back.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// New payload. Ignored when `not_modified` is set.
    pub value: Option<Value>,
    pub index: u64,
    /// The data is unchanged since `min_index`; the cached value stays as is.
    pub not_modified: bool,
}

impl FetchResult {
    /// A reply carrying a fresh payload.
    pub fn new(value: Value, index: u64) -> Self {
        Self { value: Some(value), index, not_modified: false }
    }

    /// A reply confirming that the cached payload is still current at `index`.
    pub fn not_modified(index: u64) -> Self {
        Self { value: None, index, not_modified: true }
    }
}

/// Metadata returned with every answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMeta {
    pub index: u64,
    /// The answer came straight from the cache without waiting.
    pub hit: bool,
    pub age: Duration,
    pub last_fetched: Option<Instant>,
}

/// Per-type behaviour, supplied by the fetcher at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Keep entries warm with a background refresh loop.
    pub refresh: bool,
    /// Pause between two successful refreshes.
    pub refresh_timer: Duration,
    /// Long-poll wait for refresh fetches and the default `get` wait.
    /// `None` uses the configured default.
    pub query_timeout: Option<Duration>,
    /// Idle time after which an entry is evicted. `None` uses the configured default.
    pub last_get_ttl: Option<Duration>,
    /// Whether the source understands `min_index`.
    pub supports_blocking: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            refresh: false,
            refresh_timer: Duration::ZERO,
            query_timeout: None,
            last_get_ttl: None,
            supports_blocking: true,
        }
    }
}

/// Fetcher is the capability that talks to the backing source for one type.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Fetches the data described by `req`, blocking server-side according to `opts`.
    async fn fetch(&self, opts: FetchOptions, req: Arc<dyn Request>) -> anyhow::Result<FetchResult>;

    /// Reports whether `req` has the shape this fetcher understands.
    fn accepts(&self, _req: &dyn Request) -> bool {
        true
    }

    /// Options applied when the fetcher is registered.
    fn options(&self) -> RegisterOptions {
        RegisterOptions::default()
    }
}
