// Cache constructors and small async helpers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::new_test_config;
use crate::Cache;

/// Creates a cache with short worker intervals.
pub fn new_cache() -> Cache {
    Cache::new(new_test_config())
}

/// A fresh, never canceled context.
pub fn ctx() -> CancellationToken {
    CancellationToken::new()
}

/// Polls `cond` every 5ms until it holds or `limit` passes.
pub async fn wait_until<F: FnMut() -> bool>(limit: Duration, mut cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
