// Package workers exposes backend interfaces used by worker groups.

use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::db::SweepStats;
use crate::error::Error;

use super::refresher::RefreshTask;

/// ReapBackend interface for TTL eviction.
pub trait ReapBackend: Send + Sync {
    /// Gets the number of entries.
    fn len(&self) -> i64;

    /// Evicts entries idle past their TTL.
    fn sweep(&self, token: &CancellationToken, now: Instant) -> SweepStats;
}

/// RefreshBackend interface for background refresh.
#[async_trait::async_trait]
pub trait RefreshBackend: Send + Sync {
    /// Starts (or joins) one fetch for the task's entry and waits until its
    /// outcome has been applied.
    async fn poll(&self, task: &RefreshTask) -> Result<(), Error>;

    /// Detaches the loop from its entry. Called exactly once when the loop exits.
    fn release(&self, task: &RefreshTask);
}
