// Worker functionality for cache maintenance.

pub mod backend;
pub mod reaper;
pub mod refresher;
pub mod telemetry;

// Re-export main types
pub use backend::{ReapBackend, RefreshBackend};
pub use reaper::Reaper;
pub use refresher::{RefreshTask, Refresher};
