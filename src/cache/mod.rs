//! Blocking-query cache engine.

mod cache;
mod fetch;
mod get;
mod notify;
mod refresh;
mod types;

pub use cache::Cache;
pub use notify::UpdateEvent;
