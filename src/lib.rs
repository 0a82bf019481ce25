#[path = "shared/backoff/mod.rs"]
pub mod backoff;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logs;
pub mod metrics;
pub mod model;
pub mod workers;

pub use cache::{Cache, UpdateEvent};
pub use config::{Config, ConfigTrait};
pub use error::Error;
pub use model::{downcast, hash_key, FetchOptions, FetchResult, Fetcher, RegisterOptions, Request, RequestInfo, ResultMeta, Value};
