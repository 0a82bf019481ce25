// Package model provides the request, payload and entry types shared by the cache.

pub mod entry;
pub mod fetch;
pub mod request;
pub mod value;


// Re-export main types
pub use entry::{Applied, Entry, EntryKey, EntryState, RefreshHandle};
pub use fetch::{FetchOptions, FetchResult, Fetcher, RegisterOptions, ResultMeta};
pub use request::{downcast, hash_key, Request, RequestInfo};
pub use value::Value;
