//! Cache error taxonomy.

use std::sync::Arc;
use std::time::Duration;

use crate::model::Value;

/// Errors surfaced by the cache engine.
///
/// Errors are cheap to clone: a single fetch outcome is handed to every
/// caller that joined it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// `get`, `notify` or `prepopulate` named a type nobody registered.
    #[error("unknown type in cache: {0}")]
    UnregisteredType(String),

    /// The request value does not have the shape the type expects.
    #[error("internal cache failure: request wrong type: {0}")]
    WrongRequestType(String),

    /// A second fetcher was registered under an existing name.
    #[error("type {0} is already registered")]
    DuplicateType(String),

    /// The fetcher failed. Any previously cached value is kept.
    #[error("fetch failed: {0:#}")]
    FetchFailed(Arc<anyhow::Error>),

    /// The caller (or the cache) was cancelled before the answer was ready.
    /// `stale` holds the cached value when one was ever fetched.
    #[error("request canceled")]
    Canceled { stale: Option<Value>, index: u64 },

    /// The wait bound elapsed before any value was ever fetched.
    #[error("no value fetched within {0:?}")]
    Timeout(Duration),

    /// Prepopulate would move the entry behind an index already observed.
    #[error("prepopulate index {offered} is behind cached index {current}")]
    Regression { current: u64, offered: u64 },

    /// Prepopulate was called without a value.
    #[error("prepopulate requires a value")]
    EmptyValue,

    /// Notify on a polling type needs a max age to pace the polls.
    #[error("cannot use notify for polling cache type {0} without max age")]
    NotifyRequiresMaxAge(String),
}

impl Error {
    /// Classifies an error returned by a fetcher.
    pub fn from_fetch(err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(e @ Error::WrongRequestType(_)) => e,
            Ok(other) => Error::FetchFailed(Arc::new(other.into())),
            Err(err) => Error::FetchFailed(Arc::new(err)),
        }
    }

    /// Cancellation without anything cached.
    pub(crate) fn canceled() -> Self {
        Error::Canceled { stale: None, index: 0 }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled { .. })
    }

    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Error::WrongRequestType(_))
    }
}
