//! Request shape contract.

use std::any::Any;
use std::time::Duration;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::Error;

/// Per-request cache parameters echoed back by every request value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Identity of the requested data within its type, datacenter and token.
    pub key: String,
    pub datacenter: String,
    pub token: String,
    /// Blocking query watermark. Zero means "any version".
    pub min_index: u64,
    /// Upper bound for a blocking wait. Zero falls back to the type's query timeout.
    pub max_wait: Duration,
    pub allow_stale: bool,
    /// Whether the source may answer "not modified" instead of a payload.
    pub allow_not_modified: bool,
    /// Oldest acceptable cached value. Zero disables the check.
    pub max_age: Duration,
    /// Forces one fetch before the first answer.
    pub must_revalidate: bool,
}

/// Request is implemented by every request value the cache can serve.
pub trait Request: Send + Sync + 'static {
    /// Returns the cache parameters of this request.
    fn cache_info(&self) -> RequestInfo;

    /// Exposes the concrete request so fetchers can recover their own shape.
    fn as_any(&self) -> &dyn Any;
}

/// Recovers the concrete request a fetcher expects.
pub fn downcast<R: Request>(req: &dyn Request) -> Result<&R, Error> {
    req.as_any()
        .downcast_ref::<R>()
        .ok_or_else(|| Error::WrongRequestType(std::any::type_name::<R>().to_string()))
}

/// Derives a stable key from the identifying fields of a request.
///
/// Fields are hashed in their canonical JSON form, so equal field values
/// always produce equal keys regardless of where the request was built.
pub fn hash_key<T: Serialize + ?Sized>(fields: &T) -> String {
    // Serializing plain structs of strings and numbers cannot fail; an empty
    // buffer still yields a deterministic key.
    let raw = serde_json::to_vec(fields).unwrap_or_default();
    format!("{:016x}", xxh3_64(&raw))
}
