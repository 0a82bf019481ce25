//! Opaque cached payloads.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Value is a shared, type-erased payload produced by a fetcher.
///
/// Cloning a value never copies the payload. Two values are the same
/// payload when [`Value::ptr_eq`] holds, which is what callers rely on
/// to detect "unchanged" data after a not-modified reply.
#[derive(Clone)]
pub struct Value(Arc<dyn Any + Send + Sync>);

impl Value {
    /// Wraps a payload.
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self(Arc::new(payload))
    }

    /// Wraps an already shared payload without re-allocating it.
    pub fn from_arc<T: Any + Send + Sync>(payload: Arc<T>) -> Self {
        Self(payload)
    }

    /// Borrows the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns the payload as a shared `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone().downcast::<T>().ok()
    }

    /// Reports whether both values hold the very same payload instance.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}
