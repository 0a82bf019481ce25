//! Entry storage.

pub mod storage;

// Re-export main types
pub use storage::{Removal, Storage, SweepStats};
