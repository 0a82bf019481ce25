//! Sharded entry store.

pub mod map;
pub mod shard;
pub mod storage;


// Re-export main types
pub use map::Map;
pub use shard::Shard;
pub use storage::{Removal, Storage, SweepStats};

#[cfg(test)]
pub use map::NUM_OF_SHARDS;
