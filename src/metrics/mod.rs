//! Cache metrics reported through the `metrics` facade.
//
//! No exporter is installed here; the embedding process chooses one.

pub mod meter;

// Re-export commonly used items
pub use meter::*;
