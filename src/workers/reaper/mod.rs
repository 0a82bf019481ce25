pub mod counters;
pub mod reaper;

pub use counters::Counters;
pub use reaper::Reaper;
