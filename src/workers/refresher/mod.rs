pub mod counters;
pub mod refresher;

pub use counters::Counters;
pub use refresher::{RefreshTask, Refresher};
