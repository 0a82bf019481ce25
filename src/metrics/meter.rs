// Metric name constants
pub const HITS: &str = "cache_hits";
pub const MISSES: &str = "cache_misses";
pub const ENTRIES: &str = "cache_entries";

pub const FETCH_SUCCESS: &str = "fetch_success";
pub const FETCH_ERRORS: &str = "fetch_errors";
pub const FETCH_NOT_MODIFIED: &str = "fetch_not_modified";

pub const REFRESH_LOOPS_STARTED: &str = "refresh_loops_started";
pub const REFRESH_LOOPS_STOPPED: &str = "refresh_loops_stopped";
pub const REFRESH_ERRORS: &str = "refresh_errors";

pub const REAPER_EVICTED: &str = "reaper_evicted";
pub const REAPER_BUSY: &str = "reaper_busy";

/// Adds cache hits.
pub fn add_hits(value: u64) {
    metrics::counter!(HITS).increment(value);
}

/// Adds cache misses.
pub fn add_misses(value: u64) {
    metrics::counter!(MISSES).increment(value);
}

/// Sets the number of stored entries.
pub fn set_entries(len: i64) {
    metrics::gauge!(ENTRIES).set(len as f64);
}

/// Adds successful fetches.
pub fn add_fetch_success(value: u64) {
    metrics::counter!(FETCH_SUCCESS).increment(value);
}

/// Adds failed fetches.
pub fn add_fetch_errors(value: u64) {
    metrics::counter!(FETCH_ERRORS).increment(value);
}

/// Adds fetches answered with not-modified.
pub fn add_fetch_not_modified(value: u64) {
    metrics::counter!(FETCH_NOT_MODIFIED).increment(value);
}

pub fn add_refresh_loops_started(value: u64) {
    metrics::counter!(REFRESH_LOOPS_STARTED).increment(value);
}

pub fn add_refresh_loops_stopped(value: u64) {
    metrics::counter!(REFRESH_LOOPS_STOPPED).increment(value);
}

pub fn add_refresh_errors(value: u64) {
    metrics::counter!(REFRESH_ERRORS).increment(value);
}

/// Adds entries removed by the reaper.
pub fn add_reaper_evicted(value: u64) {
    metrics::counter!(REAPER_EVICTED).increment(value);
}

/// Adds expired entries the reaper had to skip.
pub fn add_reaper_busy(value: u64) {
    metrics::counter!(REAPER_BUSY).increment(value);
}
