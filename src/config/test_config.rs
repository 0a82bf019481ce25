use super::{CacheBox, Config, Entries, Logs, Reaper, Refresh};
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        cache: CacheBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
                stats_interval: Some(Duration::from_secs(1)),
            }),
            entries: Some(Entries {
                ttl: Some(Duration::from_secs(60)),
                query_timeout: Some(Duration::from_secs(5)),
            }),
            reaper: Some(Reaper {
                enabled: true,
                interval: Some(Duration::from_millis(20)),
            }),
            refresh: Some(Refresh {
                backoff_min_failures: Some(0),
                backoff_base: Some(Duration::from_millis(10)),
                backoff_max: Some(Duration::from_millis(80)),
                jitter: Some(false),
            }),
        },
    }
}
