// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::backoff::Backoff;

mod test_config;
pub use test_config::new_test_config;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(72 * 60 * 60);
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cache {
    #[serde(rename = "cache")]
    pub cache: CacheBox,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub entries: Option<Entries>,
    pub reaper: Option<Reaper>,
    pub refresh: Option<Refresh>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
    #[serde(rename = "stats_interval", default, with = "humantime_serde")]
    pub stats_interval: Option<Duration>,
}

/// Entry lifetime defaults, overridable per registered type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Entries {
    #[serde(default, with = "humantime_serde")]
    pub ttl: Option<Duration>,
    #[serde(rename = "query_timeout", default, with = "humantime_serde")]
    pub query_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Reaper {
    pub enabled: bool,
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Refresh {
    #[serde(rename = "backoff_min_failures")]
    pub backoff_min_failures: Option<u32>,
    #[serde(rename = "backoff_base", default, with = "humantime_serde")]
    pub backoff_base: Option<Duration>,
    #[serde(rename = "backoff_max", default, with = "humantime_serde")]
    pub backoff_max: Option<Duration>,
    pub jitter: Option<bool>,
}

/// ConfigTrait resolves every setting to its effective value.
pub trait ConfigTrait {
    fn is_prod(&self) -> bool;
    #[allow(dead_code)]
    fn is_dev(&self) -> bool;
    #[allow(dead_code)]
    fn is_test(&self) -> bool;
    fn log_level(&self) -> &str;
    fn stats_interval(&self) -> Duration;
    fn entry_ttl(&self) -> Duration;
    fn query_timeout(&self) -> Duration;
    fn reaper_enabled(&self) -> bool;
    fn reaper_interval(&self) -> Duration;
    fn backoff(&self) -> Backoff;
}

pub type Config = Cache;

impl ConfigTrait for Config {
    fn is_prod(&self) -> bool {
        self.cache.env == PROD
    }

    fn is_dev(&self) -> bool {
        self.cache.env == DEV
    }

    fn is_test(&self) -> bool {
        self.cache.env == TEST
    }

    fn log_level(&self) -> &str {
        self.cache
            .logs
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn stats_interval(&self) -> Duration {
        self.cache
            .logs
            .as_ref()
            .and_then(|l| l.stats_interval)
            .unwrap_or(DEFAULT_STATS_INTERVAL)
    }

    fn entry_ttl(&self) -> Duration {
        self.cache
            .entries
            .as_ref()
            .and_then(|e| e.ttl)
            .unwrap_or(DEFAULT_ENTRY_TTL)
    }

    fn query_timeout(&self) -> Duration {
        self.cache
            .entries
            .as_ref()
            .and_then(|e| e.query_timeout)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT)
    }

    fn reaper_enabled(&self) -> bool {
        self.cache.reaper.as_ref().map_or(true, |r| r.enabled)
    }

    fn reaper_interval(&self) -> Duration {
        self.cache
            .reaper
            .as_ref()
            .and_then(|r| r.interval)
            .unwrap_or(DEFAULT_REAPER_INTERVAL)
    }

    fn backoff(&self) -> Backoff {
        let r = self.cache.refresh.clone().unwrap_or_default();
        Backoff {
            min_failures: r.backoff_min_failures.unwrap_or(0),
            base: r.backoff_base.unwrap_or(DEFAULT_BACKOFF_BASE),
            max: r.backoff_max.unwrap_or(DEFAULT_BACKOFF_MAX),
            jitter: r.jitter.unwrap_or(true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheBox {
                env: PROD.to_string(),
                ..CacheBox::default()
            },
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        Self::from_yaml(&data).with_context(|| format!("load config from {:?}", abs_path))
    }

    /// Parses and validates configuration from a YAML document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let mut cfg: Cache = serde_yaml::from_str(data).context("unmarshal yaml")?;
        if cfg.cache.env.is_empty() {
            cfg.cache.env = PROD.to_string();
        }

        if cfg.reaper_enabled() && cfg.reaper_interval().is_zero() {
            anyhow::bail!("reaper.interval must be positive");
        }
        if cfg.query_timeout().is_zero() {
            anyhow::bail!("entries.query_timeout must be positive");
        }
        let backoff = cfg.backoff();
        if backoff.base > backoff.max {
            anyhow::bail!(
                "refresh.backoff_base ({:?}) exceeds refresh.backoff_max ({:?})",
                backoff.base,
                backoff.max
            );
        }

        Ok(cfg)
    }
}
