//! Exponential backoff for retrying failed fetches.
//

use rand::Rng;
use std::time::Duration;

/// Backoff grows the wait exponentially with consecutive failures.
///
/// The first `min_failures` failures retry immediately. After that the wait is
/// `base * 2^(failures - min_failures - 1)`, plus up to the same amount of
/// random jitter when enabled. The result never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub min_failures: u32,
    pub base: Duration,
    pub max: Duration,
    pub jitter: bool,
}

impl Backoff {
    /// Wait before the next attempt after `failures` consecutive failures.
    pub fn wait(&self, failures: u32) -> Duration {
        let wait = self.base_wait(failures);
        if !self.jitter || wait.is_zero() {
            return wait;
        }
        (wait + stagger(wait)).min(self.max)
    }

    /// Wait without jitter.
    pub fn base_wait(&self, failures: u32) -> Duration {
        if failures <= self.min_failures {
            return Duration::ZERO;
        }
        let shift = failures - self.min_failures - 1;
        if shift >= 31 {
            return self.max;
        }
        self.base.saturating_mul(1u32 << shift).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min_failures: 0,
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
            jitter: true,
        }
    }
}

/// Random duration in [0, interval).
pub fn stagger(interval: Duration) -> Duration {
    let nanos = interval.as_nanos().min(u64::MAX as u128) as u64;
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(min_failures: u32) -> Backoff {
        Backoff {
            min_failures,
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
            jitter: false,
        }
    }

    #[test]
    fn test_no_wait_below_threshold() {
        let b = plain(3);
        for failures in 0..=3 {
            assert_eq!(b.wait(failures), Duration::ZERO);
        }
        assert_eq!(b.wait(4), Duration::from_secs(1));
    }

    #[test]
    fn test_doubles_until_capped() {
        let b = plain(0);
        assert_eq!(b.wait(1), Duration::from_secs(1));
        assert_eq!(b.wait(2), Duration::from_secs(2));
        assert_eq!(b.wait(3), Duration::from_secs(4));
        assert_eq!(b.wait(7), Duration::from_secs(60));
        assert_eq!(b.wait(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_jitter_stays_within_one_interval() {
        let b = Backoff { jitter: true, ..plain(0) };
        for _ in 0..100 {
            let w = b.wait(2);
            assert!(w >= Duration::from_secs(2) && w < Duration::from_secs(4), "{w:?}");
        }
    }

    #[test]
    fn test_jitter_never_exceeds_max() {
        let b = Backoff { jitter: true, ..plain(0) };
        for failures in [6, 7, 20, u32::MAX] {
            assert!(b.wait(failures) <= Duration::from_secs(60), "failures={failures}");
        }
    }
}
