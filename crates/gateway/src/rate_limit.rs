//! Token-bucket rate limiting, keyed by bearer token (falling back to the
//! client IP for unauthenticated callers).
//!
//! Buckets refill continuously at the configured rate and are lazily
//! created on first sight of a key; an idle-bucket sweep keeps the map
//! from growing without bound.

use std::collections::HashMap;

use parking_lot::Mutex;

use masc_domain::clock::SharedClock;
use masc_domain::config::RateLimitConfig;
use masc_domain::{Error, Result};

struct Bucket {
    tokens: f64,
    last_refill: f64,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    clock: SharedClock,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `key`.  `rate_limited` when the bucket is empty;
    /// the error message carries a retry hint in seconds.
    pub fn check(&self, key: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let now = self.clock.now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.to_owned()).or_insert(Bucket {
            tokens: self.config.capacity as f64,
            last_refill: now,
        });

        let elapsed = (now - bucket.last_refill).max(0.0);
        bucket.tokens = (bucket.tokens + elapsed * self.config.refill_per_sec)
            .min(self.config.capacity as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let retry_after = ((1.0 - bucket.tokens) / self.config.refill_per_sec).ceil();
            Err(Error::RateLimited(format!(
                "bucket empty; retry in {retry_after}s"
            )))
        }
    }

    /// Seconds until one token is available, for the `Retry-After` header.
    pub fn retry_after_secs(&self, key: &str) -> u64 {
        let buckets = self.buckets.lock();
        match buckets.get(key) {
            Some(bucket) if bucket.tokens < 1.0 => {
                ((1.0 - bucket.tokens) / self.config.refill_per_sec).ceil() as u64
            }
            _ => 1,
        }
    }

    /// Drop buckets that have been idle long enough to be full again.
    pub fn sweep_idle(&self) {
        let now = self.clock.now();
        let idle_cutoff = self.config.capacity as f64 / self.config.refill_per_sec.max(1e-9);
        self.buckets
            .lock()
            .retain(|_, b| now - b.last_refill < idle_cutoff);
    }
}
