//! Login throttling against password guessing
//!
//! Failures are counted per key (the submitted username). Once
//! `max_attempts` failures land inside `window_seconds`, the key is locked
//! for `lockout_seconds`. A successful login clears the key. Keys whose
//! window has passed without a lock are pruned once the table grows past
//! [`PRUNE_THRESHOLD`].

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Table size at which stale keys are swept on the next failure
pub const PRUNE_THRESHOLD: usize = 1024;

/// Rate limiter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimiterConfig {
    /// Failures allowed inside the window
    pub max_attempts: u32,
    /// Window in seconds
    pub window_seconds: u64,
    /// Lockout duration in seconds
    pub lockout_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,  // 5 minutes
            lockout_seconds: 900, // 15 minutes
        }
    }
}

#[derive(Debug)]
struct Entry {
    failures: u32,
    window_start: Instant,
    locked_until: Option<Instant>,
}

impl Entry {
    /// Neither locked nor inside a counting window
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        let unlocked = self.locked_until.is_none_or(|until| now >= until);
        unlocked && now.duration_since(self.window_start) >= window
    }
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether `key` may attempt a login now
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let Some(locked_until) = entries.get(key).map(|entry| entry.locked_until) else {
            return true;
        };

        match locked_until {
            Some(until) if now < until => false,
            Some(_) => {
                entries.remove(key);
                true
            }
            None => true,
        }
    }

    /// Count a failed attempt for `key`, locking it when the limit is hit
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        if entries.len() >= PRUNE_THRESHOLD {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_stale(now, window));
            debug!("Pruned {} stale login throttle keys", before - entries.len());
        }

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            failures: 0,
            window_start: now,
            locked_until: None,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.failures = 0;
            entry.window_start = now;
        }

        entry.failures += 1;

        if entry.failures >= self.config.max_attempts {
            entry.locked_until = Some(now + Duration::from_secs(self.config.lockout_seconds));
            warn!(
                "Locked login for {} after {} failures for {} seconds",
                key, entry.failures, self.config.lockout_seconds
            );
        }
    }

    /// Forget all failures for `key`
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}
