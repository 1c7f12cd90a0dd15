//! Admission control for sensitive endpoints.
//!
//! Fixed-window request counting keyed by `(client, route prefix)`. Bursts up
//! to the limit are admitted at the start of a window and everything beyond
//! it is rejected until the window rolls over; this is the documented
//! trade-off against smoothing algorithms such as token buckets.

use crate::error::{CommerceError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Limiter policy. The defaults mirror the production configuration:
/// 60 requests per 60-second window on the login and product-browse routes.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub prefixes: Vec<String>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
            prefixes: vec!["/api/auth/login".to_string(), "/api/products".to_string()],
        }
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Request-rate governor in front of the engines.
///
/// Counters are mutated under one mutex per key, so concurrent requests for
/// the same key never lose increments while unrelated keys proceed without
/// contending on a shared lock.
pub struct AdmissionLimiter {
    config: LimiterConfig,
    windows: RwLock<HashMap<String, Arc<Mutex<Window>>>>,
}

impl AdmissionLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// The matched sensitive prefix for a path, if any. Paths outside the
    /// configured prefixes are not limited at all.
    pub fn matched_prefix(&self, path: &str) -> Option<&str> {
        self.config
            .prefixes
            .iter()
            .find(|prefix| path.starts_with(prefix.as_str()))
            .map(String::as_str)
    }

    pub fn applies_to(&self, path: &str) -> bool {
        self.matched_prefix(path).is_some()
    }

    /// Admits or rejects one request. Window reset and increment happen as a
    /// single step under the key's lock.
    pub fn allow(&self, client: &str, path: &str) -> bool {
        let Some(prefix) = self.matched_prefix(path) else {
            return true;
        };
        let key = format!("{client}:{prefix}");

        let window = self.window_for(&key);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        if now.duration_since(window.started) >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// [`Self::allow`] expressed in the error taxonomy, for callers that
    /// propagate rejections instead of branching.
    pub fn check(&self, client: &str, path: &str) -> Result<()> {
        if self.allow(client, path) {
            Ok(())
        } else {
            Err(CommerceError::RateLimited)
        }
    }

    fn window_for(&self, key: &str) -> Arc<Mutex<Window>> {
        {
            let windows = self
                .windows
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(window) = windows.get(key) {
                return Arc::clone(window);
            }
        }

        let mut windows = self
            .windows
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(key.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }))
        });
        Arc::clone(window)
    }
}

impl Default for AdmissionLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}
