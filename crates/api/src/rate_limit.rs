//! Per-user fixed-window limiter for annotation writes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rinkmark_core::types::UserId;

/// Windows older than this many entries trigger a sweep of expired users.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Allows `limit` calls per user per `window`. A limit of zero disables it.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<UserId, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Count one call for `user`. On rejection returns the time until the
    /// user's window resets.
    pub fn check(&self, user: UserId) -> Result<(), Duration> {
        self.check_at(user, Instant::now())
    }

    pub fn check_at(&self, user: UserId, now: Instant) -> Result<(), Duration> {
        if self.limit == 0 {
            return Ok(());
        }
        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(user).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.limit {
            let retry_after = self.window - now.duration_since(entry.started);
            tracing::debug!(user, limit = self.limit, ?retry_after, "Rate limit exceeded");
            return Err(retry_after);
        }
        entry.count += 1;
        Ok(())
    }
}
