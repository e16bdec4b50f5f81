//! Fixed-window rate limit table keyed by client identity.
//!
//! A window is reset lazily when the client is next seen after expiry;
//! `purge_expired` clears entries for clients that never came back, so the
//! table stays bounded regardless of how many distinct clients appear over
//! the process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-client counter and window start.
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    started: Instant,
}

/// Shared rate limit table. Increment happens under a single lock, so
/// concurrent admissions cannot push a counter past the limit.
pub struct RateLimitTable {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, ClientWindow>>,
}

impl RateLimitTable {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Consume one slot for `client`.
    ///
    /// Returns `Err(retry_after)` when the client is over its limit for the
    /// current window; the counter is not advanced in that case.
    pub fn try_acquire(&self, client: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limit table poisoned");

        let entry = windows.entry(client.to_string()).or_insert(ClientWindow {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.limit {
            let retry_after = self.window.saturating_sub(now.duration_since(entry.started));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop entries whose window has fully elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limit table poisoned");
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
        before - windows.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().expect("rate limit table poisoned").len()
    }
}
