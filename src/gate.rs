//! Process-wide rate gate for the director query.
//!
//! [`RateGate`] hands out at most `capacity` permits in any rolling
//! `window`. A denied call fails immediately; nothing queues, nothing
//! retries. One gate is shared by every caller of
//! [`DirectorService`](crate::DirectorService).
//!
//! The gate keeps the instants of the grants still inside the window
//! (never more than `capacity` of them), so the bound holds for every
//! window position, not just aligned ones.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Configuration for the rate gate.
///
/// ```rust
/// # use marquee::RateGateConfig;
/// # use std::time::Duration;
/// let config = RateGateConfig::new()
///     .capacity(10)
///     .window(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct RateGateConfig {
    /// Permits granted per window. Default: 3.
    pub capacity: u32,
    /// Rolling window length. Default: 60s.
    pub window: Duration,
}

impl Default for RateGateConfig {
    fn default() -> Self {
        Self {
            capacity: 3,
            window: Duration::from_secs(60),
        }
    }
}

impl RateGateConfig {
    /// Create a new config with the default 3 permits per 60 seconds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of permits per window.
    pub fn capacity(mut self, n: u32) -> Self {
        self.capacity = n;
        self
    }

    /// Set the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Rolling-window permit counter, safe to share across tasks.
#[derive(Debug)]
pub struct RateGate {
    capacity: u32,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateGate {
    pub fn new(config: &RateGateConfig) -> Self {
        Self {
            capacity: config.capacity,
            window: config.window,
            grants: Mutex::new(VecDeque::with_capacity(config.capacity as usize)),
        }
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.acquire().is_ok()
    }

    /// Take a permit, or report how long until the oldest grant expires.
    pub fn acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut grants = self.lock();
        self.expire(&mut grants, now);

        if (grants.len() as u32) < self.capacity {
            grants.push_back(now);
            return Ok(());
        }

        let retry_after = grants
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(self.window);
        Err(retry_after)
    }

    /// Permits that would be granted right now.
    pub fn available(&self) -> u32 {
        let now = Instant::now();
        let mut grants = self.lock();
        self.expire(&mut grants, now);
        self.capacity.saturating_sub(grants.len() as u32)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn expire(&self, grants: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = grants.front() {
            if now.duration_since(*oldest) >= self.window {
                grants.pop_front();
            } else {
                break;
            }
        }
    }

    // The deque is valid after every push/pop, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.grants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(&RateGateConfig::default())
    }
}
