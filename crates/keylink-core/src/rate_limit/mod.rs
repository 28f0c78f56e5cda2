//! Global request admission.
//!
//! A single counter bounds the number of requests the server admits per
//! fixed window, across all clients. The counter is reset to zero by a
//! background task once per window, regardless of traffic. It is not
//! partitioned by client: one noisy client can use up the budget for
//! everyone.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Fixed-window, process-wide request counter.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    count: Mutex<u32>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` requests per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            count: Mutex::new(0),
        }
    }

    /// Admit one request if the window still has budget.
    ///
    /// Returns `false` without touching the counter once the limit is reached.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count >= self.limit {
            return false;
        }
        *count += 1;
        true
    }

    /// Start a new window.
    pub fn reset(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) = 0;
    }

    /// Requests admitted in the current window.
    pub fn admitted(&self) -> u32 {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum requests per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Spawn the task that resets the counter every window.
    ///
    /// The first reset happens one full window after the call. The task
    /// runs until `shutdown` fires or its sender is dropped.
    pub fn spawn_reset_task(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + limiter.window;
            let mut interval = tokio::time::interval_at(start, limiter.window);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        limiter.reset();
                        tracing::trace!("Rate window reset");
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate window task received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}
