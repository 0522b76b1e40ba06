//! Client-side request budget
//!
//! rustmaps.com allows 80 requests per minute and 3600 per hour for each API
//! key. The budget counts requests in rolling windows and refuses to send a
//! request that would exceed either limit, reporting how long to wait instead.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitSettings;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Rolling-window request counter shared by every call of one client
#[derive(Debug)]
pub struct RequestBudget {
    per_minute: usize,
    per_hour: usize,
    /// Send times, oldest first
    sent: Mutex<VecDeque<Instant>>,
}

impl RequestBudget {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute: per_minute as usize,
            per_hour: per_hour as usize,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Budget described by the settings, `None` when disabled
    pub fn from_settings(settings: &RateLimitSettings) -> Option<Self> {
        settings
            .enabled
            .then(|| Self::new(settings.per_minute, settings.per_hour))
    }

    /// Record a request if the budget allows it
    ///
    /// On refusal returns the time until the oldest counted request leaves
    /// the window that is full.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        while sent
            .front()
            .is_some_and(|stamp| now.duration_since(*stamp) >= HOUR)
        {
            sent.pop_front();
        }

        let in_last_minute = sent
            .iter()
            .rev()
            .take_while(|stamp| now.duration_since(**stamp) < MINUTE)
            .count();

        let mut wait = Duration::ZERO;
        if in_last_minute >= self.per_minute
            && let Some(oldest) = sent.get(sent.len() - in_last_minute)
        {
            wait = wait.max(MINUTE - now.duration_since(*oldest));
        }
        if sent.len() >= self.per_hour
            && let Some(oldest) = sent.front()
        {
            wait = wait.max(HOUR - now.duration_since(*oldest));
        }

        if wait > Duration::ZERO {
            return Err(wait);
        }

        sent.push_back(now);
        Ok(())
    }

    /// Requests counted in the current hour window
    pub fn counted(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}
