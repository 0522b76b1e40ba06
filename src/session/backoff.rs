//! Poll interval schedule
//!
//! Delay before poll `n` (counting from zero) is `base * multiplier^n`, capped
//! at `max`. A retry-after hint from the service raises the delay to at least
//! the hint, even past the cap.

use std::time::Duration;

/// Exponential backoff with a ceiling
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    multiplier: f64,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            base,
            multiplier: multiplier.max(1.0),
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Delay the schedule would produce for the given attempt, without a hint
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.base.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(secs).min(self.max)
    }

    /// Next delay, advancing the schedule
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        let computed = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        match hint {
            Some(hint) => computed.max(hint),
            None => computed,
        }
    }

    /// Number of delays handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
