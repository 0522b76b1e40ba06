//! Generation poller
//!
//! Drives one submitted map from staging to a terminal state. A
//! [`PollSession`] is owned by a single wait and never shared; the poller
//! performs at most one status request at a time for it.
//!
//! ```text
//! NotStarted ─► Staging ─► Generating ─► Completed
//!                  │            │
//!                  └────────────┴──► Failed | TimedOut | Errored | Cancelled
//! ```

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use crate::api::{MapStatusProvider, Observation};
use crate::config::PollSettings;
use crate::error::format_error_for_logging;
use crate::types::{MapIdentity, MapResult, MapStatus};
use crate::{Error, Result};

/// Lifecycle state of a poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    NotStarted,
    Staging,
    Generating,
    Completed,
    Failed,
    TimedOut,
    Errored,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Errored | Self::Cancelled
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::Staging => "staging",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Bounds and backoff schedule of a poll session
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Total polls allowed in one session
    pub max_attempts: u32,
    /// Wall-clock limit of one session
    pub max_wait: Duration,
}

impl PollPolicy {
    fn backoff(&self) -> Backoff {
        Backoff::new(self.base_delay, self.multiplier, self.max_delay)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for PollPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self {
            base_delay: settings.base_delay(),
            multiplier: settings.multiplier,
            max_delay: settings.max_delay(),
            max_attempts: settings.max_attempts,
            max_wait: settings.max_wait(),
        }
    }
}

/// State of one wait-for-completion call
#[derive(Debug)]
pub struct PollSession {
    identity: MapIdentity,
    state: SessionState,
    attempts: u32,
    last_status: Option<MapStatus>,
    /// States entered, in order, without repeats
    history: Vec<SessionState>,
    started: Instant,
    backoff: Backoff,
}

impl PollSession {
    pub fn new(identity: MapIdentity, policy: &PollPolicy) -> Self {
        Self {
            identity,
            state: SessionState::NotStarted,
            attempts: 0,
            last_status: None,
            history: Vec::new(),
            started: Instant::now(),
            backoff: policy.backoff(),
        }
    }

    pub fn identity(&self) -> &MapIdentity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Polls performed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_status(&self) -> Option<MapStatus> {
        self.last_status
    }

    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn enter(&mut self, state: SessionState) {
        if self.state != state {
            debug!(
                seed = self.identity.seed(),
                size = self.identity.size(),
                from = %self.state,
                to = %state,
                "Poll session transition"
            );
            self.state = state;
            self.history.push(state);
        }
    }

    fn timed_out(&mut self) -> Error {
        self.enter(SessionState::TimedOut);
        warn!(
            seed = self.identity.seed(),
            size = self.identity.size(),
            attempts = self.attempts,
            "Map generation timed out"
        );
        Error::TimedOut {
            identity: self.identity,
            attempts: self.attempts,
            elapsed: self.elapsed(),
        }
    }

    fn cancelled(&mut self) -> Error {
        self.enter(SessionState::Cancelled);
        info!(
            seed = self.identity.seed(),
            size = self.identity.size(),
            attempts = self.attempts,
            "Map generation wait cancelled"
        );
        Error::Cancelled {
            identity: self.identity,
        }
    }

    fn errored(&mut self, error: Error) -> Error {
        self.enter(SessionState::Errored);
        warn!(
            seed = self.identity.seed(),
            size = self.identity.size(),
            attempts = self.attempts,
            error = %format_error_for_logging(&error),
            "Map generation wait failed"
        );
        error
    }
}

/// Polls a map until it reaches a terminal state
#[derive(Debug)]
pub struct Poller<'a, P: MapStatusProvider + ?Sized> {
    provider: &'a P,
    policy: PollPolicy,
}

impl<'a, P: MapStatusProvider + ?Sized> Poller<'a, P> {
    pub fn new(provider: &'a P, policy: PollPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Wait for the map to finish generating
    pub async fn wait(
        &self,
        identity: MapIdentity,
        cancel: &CancellationToken,
    ) -> Result<MapResult> {
        let mut session = PollSession::new(identity, &self.policy);
        self.run(&mut session, cancel).await
    }

    /// Drive an existing session to a terminal state
    ///
    /// The first poll is sent immediately; later polls follow the backoff
    /// schedule, raised to any retry-after hint the service gives.
    pub async fn run(
        &self,
        session: &mut PollSession,
        cancel: &CancellationToken,
    ) -> Result<MapResult> {
        let identity = session.identity;
        // a wait too long to represent has no deadline
        let deadline = session.started.checked_add(self.policy.max_wait);

        loop {
            if cancel.is_cancelled() {
                return Err(session.cancelled());
            }

            session.attempts += 1;
            let observed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(session.cancelled()),
                observed = self.provider.observe(&identity) => observed,
            };

            let mut hint = None;
            let mut retryable = None;
            match observed {
                Ok(observation) => {
                    session.last_status = Some(observation.status());
                    match observation {
                        Observation::Completed(result) => {
                            session.enter(SessionState::Completed);
                            info!(
                                seed = identity.seed(),
                                size = identity.size(),
                                attempts = session.attempts,
                                map_id = %result.map_id,
                                "Map generation completed"
                            );
                            return Ok(*result);
                        }
                        Observation::Failed { reason } => {
                            session.enter(SessionState::Failed);
                            let reason =
                                reason.unwrap_or_else(|| "generation failed".to_string());
                            warn!(
                                seed = identity.seed(),
                                size = identity.size(),
                                reason = %reason,
                                "Map generation failed"
                            );
                            return Err(Error::GenerationFailed { identity, reason });
                        }
                        Observation::Pending | Observation::NotFound => {
                            session.enter(SessionState::Staging)
                        }
                        Observation::Generating => session.enter(SessionState::Generating),
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        seed = identity.seed(),
                        size = identity.size(),
                        attempt = session.attempts,
                        error = %format_error_for_logging(&e),
                        "Status poll failed, will retry"
                    );
                    hint = e.retry_after();
                    retryable = Some(e);
                }
                Err(e) => return Err(session.errored(e)),
            }

            if session.attempts >= self.policy.max_attempts {
                return Err(match retryable {
                    Some(e) => session.errored(e),
                    None => session.timed_out(),
                });
            }

            let now = Instant::now();
            let mut delay = session.backoff.next_delay(hint);
            if let Some(deadline) = deadline {
                if now >= deadline {
                    return Err(session.timed_out());
                }
                delay = delay.min(deadline - now);
            }
            debug!(
                seed = identity.seed(),
                size = identity.size(),
                attempt = session.attempts,
                delay_ms = delay.as_millis() as u64,
                state = %session.state,
                "Scheduling next status poll"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(session.cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(session.timed_out());
            }
        }
    }
}
