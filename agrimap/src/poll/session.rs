//! Poll session state.
//!
//! # State Machine
//!
//! ```text
//! Idle --start()--> Polling --is_complete--> Completed
//!                      │
//!                      ├--deadline reached--> TimedOut
//!                      └--cancel()----------> Cancelled
//! ```
//!
//! Terminal states are final: the first transition out of `Polling` wins
//! and every later one is refused. This is what keeps `on_complete` from
//! running after a cancellation that raced with the last fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::MIN_POLL_INTERVAL;

/// Message shown to the user when a session times out.
pub const TIMEOUT_MESSAGE: &str =
    "Analysis is taking longer than expected. Refresh the assessment later to see the results.";

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    Idle,
    Polling,
    Completed,
    TimedOut,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollState::Completed | PollState::TimedOut | PollState::Cancelled
        )
    }
}

/// Passed to `on_timeout` when a session runs out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTimeout {
    pub resource_id: String,
    pub elapsed: Duration,
}

impl PollTimeout {
    /// User-facing advice to retry manually.
    pub fn message(&self) -> &'static str {
        TIMEOUT_MESSAGE
    }
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

struct SessionInner {
    id: u64,
    resource_id: String,
    started_at: Instant,
    interval: Duration,
    max_duration: Duration,
    cancel: CancellationToken,
    state: Mutex<PollState>,
}

/// Handle to one polling run for one resource.
///
/// Cheap to clone; every clone observes the same state.
#[derive(Clone)]
pub struct PollSession {
    inner: Arc<SessionInner>,
}

impl PollSession {
    pub(crate) fn new(
        resource_id: impl Into<String>,
        interval: Duration,
        max_duration: Duration,
        state: PollState,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                resource_id: resource_id.into(),
                started_at: Instant::now(),
                interval: interval.max(MIN_POLL_INTERVAL),
                max_duration,
                cancel: CancellationToken::new(),
                state: Mutex::new(state),
            }),
        }
    }

    /// Process-unique session number.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn resource_id(&self) -> &str {
        &self.inner.resource_id
    }

    pub fn state(&self) -> PollState {
        *self.inner.state.lock()
    }

    pub fn is_polling(&self) -> bool {
        self.state() == PollState::Polling
    }

    pub fn started_at(&self) -> Instant {
        self.inner.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Instant after which the session times out.
    pub fn deadline(&self) -> Instant {
        self.inner.started_at + self.inner.max_duration
    }

    /// Cancels a live session. Returns `false` if it had already ended.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.is_terminal() {
            return false;
        }
        *state = PollState::Cancelled;
        self.inner.cancel.cancel();
        true
    }

    /// Resolves once the session is cancelled.
    pub(crate) async fn cancelled(&self) {
        self.inner.cancel.cancelled().await
    }

    /// Moves a polling session into a terminal state. Returns `false` if
    /// another transition got there first.
    pub(crate) fn finish(&self, next: PollState) -> bool {
        let mut state = self.inner.state.lock();
        if *state != PollState::Polling {
            return false;
        }
        *state = next;
        if next.is_terminal() {
            self.inner.cancel.cancel();
        }
        true
    }

    pub(crate) fn same_session(&self, other: &PollSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for PollSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSession")
            .field("id", &self.inner.id)
            .field("resource_id", &self.inner.resource_id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polling() -> PollSession {
        PollSession::new(
            "42",
            Duration::from_secs(15),
            Duration::from_secs(180),
            PollState::Polling,
        )
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let session = polling();
        assert!(session.cancel());
        assert!(!session.cancel());
        assert_eq!(session.state(), PollState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let session = polling();
        assert!(session.finish(PollState::Completed));
        assert!(!session.cancel());
        assert_eq!(session.state(), PollState::Completed);
    }

    #[tokio::test]
    async fn test_first_terminal_transition_wins() {
        let session = polling();
        assert!(session.cancel());
        assert!(!session.finish(PollState::Completed));
        assert_eq!(session.state(), PollState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_measured_from_start() {
        let session = polling();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(session.elapsed(), Duration::from_secs(30));
        assert_eq!(session.deadline() - session.started_at(), Duration::from_secs(180));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = polling();
        let clone = session.clone();
        clone.cancel();
        assert_eq!(session.state(), PollState::Cancelled);
        assert!(session.same_session(&clone));
        assert_ne!(session.id(), polling().id());
    }

    #[test]
    fn test_timeout_message() {
        let timeout = PollTimeout {
            resource_id: "42".to_string(),
            elapsed: Duration::from_secs(180),
        };
        assert_eq!(timeout.message(), TIMEOUT_MESSAGE);
    }
}
