//! Fixed-interval result poller.
//!
//! [`ResultPoller`] re-fetches a backend resource until a completion
//! predicate holds or a deadline passes. At most one session is active per
//! resource id; starting again replaces the old session.
//!
//! # Timing
//!
//! ```text
//! start          tick         tick         tick               deadline
//!   │─ interval ──│─ interval ──│─ interval ──│─ ... ────────────│
//!                 fetch        fetch        fetch               TimedOut
//! ```
//!
//! The deadline is measured from the session's start on tokio's clock and
//! races every fetch, so a hung request cannot push a session past it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{interval_at, sleep_until, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::config::PollerConfig;
use super::error::PollError;
use super::session::{PollSession, PollState, PollTimeout};

/// Fetches the current version of a polled resource.
pub trait ResourceFetcher<R>: Send + Sync + 'static {
    fn fetch(&self, resource_id: &str) -> impl Future<Output = Result<R, PollError>> + Send;
}

type SessionMap = Arc<Mutex<HashMap<String, PollSession>>>;

enum Outcome<R> {
    Completed(R),
    TimedOut,
    Cancelled,
}

/// Polls resources through a [`ResourceFetcher`].
///
/// Dropping the poller cancels every session it started.
pub struct ResultPoller<F> {
    fetcher: Arc<F>,
    config: PollerConfig,
    sessions: SessionMap,
}

impl<F> ResultPoller<F> {
    pub fn new(fetcher: F, config: PollerConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> PollerConfig {
        self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Number of sessions currently polling.
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|session| session.is_polling())
            .count()
    }

    /// The live session for `resource_id`, if any.
    pub fn session(&self, resource_id: &str) -> Option<PollSession> {
        self.sessions
            .lock()
            .get(resource_id)
            .filter(|session| session.is_polling())
            .cloned()
    }

    /// Cancels `session`. A no-op for sessions that already ended.
    pub fn cancel(&self, session: &PollSession) -> bool {
        let cancelled = session.cancel();
        let mut sessions = self.sessions.lock();
        if sessions
            .get(session.resource_id())
            .is_some_and(|current| current.same_session(session))
        {
            sessions.remove(session.resource_id());
        }
        if cancelled {
            debug!(resource_id = session.resource_id(), "Poll session cancelled");
        }
        cancelled
    }

    /// Cancels every session.
    pub fn shutdown(&self) {
        let sessions: Vec<PollSession> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        let cancelled = sessions.iter().filter(|s| s.cancel()).count();
        if cancelled > 0 {
            info!(cancelled, "Result poller shut down");
        }
    }

    /// Starts polling `resource_id`.
    ///
    /// If `current` already satisfies `is_complete`, `on_complete` runs
    /// before this returns and no fetch is ever made. Otherwise any live
    /// session for the same id is cancelled and a new one is spawned on the
    /// current tokio runtime.
    pub fn start<R, P, C, T>(
        &self,
        resource_id: impl Into<String>,
        current: Option<R>,
        is_complete: P,
        on_complete: C,
        on_timeout: T,
    ) -> PollSession
    where
        F: ResourceFetcher<R>,
        R: Send + 'static,
        P: Fn(&R) -> bool + Send + Sync + 'static,
        C: FnOnce(R) + Send + 'static,
        T: FnOnce(PollTimeout) + Send + 'static,
    {
        let resource_id = resource_id.into();

        if let Some(stale) = self.sessions.lock().remove(&resource_id) {
            if stale.cancel() {
                debug!(
                    resource_id = %resource_id,
                    session = stale.id(),
                    "Replacing live poll session"
                );
            }
        }

        if let Some(resource) = current.filter(|r| is_complete(r)) {
            let session = PollSession::new(
                resource_id,
                self.config.interval,
                self.config.timeout,
                PollState::Completed,
            );
            debug!(resource_id = session.resource_id(), "Resource already complete, not polling");
            on_complete(resource);
            return session;
        }

        let session = PollSession::new(
            resource_id.clone(),
            self.config.interval,
            self.config.timeout,
            PollState::Polling,
        );
        self.sessions.lock().insert(resource_id, session.clone());

        info!(
            resource_id = session.resource_id(),
            session = session.id(),
            interval_secs = self.config.interval.as_secs(),
            timeout_secs = self.config.timeout.as_secs(),
            "Poll session started"
        );

        tokio::spawn(run_session(
            Arc::clone(&self.fetcher),
            session.clone(),
            Arc::clone(&self.sessions),
            is_complete,
            on_complete,
            on_timeout,
        ));

        session
    }
}

impl<F> Drop for ResultPoller<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_session<F, R, P, C, T>(
    fetcher: Arc<F>,
    session: PollSession,
    sessions: SessionMap,
    is_complete: P,
    on_complete: C,
    on_timeout: T,
) where
    F: ResourceFetcher<R>,
    R: Send + 'static,
    P: Fn(&R) -> bool + Send + Sync + 'static,
    C: FnOnce(R) + Send + 'static,
    T: FnOnce(PollTimeout) + Send + 'static,
{
    let deadline = session.deadline();
    let mut ticks = interval_at(session.started_at() + session.interval(), session.interval());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick_count: u64 = 0;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = session.cancelled() => break Outcome::Cancelled,
            _ = sleep_until(deadline) => break Outcome::TimedOut,
            _ = ticks.tick() => {
                if !session.is_polling() {
                    break Outcome::Cancelled;
                }
                tick_count += 1;

                tokio::select! {
                    biased;
                    _ = session.cancelled() => break Outcome::Cancelled,
                    _ = sleep_until(deadline) => break Outcome::TimedOut,
                    result = fetcher.fetch(session.resource_id()) => match result {
                        Ok(resource) if is_complete(&resource) => break Outcome::Completed(resource),
                        Ok(_) => debug!(
                            resource_id = session.resource_id(),
                            tick = tick_count,
                            "Resource not complete yet"
                        ),
                        Err(e) => warn!(
                            resource_id = session.resource_id(),
                            tick = tick_count,
                            error = %e,
                            "Poll tick failed, will retry"
                        ),
                    }
                }
            }
        }
    };

    match outcome {
        Outcome::Completed(resource) => {
            if session.finish(PollState::Completed) {
                info!(
                    resource_id = session.resource_id(),
                    ticks = tick_count,
                    elapsed_secs = session.elapsed().as_secs(),
                    "Poll session completed"
                );
                on_complete(resource);
            }
        }
        Outcome::TimedOut => {
            if session.finish(PollState::TimedOut) {
                info!(
                    resource_id = session.resource_id(),
                    ticks = tick_count,
                    "Poll session timed out"
                );
                on_timeout(PollTimeout {
                    resource_id: session.resource_id().to_string(),
                    elapsed: session.elapsed(),
                });
            }
        }
        Outcome::Cancelled => {
            debug!(resource_id = session.resource_id(), "Poll session stopped after cancel");
        }
    }

    let mut sessions = sessions.lock();
    if sessions
        .get(session.resource_id())
        .is_some_and(|current| current.same_session(&session))
    {
        sessions.remove(session.resource_id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::MIN_POLL_INTERVAL;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    struct Job {
        done: bool,
    }

    /// Replays scripted responses, then keeps returning "not done".
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<Job, PollError>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Job, PollError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn never_done() -> Self {
            Self::new(Vec::new())
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::never_done()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ResourceFetcher<Job> for ScriptedFetcher {
        async fn fetch(&self, _resource_id: &str) -> Result<Job, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script
                .lock()
                .pop_front()
                .unwrap_or(Ok(Job { done: false }))
        }
    }

    #[derive(Default)]
    struct Callbacks {
        completed: Mutex<Vec<Job>>,
        timeouts: Mutex<Vec<(PollTimeout, Instant)>>,
    }

    fn start(
        poller: &ResultPoller<ScriptedFetcher>,
        current: Option<Job>,
        callbacks: &Arc<Callbacks>,
    ) -> PollSession {
        let done = Arc::clone(callbacks);
        let timed_out = Arc::clone(callbacks);
        poller.start(
            "assessment-7",
            current,
            |job: &Job| job.done,
            move |job| done.completed.lock().push(job),
            move |timeout| timed_out.timeouts.lock().push((timeout, Instant::now())),
        )
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_on_first_complete_tick() {
        let poller = ResultPoller::new(
            ScriptedFetcher::new(vec![Ok(Job { done: false }), Ok(Job { done: true })]),
            PollerConfig::default(),
        );
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, None, &callbacks);
        assert_eq!(session.state(), PollState::Polling);

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;

        assert_eq!(session.state(), PollState::Completed);
        assert_eq!(*callbacks.completed.lock(), vec![Job { done: true }]);
        assert_eq!(poller.fetcher().calls(), 2);
        assert_eq!(poller.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_times_out() {
        let config = PollerConfig {
            interval: Duration::ZERO,
            timeout: Duration::from_secs(30),
        };
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), config);
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, None, &callbacks);
        assert_eq!(session.interval(), MIN_POLL_INTERVAL);

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;

        assert_eq!(session.state(), PollState::TimedOut);
        assert_eq!(callbacks.timeouts.lock().len(), 1);
        assert_eq!(poller.active_sessions(), 0);
        assert!(poller.fetcher().calls() <= 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_complete_skips_polling() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, Some(Job { done: true }), &callbacks);

        // Callback ran before start returned
        assert_eq!(callbacks.completed.lock().len(), 1);
        assert_eq!(session.state(), PollState::Completed);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(poller.fetcher().calls(), 0);
        assert_eq!(poller.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_current_still_polls() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, Some(Job { done: false }), &callbacks);

        assert_eq!(session.state(), PollState::Polling);
        assert!(callbacks.completed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_live_session() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());

        let first = start(&poller, None, &callbacks);
        let second = start(&poller, None, &callbacks);

        assert_eq!(first.state(), PollState::Cancelled);
        assert_eq!(second.state(), PollState::Polling);
        assert_eq!(poller.active_sessions(), 1);
        assert!(poller.session("assessment-7").unwrap().same_session(&second));

        // Only the second session fetches
        tokio::time::sleep(Duration::from_secs(16)).await;
        settle().await;
        assert_eq!(poller.fetcher().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());
        let started = Instant::now();

        let session = start(&poller, None, &callbacks);

        tokio::time::sleep(Duration::from_secs(179)).await;
        settle().await;
        assert_eq!(session.state(), PollState::Polling);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(session.state(), PollState::TimedOut);
        let timeouts = callbacks.timeouts.lock();
        assert_eq!(timeouts.len(), 1);
        assert!(timeouts[0].1 - started >= Duration::from_secs(180));
        assert_eq!(timeouts[0].0.resource_id, "assessment-7");
        assert!(callbacks.completed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_depend_on_tick_count() {
        let poller = ResultPoller::new(
            ScriptedFetcher::never_done(),
            PollerConfig::default().with_interval(Duration::from_secs(100)),
        );
        let callbacks = Arc::new(Callbacks::default());
        let started = Instant::now();

        start(&poller, None, &callbacks);
        tokio::time::sleep(Duration::from_secs(250)).await;
        settle().await;

        let timeouts = callbacks.timeouts.lock();
        assert_eq!(timeouts.len(), 1);
        let fired_after = timeouts[0].1 - started;
        assert!(fired_after >= Duration::from_secs(180));
        assert!(fired_after < Duration::from_secs(200));
        assert_eq!(poller.fetcher().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_is_bounded_by_deadline() {
        let poller = ResultPoller::new(
            ScriptedFetcher::slow(Duration::from_secs(1000)),
            PollerConfig::default(),
        );
        let callbacks = Arc::new(Callbacks::default());
        let started = Instant::now();

        let session = start(&poller, None, &callbacks);
        tokio::time::sleep(Duration::from_secs(200)).await;
        settle().await;

        assert_eq!(session.state(), PollState::TimedOut);
        let fired_after = callbacks.timeouts.lock()[0].1 - started;
        assert!(fired_after < Duration::from_secs(190));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_swallowed() {
        let poller = ResultPoller::new(
            ScriptedFetcher::new(vec![
                Err(PollError::Transient("502".to_string())),
                Err(PollError::NotFound("assessment-7".to_string())),
                Ok(Job { done: true }),
            ]),
            PollerConfig::default(),
        );
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, None, &callbacks);
        tokio::time::sleep(Duration::from_secs(46)).await;
        settle().await;

        assert_eq!(session.state(), PollState::Completed);
        assert_eq!(poller.fetcher().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, None, &callbacks);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(poller.cancel(&session));
        tokio::time::sleep(Duration::from_secs(300)).await;
        settle().await;

        assert_eq!(session.state(), PollState::Cancelled);
        assert_eq!(poller.fetcher().calls(), 1);
        assert!(callbacks.timeouts.lock().is_empty());
        assert_eq!(poller.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_terminal_session_is_noop() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, Some(Job { done: true }), &callbacks);

        assert!(!poller.cancel(&session));
        assert!(!poller.cancel(&session));
        assert_eq!(session.state(), PollState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_sessions() {
        let poller = ResultPoller::new(ScriptedFetcher::never_done(), PollerConfig::default());
        let callbacks = Arc::new(Callbacks::default());

        let session = start(&poller, None, &callbacks);
        drop(poller);
        tokio::time::sleep(Duration::from_secs(300)).await;
        settle().await;

        assert_eq!(session.state(), PollState::Cancelled);
        assert!(callbacks.timeouts.lock().is_empty());
    }
}
