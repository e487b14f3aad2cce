// src/engine/timing.rs

//! When a profile run should stop.
//!
//! A [`ProfileTiming`] is created by the caller before the run and is the
//! executor's stopping oracle: the executor polls [`ProfileTiming::is_timed_out`]
//! while event handlers and a background watcher decide when to flip it. Once timed out, it stays timed out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::{EventBus, SubscriptionId};
use crate::errors::{AgentError, Result};
use crate::types::DeterminismScope;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// About thirty years. Deadlines further out than this are clamped to it.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + duration`, clamped to [`FAR_FUTURE`] instead of overflowing.
pub fn deadline_after(start: Instant, duration: Duration) -> Instant {
    start
        .checked_add(duration)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Sentinel iteration count meaning "no limit".
pub const UNLIMITED_ITERATIONS: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMode {
    /// Never times out; the run ends only on external cancellation.
    Forever,
    /// Times out once this many iterations completed. `None` is unlimited.
    Iterations(Option<u64>),
    /// Times out at `deadline`, honoured at the boundary given by `determinism`.
    Deadline {
        deadline: Instant,
        duration: Duration,
        determinism: DeterminismScope,
    },
}

#[derive(Debug, Default)]
struct TimingState {
    timed_out: AtomicBool,
    iterations: AtomicU64,
}

impl TimingState {
    fn mark_timed_out(&self) {
        if !self.timed_out.swap(true, Ordering::SeqCst) {
            debug!("profile timing reached its limit");
        }
    }
}

/// Clones share state, so a clone handed to the executor observes the same
/// timeout as the caller's copy.
#[derive(Debug, Clone)]
pub struct ProfileTiming {
    mode: TimingMode,
    poll_interval: Duration,
    state: Arc<TimingState>,
}

impl ProfileTiming {
    fn with_mode(mode: TimingMode) -> Self {
        Self {
            mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: Arc::new(TimingState::default()),
        }
    }

    pub fn forever() -> Self {
        Self::with_mode(TimingMode::Forever)
    }

    /// Stop after `iterations` rounds of actions. Must be `> 0`, or
    /// [`UNLIMITED_ITERATIONS`].
    pub fn iterations(iterations: i64) -> Result<Self> {
        match iterations {
            UNLIMITED_ITERATIONS => Ok(Self::with_mode(TimingMode::Iterations(None))),
            n if n > 0 => Ok(Self::with_mode(TimingMode::Iterations(Some(n as u64)))),
            n => Err(AgentError::InvalidTiming(format!(
                "Invalid profile iterations value. The value provided '{n}' must be greater than zero, or equal to -1."
            ))),
        }
    }

    pub fn one_iteration() -> Self {
        Self::with_mode(TimingMode::Iterations(Some(1)))
    }

    /// Stop once `duration` from now has elapsed, checked continuously.
    pub fn timeout(duration: Duration) -> Self {
        Self::with_mode(TimingMode::Deadline {
            deadline: deadline_after(Instant::now(), duration),
            duration,
            determinism: DeterminismScope::None,
        })
    }

    /// Stop once `duration` from now has elapsed, honoured only at an action
    /// or iteration boundary.
    pub fn deterministic_timeout(duration: Duration, determinism: DeterminismScope) -> Self {
        Self::with_mode(TimingMode::Deadline {
            deadline: deadline_after(Instant::now(), duration),
            duration,
            determinism,
        })
    }

    /// Stop at an absolute instant (which may already have passed).
    pub fn deadline_at(deadline: Instant, determinism: DeterminismScope) -> Self {
        let duration = deadline.saturating_duration_since(Instant::now());
        Self::with_mode(TimingMode::Deadline {
            deadline,
            duration,
            determinism,
        })
    }

    /// Override the 500 ms polling resolution.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn mode(&self) -> TimingMode {
        self.mode
    }

    pub fn is_timed_out(&self) -> bool {
        self.state.timed_out.load(Ordering::SeqCst)
    }

    /// Iterations observed through `IterationEnd` so far.
    pub fn iteration_count(&self) -> u64 {
        self.state.iterations.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.mode {
            TimingMode::Deadline { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self.mode {
            TimingMode::Deadline { duration, .. } => Some(duration),
            _ => None,
        }
    }

    pub fn determinism(&self) -> DeterminismScope {
        match self.mode {
            TimingMode::Deadline { determinism, .. } => determinism,
            _ => DeterminismScope::None,
        }
    }

    /// Register the event handler the mode needs, if any.
    ///
    /// Iteration counting and the deterministic deadlines are driven by
    /// `IterationEnd`/`ActionEnd`; the other modes do not subscribe.
    pub fn subscribe(&self, events: &EventBus) -> Option<SubscriptionId> {
        let state = Arc::clone(&self.state);
        match self.mode {
            TimingMode::Iterations(limit) => Some(events.subscribe(move |event| {
                if event.is_iteration_end() {
                    let count = state.iterations.fetch_add(1, Ordering::SeqCst) + 1;
                    if limit.is_some_and(|n| count >= n) {
                        state.mark_timed_out();
                    }
                }
            })),

            TimingMode::Deadline {
                deadline,
                determinism: DeterminismScope::AllActions,
                ..
            } => Some(events.subscribe(move |event| {
                if event.is_iteration_end() {
                    state.iterations.fetch_add(1, Ordering::SeqCst);
                    if Instant::now() >= deadline {
                        state.mark_timed_out();
                    }
                }
            })),

            TimingMode::Deadline {
                deadline,
                determinism: DeterminismScope::IndividualAction,
                ..
            } => Some(events.subscribe(move |event| {
                if event.is_action_end() && Instant::now() >= deadline {
                    state.mark_timed_out();
                }
            })),

            _ => None,
        }
    }

    /// Wait until timed out or until `cancel` fires.
    ///
    /// For a plain deadline this is also what flips the flag.
    pub async fn wait_for_timeout(&self, cancel: &CancellationToken) {
        match self.mode {
            TimingMode::Forever => cancel.cancelled().await,

            TimingMode::Deadline {
                deadline,
                determinism: DeterminismScope::None,
                ..
            } => {
                while !cancel.is_cancelled() {
                    if Instant::now() >= deadline {
                        self.state.mark_timed_out();
                        break;
                    }
                    self.pause(cancel).await;
                }
            }

            _ => self.wait_for_flag(cancel).await,
        }
    }

    /// Background watcher: [`subscribe`](Self::subscribe), then
    /// [`wait_for_timeout`](Self::wait_for_timeout), then unsubscribe.
    pub async fn monitor_timeout(&self, events: &EventBus, cancel: &CancellationToken) {
        let subscription = self.subscribe(events);
        self.wait_for_timeout(cancel).await;
        if let Some(id) = subscription {
            events.unsubscribe(id);
        }
    }

    async fn wait_for_flag(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() && !self.is_timed_out() {
            self.pause(cancel).await;
        }
    }

    async fn pause(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
