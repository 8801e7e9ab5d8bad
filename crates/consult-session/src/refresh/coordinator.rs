//! Single-flight refresh gate
//!
//! The first caller that needs a new access token starts the refresh; it and everyone
//! arriving while it is in flight queue a continuation and are settled with the same
//! outcome, in arrival order. The refresh itself is owned by a [`LeaderGuard`] that
//! the caller hands to a background task, so dropping any caller never drops it.

use consult_common::RefreshError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome shared with every queued caller
pub type RefreshOutcome = Result<String, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    /// Bumped by `reset`; a leader from an older generation is ignored when it settles
    generation: u64,
    queue: VecDeque<Waiter>,
}

/// Coordinates token refreshes so at most one is outstanding
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// What a caller must do after asking to refresh
pub enum Ticket {
    /// Run the refresh with the guard (off the caller's future) and wait like a follower
    Leader(LeaderGuard, Waiting),
    /// Wait for the refresh already in flight
    Follower(Waiting),
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh or start a new one
    pub fn begin(self: &Arc<Self>) -> Ticket {
        let mut state = self.state.lock();
        let (tx, rx) = oneshot::channel();
        state.queue.push_back(tx);
        let waiting = Waiting { rx };

        if state.in_flight {
            tracing::trace!(queued = state.queue.len(), "Queued behind in-flight refresh");
            return Ticket::Follower(waiting);
        }

        state.in_flight = true;
        Ticket::Leader(
            LeaderGuard {
                coordinator: Arc::clone(self),
                generation: state.generation,
                settled: false,
            },
            waiting,
        )
    }

    /// Abandon any in-flight refresh and reject every queued caller with `SessionEnded`
    ///
    /// Returns the number of callers rejected.
    pub fn reset(&self) -> usize {
        self.abort(&RefreshError::SessionEnded)
    }

    /// Abandon any in-flight refresh and reject every queued caller with `err`
    ///
    /// A leader already in flight is superseded: its eventual result is discarded.
    pub fn abort(&self, err: &RefreshError) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            state.in_flight = false;
            state.generation = state.generation.wrapping_add(1);
            std::mem::take(&mut state.queue)
        };

        let count = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(Err(err.clone()));
        }

        if count > 0 {
            tracing::debug!(rejected = count, reason = %err, "Refresh queue rejected");
        }
        count
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Number of callers waiting on the in-flight refresh, including the one that started it
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn finish(
        &self,
        generation: u64,
        outcome: RefreshOutcome,
        commit: impl FnOnce(&RefreshOutcome),
    ) -> RefreshOutcome {
        let waiters = {
            let mut state = self.state.lock();
            if state.generation != generation {
                tracing::debug!("Discarding refresh result after reset");
                return Err(RefreshError::SessionEnded);
            }
            // Commit under the gate so a concurrent reset cannot interleave with it.
            commit(&outcome);
            state.in_flight = false;
            std::mem::take(&mut state.queue)
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        outcome
    }
}

/// Ownership of the in-flight refresh
///
/// Dropping it unsettled (the refresh task panicked or the runtime shut down) rejects
/// the queue with [`RefreshError::Cancelled`].
pub struct LeaderGuard {
    coordinator: Arc<RefreshCoordinator>,
    generation: u64,
    settled: bool,
}

impl LeaderGuard {
    /// Publish the refresh outcome
    ///
    /// `commit` runs before any queued caller is woken, and only if no reset happened
    /// since this refresh started; otherwise the outcome is replaced by `SessionEnded`.
    pub fn settle(
        mut self,
        outcome: RefreshOutcome,
        commit: impl FnOnce(&RefreshOutcome),
    ) -> RefreshOutcome {
        self.settled = true;
        self.coordinator.finish(self.generation, outcome, commit)
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self
                .coordinator
                .finish(self.generation, Err(RefreshError::Cancelled), |_| {});
        }
    }
}

/// A queued continuation
pub struct Waiting {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl Waiting {
    /// Suspend until the in-flight refresh settles
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(Err(RefreshError::Cancelled))
    }
}
