use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::error::RefreshError;

/// What a refresh settles to: the new access token, or why there is none.
pub(crate) type RefreshOutcome = Result<String, RefreshError>;

/// Single-flight gate for token refresh.
///
/// The first caller to [`enter`](RefreshGate::enter) leads; everyone arriving
/// while it is in flight queues behind it and receives the same outcome, in
/// arrival order. The in-flight flag and the queue are cleared together under
/// one lock.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

pub(crate) enum Ticket<'a> {
    /// Caller must run the refresh and settle the guard.
    Leader(FlightGuard<'a>),
    /// Caller waits for the leader's outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshGate {
    pub(crate) fn enter(&self) -> Ticket<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            Ticket::Follower(rx)
        } else {
            state.in_flight = true;
            Ticket::Leader(FlightGuard {
                gate: self,
                settled: false,
            })
        }
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
    }

    pub(crate) fn waiting(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
            .len()
    }

    fn release(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let count = waiters.len();
        for waiter in waiters {
            // a waiter whose request was dropped no longer cares
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Held by the refresh leader. Releases the gate exactly once: through
/// [`settle`](FlightGuard::settle), or with [`RefreshError::Abandoned`] on drop.
pub(crate) struct FlightGuard<'a> {
    gate: &'a RefreshGate,
    settled: bool,
}

impl FlightGuard<'_> {
    /// Hands `outcome` to every queued waiter. Returns how many were released.
    pub(crate) fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        self.gate.release(outcome)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh dropped before settling; releasing waiters");
            self.gate.release(&Err(RefreshError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(gate: &RefreshGate) -> FlightGuard<'_> {
        match gate.enter() {
            Ticket::Leader(guard) => guard,
            Ticket::Follower(_) => panic!("expected to lead"),
        }
    }

    fn follower(gate: &RefreshGate) -> oneshot::Receiver<RefreshOutcome> {
        match gate.enter() {
            Ticket::Follower(rx) => rx,
            Ticket::Leader(_) => panic!("expected to follow"),
        }
    }

    #[tokio::test]
    async fn followers_share_leader_outcome() {
        let gate = RefreshGate::default();
        let guard = leader(&gate);
        let first = follower(&gate);
        let second = follower(&gate);
        assert!(gate.is_in_flight());
        assert_eq!(gate.waiting(), 2);

        assert_eq!(guard.settle(&Ok("new".into())), 2);
        assert!(!gate.is_in_flight());
        assert_eq!(first.await.unwrap(), Ok("new".to_string()));
        assert_eq!(second.await.unwrap(), Ok("new".to_string()));
    }

    #[tokio::test]
    async fn failure_reaches_every_follower() {
        let gate = RefreshGate::default();
        let guard = leader(&gate);
        let rx = follower(&gate);

        guard.settle(&Err(RefreshError::MissingRefreshToken));
        assert_eq!(rx.await.unwrap(), Err(RefreshError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn dropped_leader_abandons_waiters() {
        let gate = RefreshGate::default();
        let guard = leader(&gate);
        let rx = follower(&gate);

        drop(guard);
        assert!(!gate.is_in_flight());
        assert_eq!(rx.await.unwrap(), Err(RefreshError::Abandoned));
    }

    #[test]
    fn next_caller_leads_after_settle() {
        let gate = RefreshGate::default();
        leader(&gate).settle(&Ok("t".into()));
        let again = leader(&gate);
        assert_eq!(again.settle(&Ok("t2".into())), 0);
    }

    #[tokio::test]
    async fn dropped_follower_does_not_block_release() {
        let gate = RefreshGate::default();
        let guard = leader(&gate);
        drop(follower(&gate));
        let kept = follower(&gate);

        assert_eq!(guard.settle(&Ok("x".into())), 2);
        assert_eq!(kept.await.unwrap(), Ok("x".to_string()));
    }
}
