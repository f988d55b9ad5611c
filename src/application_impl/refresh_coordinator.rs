use crate::application_port::ApiError;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

pub type RefreshResult = Result<String, ApiError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshResult>>,
}

/// Single-flight gate for token refresh. The first caller to claim becomes
/// the leader; everyone arriving before it settles queues up and receives the
/// leader's outcome, in arrival order.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

pub enum Claim<'a> {
    Leader(LeaderGuard<'a>),
    Waiter(oneshot::Receiver<RefreshResult>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-set happens under one lock, before any await.
    pub fn claim(&self) -> Claim<'_> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            Claim::Waiter(rx)
        } else {
            state.in_flight = true;
            Claim::Leader(LeaderGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight
    }

    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiters
            .len()
    }

    fn settle(&self, result: RefreshResult) {
        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        tracing::debug!(waiters = waiters.len(), ok = result.is_ok(), "refresh settled");
        for waiter in waiters {
            // a waiter that went away no longer cares
            let _ = waiter.send(result.clone());
        }
    }
}

/// Held by the leader. Dropping it unsettled fails every waiter.
pub struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    pub fn settle(mut self, result: RefreshResult) {
        self.settled = true;
        self.coordinator.settle(result);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator
                .settle(Err(ApiError::internal("token refresh abandoned")));
        }
    }
}

/// Resolves a queued claim. A dropped sender reads as an abandoned refresh.
pub async fn wait_for(rx: oneshot::Receiver<RefreshResult>) -> RefreshResult {
    rx.await
        .unwrap_or_else(|_| Err(ApiError::internal("token refresh abandoned")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_receive_the_leader_result_in_order() {
        let coordinator = RefreshCoordinator::new();
        let Claim::Leader(leader) = coordinator.claim() else {
            panic!("first claim must lead");
        };
        let mut receivers = Vec::new();
        for _ in 0..3 {
            match coordinator.claim() {
                Claim::Waiter(rx) => receivers.push(rx),
                Claim::Leader(_) => panic!("only one leader"),
            }
        }
        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.waiting(), 3);

        leader.settle(Ok("new".into()));
        assert!(!coordinator.is_refreshing());
        for rx in receivers {
            assert_eq!(wait_for(rx).await.unwrap(), "new");
        }
        assert!(matches!(coordinator.claim(), Claim::Leader(_)));
    }

    #[tokio::test]
    async fn dropped_leader_fails_waiters() {
        let coordinator = RefreshCoordinator::new();
        let leader = coordinator.claim();
        let Claim::Waiter(rx) = coordinator.claim() else {
            panic!("second claim must wait");
        };
        drop(leader);
        assert!(wait_for(rx).await.is_err());
        assert!(!coordinator.is_refreshing());
    }
}
