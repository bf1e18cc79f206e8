//! Per-generation readiness signal.
//!
//! A group member is ready while it holds an assignment. The gate is armed
//! again after every revocation, so callers waiting for readiness block
//! until the next grant instead of observing a stale signal from an earlier
//! generation.

use std::fmt;
use tokio::sync::watch;

use crate::error::{Error, Result};

/// Membership state of one coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Waiting for the broker to grant an assignment
    Joining,
    /// Holding an assignment for the given generation
    Active { generation: u64 },
    /// Assignment revoked; the restart loop has not rejoined yet
    Rebalancing,
    /// Closed for good
    Closed,
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupState::Joining => write!(f, "joining"),
            GroupState::Active { generation } => write!(f, "active (generation {generation})"),
            GroupState::Rebalancing => write!(f, "rebalancing"),
            GroupState::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug)]
pub struct ReadyGate {
    state: watch::Sender<GroupState>,
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyGate {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(GroupState::Joining),
        }
    }

    pub fn state(&self) -> GroupState {
        *self.state.borrow()
    }

    /// Observe every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.state.subscribe()
    }

    pub fn mark_ready(&self, generation: u64) {
        self.transition(|state| match state {
            GroupState::Closed => None,
            _ => Some(GroupState::Active { generation }),
        });
    }

    pub fn revoke(&self) {
        self.transition(|state| match state {
            GroupState::Active { .. } => Some(GroupState::Rebalancing),
            _ => None,
        });
    }

    /// Re-arm the gate for the next generation.
    pub fn reset(&self) {
        self.transition(|state| match state {
            GroupState::Closed | GroupState::Joining => None,
            _ => Some(GroupState::Joining),
        });
    }

    /// Closed is terminal: later transitions are ignored.
    pub fn close(&self) {
        self.transition(|state| match state {
            GroupState::Closed => None,
            _ => Some(GroupState::Closed),
        });
    }

    /// Wait until the member holds an assignment and return its generation.
    ///
    /// Returns [`Error::Closed`] if the gate is closed first.
    pub async fn wait_ready(&self) -> Result<u64> {
        let mut receiver = self.state.subscribe();
        let state = *receiver
            .wait_for(|state| matches!(state, GroupState::Active { .. } | GroupState::Closed))
            .await
            .map_err(|_| Error::Closed)?;

        match state {
            GroupState::Active { generation } => Ok(generation),
            _ => Err(Error::Closed),
        }
    }

    fn transition(&self, next: impl FnOnce(GroupState) -> Option<GroupState>) {
        self.state.send_if_modified(|state| match next(*state) {
            Some(to) if to != *state => {
                tracing::debug!("Consumer group state: {state} -> {to}");
                *state = to;
                true
            }
            _ => false,
        });
    }
}
