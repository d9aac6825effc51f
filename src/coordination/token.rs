//! Request identity and the outstanding-request slot.
//!
//! Every `start()` handed to a worker gets a fresh [`RequestToken`]. The
//! [`RequestTracker`] remembers which token is outstanding; a completion wins
//! only if its token still occupies the slot when it settles.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Generation number identifying one worker invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    next: u64,
    outstanding: Option<RequestToken>,
}

/// Mutex-guarded slot holding the token of the outstanding request.
///
/// The lock is held only for the compare/swap itself, never across a worker
/// or dispatcher call.
#[derive(Debug, Default)]
pub struct RequestTracker {
    state: Mutex<TrackerState>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new outstanding request, superseding any previous one.
    pub fn begin(&self) -> RequestToken {
        let mut state = self.lock();
        state.next += 1;
        let token = RequestToken(state.next);
        state.outstanding = Some(token);
        token
    }

    /// Clear the slot. Returns the token that was outstanding, if any.
    pub fn cancel(&self) -> Option<RequestToken> {
        self.lock().outstanding.take()
    }

    /// Compare-and-clear: `true` if `token` was still outstanding.
    pub fn settle(&self, token: RequestToken) -> bool {
        let mut state = self.lock();
        if state.outstanding == Some(token) {
            state.outstanding = None;
            true
        } else {
            false
        }
    }

    pub fn outstanding(&self) -> Option<RequestToken> {
        self.lock().outstanding
    }

    // State is two plain integers; a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
