//! Single-use result sinks handed to workers.
//!
//! A [`ResultSink`] is consumed by its completion call, so a worker can report
//! at most once per `start()`. Dropping a sink without calling it is allowed
//! after cancellation.

use std::fmt;
use std::sync::Arc;

use crate::domain::Releasable;

use super::dispatch::{Completion, DispatchError, Dispatcher};
use super::token::{RequestToken, RequestTracker};

/// Completion handle for one worker invocation.
pub struct ResultSink<V> {
    token: RequestToken,
    tracker: Arc<RequestTracker>,
    dispatcher: Arc<dyn Dispatcher<V>>,
}

impl<V> ResultSink<V> {
    pub(crate) fn new(token: RequestToken, tracker: Arc<RequestTracker>, dispatcher: Arc<dyn Dispatcher<V>>) -> Self {
        Self {
            token,
            tracker,
            dispatcher,
        }
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// `true` while this sink's request is still the outstanding one.
    ///
    /// Advisory only: a worker may use it to stop early, but the answer can
    /// change the moment it is returned.
    pub fn is_current(&self) -> bool {
        self.tracker.outstanding() == Some(self.token)
    }
}

impl<V: Releasable + 'static> ResultSink<V> {
    /// Report the loaded value. Callable from any thread.
    pub fn on_result(self, value: V) {
        self.complete(Some(Arc::new(value)));
    }

    /// Report completion without a value.
    pub fn on_empty(self) {
        self.complete(None);
    }

    fn complete(self, value: Option<Arc<V>>) {
        let token = self.token;
        let completion = if self.tracker.settle(token) {
            Completion::Deliver { token, value }
        } else {
            tracing::debug!(request = %token, "Completion arrived for a canceled request");
            Completion::Cancel { token, value }
        };

        if let Err(DispatchError(completion)) = self.dispatcher.post(completion) {
            // Nobody is left to own the value, so release it here.
            tracing::warn!(request = %token, "Control context closed; releasing result on worker thread");
            if let Some(value) = completion.into_value() {
                if !value.is_released() {
                    value.release();
                }
            }
        }
    }
}

impl<V> fmt::Debug for ResultSink<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink").field("token", &self.token).finish()
    }
}
