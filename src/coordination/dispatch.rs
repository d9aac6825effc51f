//! The dispatch boundary between worker contexts and the control context.
//!
//! Workers finish on whatever thread they like. Their outcome is wrapped in a
//! [`Completion`] and posted through a [`Dispatcher`], which runs completions
//! in FIFO order on the single control context that also serves the host's
//! start/stop/reset calls.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use super::token::RequestToken;

/// Outcome of one worker invocation, already decided under the tracker lock.
pub enum Completion<V> {
    /// The request was still outstanding: deliver the value.
    Deliver {
        token: RequestToken,
        value: Option<Arc<V>>,
    },
    /// The request was canceled or superseded: discard and release the value.
    Cancel {
        token: RequestToken,
        value: Option<Arc<V>>,
    },
}

impl<V> Completion<V> {
    pub fn token(&self) -> RequestToken {
        match self {
            Completion::Deliver { token, .. } | Completion::Cancel { token, .. } => *token,
        }
    }

    pub fn is_deliver(&self) -> bool {
        matches!(self, Completion::Deliver { .. })
    }

    pub fn value(&self) -> Option<&Arc<V>> {
        match self {
            Completion::Deliver { value, .. } | Completion::Cancel { value, .. } => value.as_ref(),
        }
    }

    pub fn into_value(self) -> Option<Arc<V>> {
        match self {
            Completion::Deliver { value, .. } | Completion::Cancel { value, .. } => value,
        }
    }
}

impl<V> fmt::Debug for Completion<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_deliver() { "Deliver" } else { "Cancel" };
        f.debug_struct(kind)
            .field("token", &self.token())
            .field("has_value", &self.value().is_some())
            .finish()
    }
}

/// Returned when the control context no longer accepts completions.
/// Carries the completion back so its value can still be released.
#[derive(Error)]
#[error("control context closed, dropped {0:?}")]
pub struct DispatchError<V>(pub Completion<V>);

impl<V> fmt::Debug for DispatchError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DispatchError").field(&self.0).finish()
    }
}

/// Posts completions to the control context, in order.
pub trait Dispatcher<V>: Send + Sync {
    fn post(&self, completion: Completion<V>) -> Result<(), DispatchError<V>>;
}

impl<V: Send + Sync> Dispatcher<V> for mpsc::UnboundedSender<Completion<V>> {
    fn post(&self, completion: Completion<V>) -> Result<(), DispatchError<V>> {
        self.send(completion).map_err(|mpsc::error::SendError(c)| DispatchError(c))
    }
}

/// Build the stock channel-backed dispatch boundary.
pub fn channel<V>() -> (mpsc::UnboundedSender<Completion<V>>, mpsc::UnboundedReceiver<Completion<V>>) {
    mpsc::unbounded_channel()
}
