//! Workers perform the actual load.
//!
//! The coordinator calls [`Worker::start`] and [`Worker::cancel`] from the
//! control context, never while holding the request-tracker lock, so a worker
//! is free to complete its sink synchronously from either call.

mod external;
mod future;
mod task;

use std::sync::Arc;

use crate::coordination::ResultSink;

pub use external::ExternalWorker;
pub use future::AsyncWorker;
pub use task::TaskWorker;

/// Performs one load per `start()`.
pub trait Worker<V>: Send + Sync {
    /// Begin a load. The worker reports through `sink` at most once, on any
    /// thread.
    fn start(&self, sink: ResultSink<V>);

    /// Ask the in-flight load to stop. Advisory: the worker may still
    /// complete the sink, and the coordinator will discard that value.
    fn cancel(&self);
}

impl<V, W> Worker<V> for Arc<W>
where
    W: Worker<V> + ?Sized,
{
    fn start(&self, sink: ResultSink<V>) {
        (**self).start(sink)
    }

    fn cancel(&self) {
        (**self).cancel()
    }
}
