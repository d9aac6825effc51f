//! Loads completed by code outside the coordinator's control.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::coordination::ResultSink;

use super::Worker;

/// A worker whose loads are finished by an external party.
///
/// `start` parks the sink; whoever produces the value (a native callback, an
/// event source, a test) takes it with [`ExternalWorker::take_sink`] and
/// completes it from any thread.
pub struct ExternalWorker<V> {
    parked: Mutex<VecDeque<ResultSink<V>>>,
    starts: AtomicUsize,
    cancels: AtomicUsize,
}

impl<V> ExternalWorker<V> {
    pub fn new() -> Self {
        Self {
            parked: Mutex::new(VecDeque::new()),
            starts: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    /// Oldest sink not yet handed out.
    pub fn take_sink(&self) -> Option<ResultSink<V>> {
        self.parked().pop_front()
    }

    /// Most recent sink, discarding any older ones still parked.
    pub fn take_latest(&self) -> Option<ResultSink<V>> {
        let mut parked = self.parked();
        let latest = parked.pop_back();
        parked.clear();
        latest
    }

    pub fn pending(&self) -> usize {
        self.parked().len()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn parked(&self) -> MutexGuard<'_, VecDeque<ResultSink<V>>> {
        self.parked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> Default for ExternalWorker<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Worker<V> for ExternalWorker<V> {
    fn start(&self, sink: ResultSink<V>) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.parked().push_back(sink);
    }

    // Parked sinks stay parked: the external party may still report.
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
