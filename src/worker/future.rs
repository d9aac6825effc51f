//! Async loads raced against cancellation.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::coordination::ResultSink;
use crate::domain::Releasable;

use super::Worker;

/// Spawns an async load on a tokio runtime.
///
/// If cancellation wins the race the load future is dropped and the sink is
/// completed empty, which the coordinator reports to the host as a canceled
/// load. A value the future already produced is never lost: it goes through
/// the sink and is released there if it arrived too late.
pub struct AsyncWorker<V, F> {
    runtime: Handle,
    load: Arc<F>,
    in_flight: Mutex<Option<CancellationToken>>,
    _value: PhantomData<fn() -> V>,
}

impl<V, F, Fut> AsyncWorker<V, F>
where
    V: Releasable + 'static,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<V>> + Send + 'static,
{
    pub fn new(runtime: Handle, load: F) -> Self {
        Self {
            runtime,
            load: Arc::new(load),
            in_flight: Mutex::new(None),
            _value: PhantomData,
        }
    }
}

impl<V, F, Fut> Worker<V> for AsyncWorker<V, F>
where
    V: Releasable + 'static,
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<V>> + Send + 'static,
{
    fn start(&self, sink: ResultSink<V>) {
        let cancel = CancellationToken::new();
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(cancel.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let load = (*self.load)(cancel.clone());
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                value = load => match value {
                    Some(value) => sink.on_result(value),
                    None => sink.on_empty(),
                },
                _ = cancel.cancelled() => {
                    tracing::debug!(request = %sink.token(), "Async load dropped after cancel");
                    sink.on_empty();
                }
            }
        });
    }

    fn cancel(&self) {
        if let Some(cancel) = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take() {
            cancel.cancel();
        }
    }
}
