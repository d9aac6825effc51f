//! Blocking loads on the tokio blocking pool.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::coordination::ResultSink;
use crate::domain::Releasable;

use super::Worker;

/// Runs a blocking load closure on the runtime's blocking pool.
///
/// The closure receives a [`CancellationToken`] it may poll to stop early.
/// Whatever it returns is reported, even after cancellation; the coordinator
/// releases values from canceled requests.
pub struct TaskWorker<V, F> {
    runtime: Handle,
    load: Arc<F>,
    in_flight: Mutex<Option<CancellationToken>>,
    _value: PhantomData<fn() -> V>,
}

impl<V, F> TaskWorker<V, F>
where
    V: Releasable + 'static,
    F: Fn(&CancellationToken) -> Option<V> + Send + Sync + 'static,
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

impl<V, F> Worker<V> for TaskWorker<V, F>
where
    V: Releasable + 'static,
    F: Fn(&CancellationToken) -> Option<V> + Send + Sync + 'static,
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

        let load = self.load.clone();
        tracing::debug!(request = %sink.token(), "Spawning blocking load");
        self.runtime.spawn_blocking(move || match (*load)(&cancel) {
            Some(value) => sink.on_result(value),
            None => sink.on_empty(),
        });
    }

    fn cancel(&self) {
        if let Some(cancel) = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take() {
            cancel.cancel();
        }
    }
}
