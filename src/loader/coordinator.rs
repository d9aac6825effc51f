//! Lifecycle coordinator
//!
//! The Coordinator owns the current result slot and mediates between the
//! host's start/stop/reset intent and the worker's asynchronous completions.
//! Everything here runs on the control context; the only cross-thread state
//! is the request tracker shared with outstanding sinks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::coordination::{Completion, Dispatcher, RequestToken, RequestTracker, ResultSink, channel};
use crate::domain::Releasable;
use crate::error::{LoadcycleError, Result};
use crate::worker::Worker;

/// The host-side surface a coordinator delivers into.
pub trait Host<V>: Send {
    /// A fresh or re-delivered result. The host may read and keep `value`
    /// but must not release it; the coordinator still owns that.
    fn on_load_complete(&mut self, value: Option<Arc<V>>);

    /// A load ended without a deliverable result.
    fn on_load_canceled(&mut self) {}
}

/// Configuration for a Coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Name used to label log events
    pub name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            name: "loader".to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LoadcycleError::Config("loader name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Counters describing what a coordinator has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Worker invocations issued
    pub loads_started: u64,
    /// Values forwarded to the host, re-deliveries included
    pub delivered: u64,
    /// Cached values re-delivered on start
    pub redelivered: u64,
    /// Completions routed to the discard path
    pub canceled: u64,
    /// Release calls made by the coordinator
    pub released: u64,
}

#[derive(Debug, Default)]
struct LoaderFlags {
    started: bool,
    reset: bool,
    content_changed: bool,
}

/// Coordinates one worker, one host and one current result.
pub struct Coordinator<V, W, H>
where
    V: Releasable + 'static,
    W: Worker<V>,
    H: Host<V>,
{
    config: LoaderConfig,
    worker: W,
    host: H,
    tracker: Arc<RequestTracker>,
    dispatcher: Arc<dyn Dispatcher<V>>,
    completions: Option<mpsc::UnboundedReceiver<Completion<V>>>,
    current: Option<Arc<V>>,
    flags: LoaderFlags,
    stats: LoaderStats,
}

impl<V, W, H> Coordinator<V, W, H>
where
    V: Releasable + 'static,
    W: Worker<V>,
    H: Host<V>,
{
    /// Create a coordinator with its own completion channel.
    ///
    /// Completions queue up until [`Coordinator::run_pending`] drains them,
    /// or until [`crate::loader::spawn`] takes the channel over.
    pub fn new(worker: W, host: H) -> Self {
        let (tx, rx) = channel();
        let mut coordinator = Self::with_dispatcher(worker, host, Arc::new(tx));
        coordinator.completions = Some(rx);
        coordinator
    }

    /// Create a coordinator that posts completions through `dispatcher`.
    /// The caller routes them back via [`Coordinator::handle_completion`].
    pub fn with_dispatcher(worker: W, host: H, dispatcher: Arc<dyn Dispatcher<V>>) -> Self {
        Self {
            config: LoaderConfig::default(),
            worker,
            host,
            tracker: Arc::new(RequestTracker::new()),
            dispatcher,
            completions: None,
            current: None,
            flags: LoaderFlags::default(),
            stats: LoaderStats::default(),
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Host became active: re-deliver the cached result, then load if the
    /// content changed while stopped or nothing is cached.
    pub fn on_start(&mut self) {
        if self.flags.reset {
            tracing::debug!(loader = %self.config.name, "Start ignored after reset");
            return;
        }
        self.flags.started = true;

        if let Some(current) = self.current.clone() {
            self.stats.redelivered += 1;
            self.deliver_result(Some(current));
        }

        if self.take_content_changed() || self.current.is_none() {
            self.force_load();
        }
    }

    /// Host went inactive: cancel the outstanding load, keep the cached result.
    pub fn on_stop(&mut self) {
        self.flags.started = false;
        self.cancel_load();
    }

    /// Tear down: cancel, release the cached result, and refuse further loads.
    pub fn on_reset(&mut self) {
        self.cancel_load();

        if let Some(current) = self.current.take() {
            self.release(&current);
        }
        self.flags.reset = true;
        self.flags.started = false;
        self.flags.content_changed = false;
        tracing::debug!(loader = %self.config.name, "Loader reset");
    }

    /// The input to loading changed. Reloads now if started, otherwise the
    /// change is latched for the next start.
    pub fn on_content_changed(&mut self) {
        if self.flags.reset {
            return;
        }
        if self.flags.started {
            self.force_load();
        } else {
            self.flags.content_changed = true;
        }
    }

    /// Cancel whatever is outstanding and issue exactly one new `start()`.
    pub fn force_load(&mut self) {
        if self.flags.reset {
            tracing::debug!(loader = %self.config.name, "Load ignored after reset");
            return;
        }
        self.cancel_load();

        let token = self.tracker.begin();
        self.stats.loads_started += 1;
        tracing::debug!(loader = %self.config.name, request = %token, "Starting load");
        let sink = ResultSink::new(token, self.tracker.clone(), self.dispatcher.clone());
        self.worker.start(sink);
    }

    /// Cancel the outstanding load. `false` if nothing was outstanding.
    pub fn cancel_load(&mut self) -> bool {
        match self.tracker.cancel() {
            Some(token) => {
                tracing::debug!(loader = %self.config.name, request = %token, "Canceling load");
                self.worker.cancel();
                true
            }
            None => false,
        }
    }

    /// Make `value` the current result, forward it if started, and release
    /// the result it supersedes.
    pub fn deliver_result(&mut self, value: Option<Arc<V>>) {
        if self.flags.reset {
            if let Some(value) = value {
                tracing::debug!(loader = %self.config.name, "Discarding result delivered after reset");
                self.release(&value);
            }
            return;
        }

        let old = std::mem::replace(&mut self.current, value.clone());

        if self.flags.started {
            self.stats.delivered += 1;
            self.host.on_load_complete(value.clone());
        }

        if let Some(old) = old {
            let same = value.as_ref().is_some_and(|value| Arc::ptr_eq(value, &old));
            if !same {
                self.release(&old);
            }
        }
    }

    /// Discard path for a load that lost the race with cancellation.
    pub fn on_canceled(&mut self, value: Option<Arc<V>>) {
        self.stats.canceled += 1;
        if let Some(value) = value {
            self.release(&value);
        }
        if !self.flags.reset {
            self.host.on_load_canceled();
        }
    }

    /// Entry point for completions crossing the dispatch boundary.
    pub fn handle_completion(&mut self, completion: Completion<V>) {
        match completion {
            Completion::Deliver { token, value } => {
                tracing::debug!(loader = %self.config.name, request = %token, "Load completed");
                self.deliver_result(value);
            }
            Completion::Cancel { token, value } => {
                tracing::debug!(loader = %self.config.name, request = %token, "Stale completion discarded");
                self.on_canceled(value);
            }
        }
    }

    /// Run every queued completion on the current thread. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.completions.as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            let Some(completion) = next else {
                break;
            };
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Reset, stop accepting completions, and discard whatever was queued.
    pub fn shutdown(&mut self) {
        self.on_reset();
        if let Some(mut rx) = self.completions.take() {
            self.drain_closed(&mut rx);
        }
    }

    /// Close `rx` and run what is left in it. Sinks posting afterwards see a
    /// closed control context and release their values themselves.
    pub(crate) fn drain_closed(&mut self, rx: &mut mpsc::UnboundedReceiver<Completion<V>>) {
        rx.close();
        while let Ok(completion) = rx.try_recv() {
            self.handle_completion(completion);
        }
    }

    /// Hand the completion channel to an external control loop.
    pub(crate) fn take_completions(&mut self) -> Option<mpsc::UnboundedReceiver<Completion<V>>> {
        self.completions.take()
    }

    pub fn is_started(&self) -> bool {
        self.flags.started
    }

    pub fn is_reset(&self) -> bool {
        self.flags.reset
    }

    pub fn is_content_changed(&self) -> bool {
        self.flags.content_changed
    }

    pub fn current(&self) -> Option<&Arc<V>> {
        self.current.as_ref()
    }

    pub fn outstanding(&self) -> Option<RequestToken> {
        self.tracker.outstanding()
    }

    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn take_content_changed(&mut self) -> bool {
        std::mem::take(&mut self.flags.content_changed)
    }

    fn release(&mut self, value: &Arc<V>) {
        if !value.is_released() {
            value.release();
            self.stats.released += 1;
        }
    }
}

impl<V, W, H> Drop for Coordinator<V, W, H>
where
    V: Releasable + 'static,
    W: Worker<V>,
    H: Host<V>,
{
    fn drop(&mut self) {
        if !self.flags.reset || self.completions.is_some() {
            self.shutdown();
        }
    }
}
