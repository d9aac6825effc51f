//! Async control context for a Coordinator.
//!
//! `spawn` moves a coordinator onto a tokio task that becomes its control
//! context. Host commands and worker completions each arrive over their own
//! FIFO channel and are applied one at a time, so the coordinator itself never
//! sees concurrent calls.

use std::future;

use tokio::sync::{mpsc, oneshot};

use crate::coordination::Completion;
use crate::domain::Releasable;
use crate::error::{LoadcycleError, Result};
use crate::worker::Worker;

use super::coordinator::{Coordinator, Host, LoaderStats};

/// Host lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Reset,
    ContentChanged,
    ForceLoad,
}

enum Message {
    Command(Command),
    Stats(oneshot::Sender<LoaderStats>),
    Shutdown(oneshot::Sender<LoaderStats>),
}

/// Cloneable handle to a coordinator running on its control task.
#[derive(Clone)]
pub struct LoaderHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl LoaderHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(Message::Command(command))
            .map_err(|_| LoadcycleError::ControlClosed)
    }

    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    pub fn content_changed(&self) -> Result<()> {
        self.send(Command::ContentChanged)
    }

    pub fn force_load(&self) -> Result<()> {
        self.send(Command::ForceLoad)
    }

    /// Snapshot of the coordinator's counters, taken on the control task
    /// after every command sent before this call.
    pub async fn stats(&self) -> Result<LoaderStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Stats(reply))
            .map_err(|_| LoadcycleError::ControlClosed)?;
        rx.await.map_err(|_| LoadcycleError::ControlClosed)
    }

    /// Reset the coordinator, drain queued completions, and stop the task.
    /// Returns the final counters.
    pub async fn shutdown(self) -> Result<LoaderStats> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Shutdown(reply))
            .map_err(|_| LoadcycleError::ControlClosed)?;
        rx.await.map_err(|_| LoadcycleError::ControlClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Run `coordinator` on a new tokio task. Must be called inside a runtime.
///
/// Dropping every handle shuts the task down the same way `shutdown` does.
pub fn spawn<V, W, H>(coordinator: Coordinator<V, W, H>) -> LoaderHandle
where
    V: Releasable + 'static,
    W: Worker<V> + 'static,
    H: Host<V> + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(coordinator, rx));
    LoaderHandle { tx }
}

async fn run<V, W, H>(mut coordinator: Coordinator<V, W, H>, mut commands: mpsc::UnboundedReceiver<Message>)
where
    V: Releasable + 'static,
    W: Worker<V>,
    H: Host<V>,
{
    let mut completions = coordinator.take_completions();
    if completions.is_none() {
        tracing::warn!(
            loader = %coordinator.config().name,
            "Coordinator has an external dispatcher; only host commands will be served"
        );
    }
    tracing::debug!(loader = %coordinator.config().name, "Control task started");

    let reply = loop {
        tokio::select! {
            message = commands.recv() => match message {
                Some(Message::Command(command)) => apply(&mut coordinator, command),
                Some(Message::Stats(reply)) => {
                    let _ = reply.send(coordinator.stats());
                }
                Some(Message::Shutdown(reply)) => break Some(reply),
                None => break None,
            },
            Some(completion) = next_completion(&mut completions) => {
                coordinator.handle_completion(completion);
            }
        }
    };

    coordinator.on_reset();
    if let Some(rx) = completions.as_mut() {
        coordinator.drain_closed(rx);
    }
    let stats = coordinator.stats();
    tracing::debug!(
        loader = %coordinator.config().name,
        loads = stats.loads_started,
        released = stats.released,
        "Control task finished"
    );
    if let Some(reply) = reply {
        let _ = reply.send(stats);
    }
}

fn apply<V, W, H>(coordinator: &mut Coordinator<V, W, H>, command: Command)
where
    V: Releasable + 'static,
    W: Worker<V>,
    H: Host<V>,
{
    match command {
        Command::Start => coordinator.on_start(),
        Command::Stop => coordinator.on_stop(),
        Command::Reset => coordinator.on_reset(),
        Command::ContentChanged => coordinator.on_content_changed(),
        Command::ForceLoad => coordinator.force_load(),
    }
}

async fn next_completion<V>(rx: &mut Option<mpsc::UnboundedReceiver<Completion<V>>>) -> Option<Completion<V>> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}
