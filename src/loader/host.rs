//! Channel-backed host surface.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::coordinator::Host;

/// What a [`ChannelHost`] forwards to its receiver.
pub enum HostEvent<V> {
    /// A fresh or re-delivered result
    Loaded(Option<Arc<V>>),
    /// A load was abandoned
    Canceled,
}

impl<V> fmt::Debug for HostEvent<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEvent::Loaded(value) => f.debug_tuple("Loaded").field(&value.is_some()).finish(),
            HostEvent::Canceled => f.write_str("Canceled"),
        }
    }
}

/// Forwards deliveries to a channel so a UI task can observe them.
///
/// Values sent here are read-only views; the coordinator keeps the release
/// obligation.
pub struct ChannelHost<V> {
    tx: mpsc::UnboundedSender<HostEvent<V>>,
}

impl<V> ChannelHost<V> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent<V>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<V: Send + Sync> Host<V> for ChannelHost<V> {
    fn on_load_complete(&mut self, value: Option<Arc<V>>) {
        if self.tx.send(HostEvent::Loaded(value)).is_err() {
            tracing::trace!("Host receiver dropped; delivery not observed");
        }
    }

    fn on_load_canceled(&mut self) {
        let _ = self.tx.send(HostEvent::Canceled);
    }
}
