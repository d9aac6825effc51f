//! Lifecycle coordination
//!
//! The Coordinator decides deliver-or-discard for every result and owns the
//! release obligation for the current one. The driver runs a coordinator on
//! its own tokio task so hosts can talk to it through a cloneable handle.

mod coordinator;
mod driver;
mod host;

pub use coordinator::{Coordinator, Host, LoaderConfig, LoaderStats};
pub use driver::{Command, LoaderHandle, spawn};
pub use host::{ChannelHost, HostEvent};
