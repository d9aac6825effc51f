//! loadcycle - lifecycle coordination for loads with releasable results
//!
//! A Coordinator sits between a host that starts, stops and resets loads and
//! a worker that performs them on its own thread. It keeps at most one load
//! in flight, delivers at most one current result, and makes sure every
//! result it stops using is released exactly once.

pub mod coordination;
pub mod domain;
pub mod error;
pub mod loader;
pub mod worker;

pub use coordination::{Completion, Dispatcher, RequestToken, ResultSink};
pub use domain::{LoadResult, Plain, Releasable, Resource, SimpleResult};
pub use error::{LoadcycleError, Result};
pub use loader::{ChannelHost, Coordinator, Host, HostEvent, LoaderConfig, LoaderHandle, LoaderStats};
pub use worker::{AsyncWorker, ExternalWorker, TaskWorker, Worker};
