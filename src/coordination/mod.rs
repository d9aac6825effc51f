//! Worker/coordinator rendezvous
//!
//! Implements the cancellation-race protocol between the control context and
//! worker threads: request tokens, the mutex-guarded outstanding slot,
//! single-use result sinks, and the dispatch boundary.

pub mod dispatch;
pub mod sink;
pub mod token;

pub use dispatch::{Completion, DispatchError, Dispatcher, channel};
pub use sink::ResultSink;
pub use token::{RequestToken, RequestTracker};
