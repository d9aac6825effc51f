//! Domain types for loadcycle
//!
//! This module contains the value types the coordinator manages:
//! - Releasable: a loaded value with a release obligation
//! - Plain / Resource: stock releasable wrappers
//! - LoadResult: tagged data-or-error outcome of a load

pub mod outcome;
pub mod releasable;

pub use outcome::{LoadResult, SimpleResult};
pub use releasable::{Plain, Releasable, Resource};
