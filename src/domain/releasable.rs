//! Values that carry an explicit release obligation.
//!
//! A loaded value is shared between the coordinator and the host as `Arc<V>`,
//! so release goes through `&self`. Whether a value may be released twice is
//! up to the value; the coordinator never asks it to.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A loaded value with a release obligation.
///
/// The two states are Not Released and Released. `release` moves a value from
/// the first to the second.
pub trait Releasable: Send + Sync {
    /// `true` once the value no longer holds anything that needs releasing.
    fn is_released(&self) -> bool;

    /// Discharge the release obligation.
    fn release(&self);
}

/// A value with no resource needs. Always reports itself as released.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Plain<T>(pub T);

impl<T> Plain<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Send + Sync> Releasable for Plain<T> {
    fn is_released(&self) -> bool {
        true
    }

    fn release(&self) {}
}

type ReleaseHook<T> = Box<dyn FnOnce(T) + Send>;

/// An owned resource that is dropped (or handed to a hook) on release.
///
/// Use this for RAII values such as file handles, buffers or native handles:
/// `release` takes the value out of its slot and drops it, after which
/// [`Resource::with`] returns `None`.
pub struct Resource<T> {
    slot: Mutex<Option<T>>,
    on_release: Mutex<Option<ReleaseHook<T>>>,
}

impl<T> Resource<T> {
    /// Wrap a live value; release drops it.
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
            on_release: Mutex::new(None),
        }
    }

    /// Wrap a live value; release hands it to `hook` instead of dropping it.
    pub fn with_release<F>(value: T, hook: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            slot: Mutex::new(Some(value)),
            on_release: Mutex::new(Some(Box::new(hook))),
        }
    }

    /// Run `f` against the live value. `None` after release.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.lock_slot().as_ref().map(f)
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send> Releasable for Resource<T> {
    fn is_released(&self) -> bool {
        self.lock_slot().is_none()
    }

    fn release(&self) {
        let Some(value) = self.lock_slot().take() else {
            return;
        };
        let hook = self.on_release.lock().unwrap_or_else(PoisonError::into_inner).take();
        match hook {
            Some(hook) => hook(value),
            None => drop(value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(value) => f.debug_tuple("Resource").field(value).finish(),
                None => f.write_str("Resource(<released>)"),
            },
            Err(_) => f.write_str("Resource(<poisoned>)"),
        }
    }
}
