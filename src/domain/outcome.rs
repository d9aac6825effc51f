//! Load outcome types.
//!
//! A load either produces data or an error. Errors are data too: the
//! coordinator delivers and releases an error-bearing result exactly like a
//! successful one.

use super::releasable::{Plain, Releasable};

/// Outcome of a single load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult<D, E> {
    /// The load produced data
    Data(D),
    /// The load failed
    Error(E),
}

impl<D, E> LoadResult<D, E> {
    /// Borrow the data, if any.
    pub fn data(&self) -> Option<&D> {
        match self {
            LoadResult::Data(data) => Some(data),
            LoadResult::Error(_) => None,
        }
    }

    /// Borrow the error, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            LoadResult::Data(_) => None,
            LoadResult::Error(err) => Some(err),
        }
    }

    pub fn has_error(&self) -> bool {
        matches!(self, LoadResult::Error(_))
    }

    pub fn into_result(self) -> Result<D, E> {
        match self {
            LoadResult::Data(data) => Ok(data),
            LoadResult::Error(err) => Err(err),
        }
    }
}

impl<D, E> From<Result<D, E>> for LoadResult<D, E> {
    fn from(result: Result<D, E>) -> Self {
        match result {
            Ok(data) => LoadResult::Data(data),
            Err(err) => LoadResult::Error(err),
        }
    }
}

// An error carries nothing to release.
impl<D, E> Releasable for LoadResult<D, E>
where
    D: Releasable,
    E: Send + Sync,
{
    fn is_released(&self) -> bool {
        match self {
            LoadResult::Data(data) => data.is_released(),
            LoadResult::Error(_) => true,
        }
    }

    fn release(&self) {
        if let LoadResult::Data(data) = self {
            data.release();
        }
    }
}

/// Result for plain data with a catch-all error. Never needs releasing.
pub type SimpleResult<D> = LoadResult<Plain<D>, eyre::Report>;

impl<D> LoadResult<Plain<D>, eyre::Report> {
    pub fn ok(data: D) -> Self {
        LoadResult::Data(Plain(data))
    }

    pub fn failed(err: impl Into<eyre::Report>) -> Self {
        LoadResult::Error(err.into())
    }
}
