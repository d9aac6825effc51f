//! Error types for loadcycle
//!
//! Centralized error handling using thiserror. Coordinator operations are
//! infallible; only the control-task handle and config validation return these.

use thiserror::Error;

/// All error types that can occur in loadcycle
#[derive(Debug, Error)]
pub enum LoadcycleError {
    /// The control task that owns the coordinator has ended
    #[error("Control context closed")]
    ControlClosed,

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias for loadcycle operations
pub type Result<T> = std::result::Result<T, LoadcycleError>;
