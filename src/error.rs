//! Error taxonomy shared by every runtime operation.
//!
//! Each variant carries a short static description of the check that failed.
//! All checks run before any state is touched, so an `Err` always means the
//! call had no effect.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a [`Platform`](crate::Platform) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlatformError {
    message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors returned by the runtime API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A bad argument: invalid tag, out-of-range timer ID, negative timeout.
    #[error("invalid parameter: {0}")]
    Parameter(&'static str),

    /// A fixed-capacity pool is exhausted. The caller may retry later.
    #[error("resource exhausted: {0}")]
    Resource(&'static str),

    /// Wrong lifecycle phase, or a usage conflict such as booking two stack
    /// mutations between applies.
    #[error("invalid status: {0}")]
    Status(&'static str),

    /// An expected, recoverable failure, e.g. popping when only the root remains.
    #[error("operation failed: {0}")]
    Failure(&'static str),

    /// Passed through unchanged from the platform layer.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}
