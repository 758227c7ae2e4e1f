//! Crate-wide error type and result alias.

use thiserror::Error;

/// Closed set of failure modes surfaced by the engine. Mirrors the small,
/// enumerable result codes used throughout the rendering pipeline rather
/// than a free-form error chain, since callers (canvas, saver, builder)
/// need to match on specific causes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("insufficient condition: {0}")]
    InsufficientCondition(String),

    #[error("failed to allocate resources: {0}")]
    FailedAllocation(String),

    #[error("memory corruption detected: {0}")]
    MemoryCorruption(String),

    #[error("operation not supported: {0}")]
    NonSupport(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = core::result::Result<T, Error>;
