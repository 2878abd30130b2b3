//! Error types for the adaptive cache.
//!
//! This module provides a unified error type for all engine operations.
//! Error codes follow the pattern `CACHE-XXX` for easy debugging.

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A `put` could not be admitted even after exhaustive eviction
    /// (CACHE-001).
    #[error("[CACHE-001] cache is over capacity: cannot admit {requested} bytes into a {limit}-byte ceiling")]
    OverCapacity {
        /// Bytes the rejected write would have consumed.
        requested: usize,
        /// Configured memory ceiling.
        limit: usize,
    },

    /// `refresh_policy` was issued for a key that is not resident
    /// (CACHE-002).
    #[error("[CACHE-002] key '{0}' not found")]
    NotFound(String),

    /// Compression or decompression failed (CACHE-003).
    #[error("[CACHE-003] codec failure: {0}")]
    CodecFailure(String),

    /// An operation was issued after `shutdown()` (CACHE-004).
    #[error("[CACHE-004] engine has been shut down")]
    Shutdown,
}

impl Error {
    /// Returns the stable error code (e.g. `"CACHE-001"`).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OverCapacity { .. } => "CACHE-001",
            Self::NotFound(_) => "CACHE-002",
            Self::CodecFailure(_) => "CACHE-003",
            Self::Shutdown => "CACHE-004",
        }
    }

    /// Returns true if a caller can usefully retry this operation
    /// (e.g. against a fresh engine, or with a smaller payload).
    /// `CodecFailure` is fatal for the operation that produced it: the
    /// payload that failed to encode/decode will fail the same way on
    /// retry, so it is not recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::CodecFailure(_))
    }
}
