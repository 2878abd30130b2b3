//! The stored record for one cache key.

use bytes::Bytes;
use std::time::Instant;

use crate::policy::Policy;

/// One resident cache entry.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Raw or compressed bytes, per `compressed`.
    pub payload: Bytes,
    /// Whether `payload` holds DEFLATE-compressed data.
    pub compressed: bool,
    /// Uncompressed payload size in bytes.
    pub logical_size: usize,
    /// Bytes this entry contributes to `current_memory_usage`.
    pub stored_size: usize,
    /// Expiration contract, if any.
    pub policy: Option<Policy>,
    /// Monotonic timestamp of the last `put` for this key.
    pub created_at: Instant,
    /// Monotonic timestamp of the most recent read or write.
    pub last_access_at: Instant,
}

impl Entry {
    /// True if a DEFLATE decode error would indicate engine corruption
    /// rather than caller error (debug-time invariant check, §3.4).
    #[must_use]
    pub fn payload_len_matches_stored_size(&self) -> bool {
        self.payload.len() == self.stored_size
    }
}
