//! Batch Transaction (§4.I): buffers `put` calls and applies them
//! atomically under a single lock acquisition on commit.

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;
use crate::policy::Policy;
use crate::state::State;

/// A scoped group of pending writes.
///
/// Buffered `put`s are invisible to every other observer — including
/// `get`s issued by the same caller on the owning `Engine` — until
/// [`Batch::commit`] applies them all while holding the engine lock
/// continuously. Dropping a `Batch` without committing discards it
/// with no side effects.
pub struct Batch<'a> {
    state: &'a Mutex<State>,
    pending: Vec<(String, Bytes, Option<Policy>)>,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(state: &'a Mutex<State>) -> Self {
        Self {
            state,
            pending: Vec::new(),
        }
    }

    /// Buffers a write; takes effect only once [`Batch::commit`] succeeds.
    pub fn put(&mut self, key: impl Into<String>, value: Bytes, policy: Option<Policy>) {
        self.pending.push((key.into(), value, policy));
    }

    /// Number of writes buffered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if no writes have been buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applies every buffered write under one lock acquisition.
    ///
    /// On the first admission failure, already-applied writes from this
    /// same commit are rolled back, along with every non-batch key that
    /// one of those writes evicted to make room — restored with its
    /// original value and policy — so observers never see any side
    /// effect of a failed batch (§4.I).
    ///
    /// # Errors
    ///
    /// Returns the first [`crate::Error::OverCapacity`] encountered; no
    /// buffered write after that point is attempted.
    pub fn commit(self) -> Result<()> {
        let mut guard = self.state.lock();
        let mut applied = Vec::with_capacity(self.pending.len());
        let mut evicted = Vec::new();

        for (key, value, policy) in self.pending {
            match guard.put_collecting_evictions(&key, &value, policy, Some(&mut evicted)) {
                Ok(()) => applied.push(key),
                Err(e) => {
                    for key in applied.into_iter().rev() {
                        guard.delete(&key);
                    }
                    for (key, value, policy) in evicted.into_iter().rev() {
                        let _ = guard.put(&key, &value, policy);
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AdaptiveParams;

    fn params() -> AdaptiveParams {
        AdaptiveParams {
            compression_threshold: 1024,
            compression_ratio_target: 0.7,
            hot_key_threshold: 100,
            enable_predictive_loading: false,
        }
    }

    #[test]
    fn committed_batch_installs_every_write() {
        let state = Mutex::new(State::new(1024, params()));
        let mut batch = Batch::new(&state);
        batch.put("a", Bytes::from_static(b"1"), None);
        batch.put("b", Bytes::from_static(b"2"), None);
        batch.commit().unwrap();

        let mut guard = state.lock();
        assert_eq!(guard.get("a").unwrap().as_deref(), Some(b"1".as_slice()));
        assert_eq!(guard.get("b").unwrap().as_deref(), Some(b"2".as_slice()));
    }

    #[test]
    fn uncommitted_batch_has_no_effect() {
        let state = Mutex::new(State::new(1024, params()));
        {
            let mut batch = Batch::new(&state);
            batch.put("a", Bytes::from_static(b"1"), None);
        } // dropped without commit

        let mut guard = state.lock();
        assert_eq!(guard.get("a").unwrap(), None);
    }

    #[test]
    fn failed_commit_leaves_no_partial_effects() {
        // Capacity fits exactly one of the two buffered writes.
        let state = Mutex::new(State::new(1, params()));
        let mut batch = Batch::new(&state);
        batch.put("a", Bytes::from_static(b"1"), None);
        batch.put("b", Bytes::from_static(b"22"), None);

        assert!(batch.commit().is_err());

        let mut guard = state.lock();
        assert_eq!(guard.get("a").unwrap(), None);
        assert_eq!(guard.get("b").unwrap(), None);
    }

    #[test]
    fn failed_commit_restores_keys_evicted_by_the_batchs_own_writes() {
        // Capacity holds exactly one 5-byte entry.
        let state = Mutex::new(State::new(5, params()));
        {
            let mut guard = state.lock();
            guard.put("pre", b"aaaaa", None).unwrap();
        }

        let mut batch = Batch::new(&state);
        // "a" admits by evicting the pre-existing "pre" (not part of
        // the batch) since both are 5 bytes against a 5-byte ceiling.
        batch.put("a", Bytes::from_static(b"bbbbb"), None);
        // This write can never fit regardless of eviction, forcing a
        // rollback of everything committed so far.
        batch.put("too-big", Bytes::from_static(b"0123456789"), None);

        assert!(batch.commit().is_err());

        let mut guard = state.lock();
        assert_eq!(guard.get("a").unwrap(), None);
        assert_eq!(guard.get("too-big").unwrap(), None);
        assert_eq!(guard.get("pre").unwrap().as_deref(), Some(b"aaaaa".as_slice()));
    }
}
