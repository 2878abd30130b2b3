//! The locked core: Entry Table, Recency Order, Hot-Key Set, Access
//! Log, and global accounting, plus the admission/eviction gate that
//! ties them together (§4.G).
//!
//! Every method here assumes the caller already holds the engine's
//! lock; `Engine` and `Batch` are the only callers, and neither
//! re-enters a method of this type while already inside one, so a
//! plain `parking_lot::Mutex` (rather than a reentrant lock) is
//! sufficient — see SPEC_FULL.md §5.

use bytes::Bytes;
use std::time::Instant;

use crate::access_log::AccessLog;
use crate::arena::EntryArena;
use crate::codec;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::hotset::HotKeySet;
use crate::policy::Policy;

/// Why an entry was expired, for the Sweeper/`get` tracing events.
#[derive(Debug, Clone, Copy)]
enum ExpiryReason {
    Ttl,
    Tti,
    MaxAccess,
}

impl std::fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ttl => write!(f, "ttl"),
            Self::Tti => write!(f, "tti"),
            Self::MaxAccess => write!(f, "max_access"),
        }
    }
}

/// Runtime knobs adjustable via `configure_adaptive_behavior`.
#[derive(Debug, Clone)]
pub struct AdaptiveParams {
    /// Minimum logical size (bytes) to consider compression.
    pub compression_threshold: usize,
    /// Maximum `compressed/logical` ratio to accept compression.
    pub compression_ratio_target: f64,
    /// Windowed accesses to qualify as hot.
    pub hot_key_threshold: usize,
    /// Whether the Sweeper invokes the Preload Hint Provider.
    pub enable_predictive_loading: bool,
}

/// The engine's locked state: everything mutated by `get`/`put`/the
/// Sweeper lives here.
pub struct State {
    pub(crate) arena: EntryArena,
    pub(crate) hot: HotKeySet,
    pub(crate) access_log: AccessLog,
    pub(crate) memory_limit: usize,
    pub(crate) current_memory_usage: usize,
    pub(crate) params: AdaptiveParams,
}

impl State {
    pub(crate) fn new(memory_limit: usize, params: AdaptiveParams) -> Self {
        Self {
            arena: EntryArena::new(),
            hot: HotKeySet::new(),
            access_log: AccessLog::new(),
            memory_limit,
            current_memory_usage: 0,
            params,
        }
    }

    /// §4.C `get`: returns the uncompressed value if resident and not
    /// expired, recording the access and promoting recency.
    pub(crate) fn get(&mut self, key: &str) -> Result<Option<Bytes>> {
        let now = Instant::now();

        let Some(handle) = self.arena.handle_of(key) else {
            return Ok(None);
        };

        if let Some(reason) = Self::expiry_reason(self.arena.entry(handle).unwrap(), now) {
            tracing::debug!(key = %key, reason = %reason, "expiring entry on get");
            self.delete(key);
            return Ok(None);
        }

        self.access_log.record(key, now);
        self.arena.move_to_back(handle);
        if self.hot.contains(key) {
            self.hot.move_to_back(key);
        }

        let entry = self.arena.entry_mut(handle).unwrap();
        entry.last_access_at = now;

        let entry = self.arena.entry(handle).unwrap();
        let value = if entry.compressed {
            codec::decompress(&entry.payload)?
        } else {
            entry.payload.clone()
        };
        Ok(Some(value))
    }

    /// §4.C `put`: encodes, admits, and installs a new entry.
    pub(crate) fn put(&mut self, key: &str, value: &[u8], policy: Option<Policy>) -> Result<()> {
        self.put_collecting_evictions(key, value, policy, None)
    }

    /// Same as `put`, but appends every entry evicted to make room —
    /// aside from `key` itself when replacing an existing value — to
    /// `victims`, as `(key, decompressed value, policy)`. `Batch::commit`
    /// (§4.I) uses this so a rollback can restore keys outside the batch
    /// that one of the batch's own writes displaced, not just the
    /// batch's own keys.
    pub(crate) fn put_collecting_evictions(
        &mut self,
        key: &str,
        value: &[u8],
        policy: Option<Policy>,
        victims: Option<&mut Vec<(String, Bytes, Option<Policy>)>>,
    ) -> Result<()> {
        let encoded = codec::encode(
            value,
            self.params.compression_threshold,
            self.params.compression_ratio_target,
        )?;

        // Replacing an existing key frees its old accounting before
        // admission runs, matching idempotent re-puts (§8 property 4).
        if self.arena.handle_of(key).is_some() {
            self.delete(key);
        }

        self.evict_to_fit(encoded.stored_size, victims)?;

        let now = Instant::now();
        let entry = Entry {
            payload: encoded.bytes,
            compressed: encoded.compressed,
            logical_size: encoded.logical_size,
            stored_size: encoded.stored_size,
            policy,
            created_at: now,
            last_access_at: now,
        };

        debug_assert!(entry.payload_len_matches_stored_size());
        let stored_size = entry.stored_size;
        let compressed = entry.compressed;
        self.current_memory_usage += stored_size;
        self.arena.push_back(key.to_string(), entry);

        debug_assert!(self.current_memory_usage <= self.memory_limit);
        tracing::debug!(key = %key, stored_size, compressed, "admitted entry");
        Ok(())
    }

    /// §4.B `refresh_policy`: replaces the policy and renews `created_at`.
    pub(crate) fn refresh_policy(&mut self, key: &str, policy: Policy) -> Result<()> {
        let handle = self
            .arena
            .handle_of(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let now = Instant::now();
        let entry = self.arena.entry_mut(handle).unwrap();
        entry.policy = Some(policy);
        entry.created_at = now;
        self.access_log.record(key, now);
        Ok(())
    }

    /// §4.C `delete` (internal): removes a key from every structure
    /// and decrements accounting.
    pub(crate) fn delete(&mut self, key: &str) {
        if let Some(entry) = self.arena.remove(key) {
            self.current_memory_usage -= entry.stored_size;
            tracing::trace!(key = %key, stored_size = entry.stored_size, "removed entry");
        }
        self.hot.demote(key);
        self.access_log.remove(key);
    }

    /// Snapshots a still-resident key as a restorable victim: its
    /// decompressed value and policy, for `Batch::commit`'s rollback.
    fn snapshot_for_rollback(&self, key: &str) -> Option<(String, Bytes, Option<Policy>)> {
        let handle = self.arena.handle_of(key)?;
        let entry = self.arena.entry(handle)?;
        let value = if entry.compressed {
            codec::decompress(&entry.payload).ok()?
        } else {
            entry.payload.clone()
        };
        Some((key.to_string(), value, entry.policy))
    }

    /// §4.G Admission & Eviction: frees `needed` additional bytes (on
    /// top of whatever is already installed) or fails with
    /// `OverCapacity` without mutating state. The key about to be
    /// installed has already been removed from the arena by `put` if
    /// it pre-existed, so it can never be the one popped here.
    ///
    /// When `victims` is given, every key this pass evicts is snapshotted
    /// into it before deletion, so a caller (`Batch::commit`) can restore
    /// them later.
    fn evict_to_fit(
        &mut self,
        needed: usize,
        mut victims: Option<&mut Vec<(String, Bytes, Option<Policy>)>>,
    ) -> Result<()> {
        if needed > self.memory_limit {
            return Err(Error::OverCapacity {
                requested: needed,
                limit: self.memory_limit,
            });
        }

        while self.current_memory_usage + needed > self.memory_limit {
            let Some(head_key) = self.arena.pop_front_key() else {
                // Recency Order empty but memory still over budget:
                // nothing left to reclaim.
                return Err(Error::OverCapacity {
                    requested: needed,
                    limit: self.memory_limit,
                });
            };

            if !self.hot.contains(&head_key) {
                tracing::debug!(key = %head_key, "evicting cold entry to admit write");
                if let Some(v) = victims.as_mut() {
                    if let Some(snapshot) = self.snapshot_for_rollback(&head_key) {
                        v.push(snapshot);
                    }
                }
                self.delete(&head_key);
                continue;
            }

            // Hot key. If every currently resident key is hot, rotation
            // can never expose a cold victim: force-evict the oldest
            // promotion instead. Otherwise a cold key still exists
            // elsewhere in the recency order, so protect this one by
            // rotating it to the tail and keep scanning.
            if self.hot.len() == self.arena.len() {
                let forced_key = self
                    .hot
                    .oldest()
                    .expect("hot set non-empty: hot.len() == arena.len() > 0")
                    .to_string();
                tracing::debug!(
                    key = %forced_key,
                    "force-evicting oldest hot entry: all residents are hot"
                );
                if let Some(v) = victims.as_mut() {
                    if let Some(snapshot) = self.snapshot_for_rollback(&forced_key) {
                        v.push(snapshot);
                    }
                }
                self.delete(&forced_key);
            } else {
                let handle = self.arena.handle_of(&head_key).unwrap();
                self.arena.move_to_back(handle);
            }
        }

        Ok(())
    }

    /// Time-based expiration only (TTL/TTI). `max_access` is enforced
    /// exclusively by the Sweeper (§4.H), which is the only component
    /// that maintains a trimmed windowed count; checking it here would
    /// require trimming on every `get`, duplicating that bookkeeping.
    fn expiry_reason(entry: &Entry, now: Instant) -> Option<ExpiryReason> {
        let policy = entry.policy?;
        if policy.is_unbounded() {
            return None;
        }
        if let Some(ttl) = policy.ttl() {
            if now.duration_since(entry.created_at) > ttl {
                return Some(ExpiryReason::Ttl);
            }
        }
        if let Some(tti) = policy.tti() {
            if now.duration_since(entry.last_access_at) > tti {
                return Some(ExpiryReason::Tti);
            }
        }
        None
    }

    /// Top-`n` keys by windowed access count, most-accessed first.
    pub(crate) fn most_accessed(&self, n: usize) -> Vec<(String, usize)> {
        if self.arena.is_empty() || n == 0 {
            return Vec::new();
        }

        let mut counts: Vec<(String, usize)> = self
            .access_log
            .keys()
            .filter(|k| self.arena.handle_of(k).is_some())
            .map(|k| (k.to_string(), self.access_log.count(k)))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        counts
    }

    /// §4.H sweep pass: trims the Access Log, reclassifies hot/cold
    /// membership, and expires entries whose TTL/TTI/max-access has
    /// elapsed. Returns the keys expired by this pass, for the
    /// Sweeper's log line.
    ///
    /// Per the algorithm order in §4.H, the max-access check (step d)
    /// reads the windowed count as it stood before this pass's trim
    /// (step e) — i.e. as of the previous sweep plus whatever was
    /// recorded since. This matches the reference behavior rather than
    /// trimming first and under-counting recently-expired windows.
    pub(crate) fn sweep_pass(&mut self) -> Vec<String> {
        if self.arena.is_empty() {
            return Vec::new();
        }

        let now = Instant::now();
        let keys: Vec<String> = self.access_log.keys().map(str::to_string).collect();

        let mut to_expire = Vec::new();
        let mut to_drop_log = Vec::new();

        for key in &keys {
            let Some(handle) = self.arena.handle_of(key) else {
                // Resident entry is already gone; its access log series
                // outlived it and can be dropped.
                to_drop_log.push(key.clone());
                continue;
            };

            let entry = self.arena.entry(handle).unwrap();
            let mut reason = Self::expiry_reason(entry, now);

            if reason.is_none() {
                if let Some(max_access) = entry.policy.and_then(|p| p.max_access()) {
                    if self.access_log.count(key) >= max_access {
                        reason = Some(ExpiryReason::MaxAccess);
                    }
                }
            }

            if let Some(reason) = reason {
                tracing::debug!(key = %key, reason = %reason, "expiring entry on sweep");
                to_expire.push(key.clone());
                continue;
            }

            let windowed = self.access_log.trim_and_count(key, now);
            if windowed >= self.params.hot_key_threshold {
                self.hot.promote(key);
            } else if self.hot.contains(key) {
                self.hot.demote(key);
            }

            if windowed == 0 {
                to_drop_log.push(key.clone());
            }
        }

        for key in &to_expire {
            self.delete(key);
        }
        for key in &to_drop_log {
            self.access_log.remove(key);
        }

        to_expire
    }

    /// Installs a Preload Hint Provider suggestion if (and only if) the
    /// key is not already resident — preloading must never clobber live
    /// data or disturb its recency/hot status (§4.H).
    pub(crate) fn install_if_absent(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if self.arena.handle_of(key).is_some() {
            return Ok(());
        }
        self.put(key, value, None)
    }
}
