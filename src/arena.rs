//! Entry Table + Recency Order.
//!
//! The source expressed these as a hash map plus a pointer-linked
//! queue, which creates a reference cycle (entry ↔ recency node ↔
//! hot-set membership). Here both are backed by a single arena of
//! slots addressed by a stable integer handle (`Vec<Option<Slot>>`
//! with a free list for reused indices); the Recency Order is simply
//! the doubly-linked chain of `prev`/`next` handles threaded through
//! that arena, and a `FxHashMap<String, Handle>` gives O(1) lookup
//! from key to slot. All three required recency operations
//! (`push_back`, `remove`, `move_to_back`) are O(1).

use rustc_hash::FxHashMap;

use crate::entry::Entry;

/// Stable index into the arena. Reused once its slot is freed.
pub type Handle = usize;

struct Slot {
    key: String,
    entry: Entry,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Keyed entry storage with an attached recency ordering.
#[derive(Default)]
pub struct EntryArena {
    slots: Vec<Option<Slot>>,
    free: Vec<Handle>,
    index: FxHashMap<String, Handle>,
    head: Option<Handle>, // LRU
    tail: Option<Handle>, // MRU
}

impl EntryArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if no entries are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Looks up a key's handle without touching recency order.
    #[must_use]
    pub fn handle_of(&self, key: &str) -> Option<Handle> {
        self.index.get(key).copied()
    }

    /// Borrows an entry by handle.
    #[must_use]
    pub fn entry(&self, handle: Handle) -> Option<&Entry> {
        self.slots[handle].as_ref().map(|s| &s.entry)
    }

    /// Mutably borrows an entry by handle.
    pub fn entry_mut(&mut self, handle: Handle) -> Option<&mut Entry> {
        self.slots[handle].as_mut().map(|s| &mut s.entry)
    }

    /// The key stored at `handle`.
    #[must_use]
    pub fn key_of(&self, handle: Handle) -> Option<&str> {
        self.slots[handle].as_ref().map(|s| s.key.as_str())
    }

    /// Inserts a new entry at the MRU tail. Panics if `key` is already
    /// resident; callers must `remove` first (the engine always does,
    /// since `put` on an existing key deletes the stale entry during
    /// admission accounting before re-inserting).
    pub fn push_back(&mut self, key: String, entry: Entry) -> Handle {
        debug_assert!(!self.index.contains_key(&key));

        let slot = Slot {
            key: key.clone(),
            entry,
            prev: self.tail,
            next: None,
        };

        let handle = match self.free.pop() {
            Some(h) => {
                self.slots[h] = Some(slot);
                h
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        if let Some(tail) = self.tail {
            self.slots[tail].as_mut().unwrap().next = Some(handle);
        } else {
            self.head = Some(handle);
        }
        self.tail = Some(handle);
        self.index.insert(key, handle);
        handle
    }

    /// Unlinks `handle` from the recency chain without freeing its slot.
    fn unlink(&mut self, handle: Handle) {
        let (prev, next) = {
            let slot = self.slots[handle].as_ref().unwrap();
            (slot.prev, slot.next)
        };

        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    /// Removes a key entirely: unlinks it and frees its slot.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let handle = self.index.remove(key)?;
        self.unlink(handle);
        let slot = self.slots[handle].take().unwrap();
        self.free.push(handle);
        Some(slot.entry)
    }

    /// Moves `handle` to the MRU tail.
    pub fn move_to_back(&mut self, handle: Handle) {
        if self.tail == Some(handle) {
            return;
        }
        self.unlink(handle);
        self.slots[handle].as_mut().unwrap().prev = self.tail;
        self.slots[handle].as_mut().unwrap().next = None;
        if let Some(tail) = self.tail {
            self.slots[tail].as_mut().unwrap().next = Some(handle);
        } else {
            self.head = Some(handle);
        }
        self.tail = Some(handle);
    }

    /// Removes and returns the LRU (head) key, if any, without
    /// deleting its entry data — callers decide whether to delete or
    /// rotate it back to the tail (admission's hot-key protection).
    pub fn pop_front_key(&self) -> Option<String> {
        self.head.map(|h| self.slots[h].as_ref().unwrap().key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn dummy_entry(size: usize) -> Entry {
        Entry {
            payload: bytes::Bytes::from(vec![0u8; size]),
            compressed: false,
            logical_size: size,
            stored_size: size,
            policy: None,
            created_at: Instant::now(),
            last_access_at: Instant::now(),
        }
    }

    #[test]
    fn push_back_then_pop_front_preserves_fifo_order() {
        let mut arena = EntryArena::new();
        arena.push_back("a".into(), dummy_entry(1));
        arena.push_back("b".into(), dummy_entry(1));
        arena.push_back("c".into(), dummy_entry(1));

        assert_eq!(arena.pop_front_key().as_deref(), Some("a"));
    }

    #[test]
    fn move_to_back_reorders_recency() {
        let mut arena = EntryArena::new();
        arena.push_back("a".into(), dummy_entry(1));
        arena.push_back("b".into(), dummy_entry(1));

        let handle_a = arena.handle_of("a").unwrap();
        arena.move_to_back(handle_a);

        // "b" is now LRU since "a" was moved to MRU.
        assert_eq!(arena.pop_front_key().as_deref(), Some("b"));
    }

    #[test]
    fn remove_unlinks_and_frees_slot_for_reuse() {
        let mut arena = EntryArena::new();
        arena.push_back("a".into(), dummy_entry(1));
        arena.push_back("b".into(), dummy_entry(1));
        arena.remove("a");

        assert_eq!(arena.len(), 1);
        assert!(arena.handle_of("a").is_none());
        assert_eq!(arena.pop_front_key().as_deref(), Some("b"));

        // Slot reuse: a subsequent insert should not grow the backing Vec.
        let before = arena.slots.len();
        arena.push_back("c".into(), dummy_entry(1));
        assert_eq!(arena.slots.len(), before);
    }

    #[test]
    fn bidirectional_consistency_holds_after_mixed_ops() {
        let mut arena = EntryArena::new();
        for k in ["a", "b", "c", "d"] {
            arena.push_back(k.into(), dummy_entry(1));
        }
        arena.remove("b");
        let handle_d = arena.handle_of("d").unwrap();
        arena.move_to_back(handle_d);

        // Every key in the index must resolve to a live entry.
        for key in ["a", "c", "d"] {
            let h = arena.handle_of(key).unwrap();
            assert!(arena.entry(h).is_some());
            assert_eq!(arena.key_of(h), Some(key));
        }
        assert_eq!(arena.len(), 3);
    }
}
