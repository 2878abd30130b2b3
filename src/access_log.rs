//! Per-key bounded sliding-window access timestamp series.
//!
//! Used for both hot-key classification and max-access expiration:
//! `len(window)` is the windowed access count, compared against both
//! `hot_key_threshold` and a policy's `max_access` ceiling. This is
//! the documented (if perhaps not originally intended) behavior — see
//! SPEC_FULL.md §9, open question 1.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Trailing window length for hot-key classification and max-access.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Append-only, window-trimmed timestamp series per key.
#[derive(Default)]
pub struct AccessLog {
    series: FxHashMap<String, VecDeque<Instant>>,
}

impl AccessLog {
    /// Creates an empty access log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an access timestamp for `key`.
    pub fn record(&mut self, key: &str, at: Instant) {
        self.series.entry(key.to_string()).or_default().push_back(at);
    }

    /// Trims `key`'s series to `[now - WINDOW, now]` and returns the
    /// resulting windowed count. Returns 0 (and leaves no series
    /// behind) if `key` has no recorded accesses.
    pub fn trim_and_count(&mut self, key: &str, now: Instant) -> usize {
        let Some(series) = self.series.get_mut(key) else {
            return 0;
        };
        while let Some(&front) = series.front() {
            if now.duration_since(front) > WINDOW {
                series.pop_front();
            } else {
                break;
            }
        }
        series.len()
    }

    /// Removes a key's series entirely (the window it occupied is
    /// empty, or the key was deleted from the Entry Table).
    pub fn remove(&mut self, key: &str) {
        self.series.remove(key);
    }

    /// True if `key`'s series is empty or absent.
    #[must_use]
    pub fn is_empty_for(&self, key: &str) -> bool {
        self.series.get(key).is_none_or(VecDeque::is_empty)
    }

    /// All keys currently tracked, for the Sweeper's traversal.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// The raw (untrimmed) windowed count for `key`, for inspection
    /// without mutating the series (e.g. `most_accessed`).
    #[must_use]
    pub fn count(&self, key: &str) -> usize {
        self.series.get(key).map_or(0, VecDeque::len)
    }
}
