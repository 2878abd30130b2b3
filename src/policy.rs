//! Per-entry expiration policy: TTL, TTI, and max-access.
//!
//! A [`Policy`] is an immutable value built through a chainable
//! constructor. The engine never mutates a stored policy in place;
//! `refresh_policy` replaces it wholesale.

use std::time::Duration;

/// Immutable expiration contract for one entry.
///
/// Each field is optional; a missing field means "not enforced".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    ttl: Option<Duration>,
    tti: Option<Duration>,
    max_access: Option<usize>,
}

impl Policy {
    /// Starts building a policy with no fields enforced.
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the time-to-live: maximum duration since `created_at`.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the time-to-idle: maximum duration since `last_access_at`.
    #[must_use]
    pub fn with_tti(mut self, tti: Duration) -> Self {
        self.tti = Some(tti);
        self
    }

    /// Sets the maximum windowed access count before expiry.
    #[must_use]
    pub fn with_max_access(mut self, max_access: usize) -> Self {
        self.max_access = Some(max_access);
        self
    }

    /// The configured TTL, if any.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The configured TTI, if any.
    #[must_use]
    pub fn tti(&self) -> Option<Duration> {
        self.tti
    }

    /// The configured max-access ceiling, if any.
    #[must_use]
    pub fn max_access(&self) -> Option<usize> {
        self.max_access
    }

    /// True if no field is enforced (an entry with this policy never
    /// expires on its own).
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.ttl.is_none() && self.tti.is_none() && self.max_access.is_none()
    }
}
