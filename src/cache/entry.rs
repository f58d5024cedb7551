//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Time To Live ==
/// Lifetime requested for a written value.
///
/// Built from a `std::time::Duration` (zero means never expire) or from a
/// signed `chrono::TimeDelta` (zero means never expire, negative means the
/// entry is already expired when written).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The entry never expires
    Never,
    /// The entry expires once this much time has passed
    After(Duration),
    /// The entry is expired as soon as it is written
    Elapsed,
}

impl Ttl {
    /// Resolves the absolute expiration instant relative to `now`.
    ///
    /// A duration too large to represent as an `Instant` never expires.
    pub fn expires_at(self, now: Instant) -> Option<Instant> {
        match self {
            Ttl::Never => None,
            Ttl::After(ttl) => now.checked_add(ttl),
            Ttl::Elapsed => Some(now),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Ttl::Never
        } else {
            Ttl::After(ttl)
        }
    }
}

impl From<chrono::TimeDelta> for Ttl {
    fn from(ttl: chrono::TimeDelta) -> Self {
        if ttl.is_zero() {
            return Ttl::Never;
        }
        match ttl.to_std() {
            Ok(ttl) => Ttl::After(ttl),
            Err(_) => Ttl::Elapsed,
        }
    }
}

// == Cache Entry ==
/// A stored value with its expiration and accounted footprint.
///
/// Entries are immutable; overwriting a key replaces the whole entry.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    value: V,
    /// Absolute expiration, None = no expiration
    expires_at: Option<Instant>,
    /// Estimated size of `value` in bytes, key bytes excluded
    footprint: u64,
}

impl<V> Entry<V> {
    // == Constructor ==
    pub fn new(value: V, expires_at: Option<Instant>, footprint: u64) -> Self {
        Self {
            value,
            expires_at,
            footprint,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn footprint(&self) -> u64 {
        self.footprint
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is expired once `now` reaches its expiration instant. Both the
    /// lazy check on read and the background sweep use this predicate.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL as of `now`, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` for an entry that has already expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_no_ttl() {
        let entry = Entry::new("test_value", Ttl::Never.expires_at(Instant::now()), 10);

        assert_eq!(*entry.value(), "test_value");
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired_at(Instant::now()));
        assert!(entry.ttl_remaining_at(Instant::now()).is_none());
    }

    #[test]
    fn test_entry_expiration() {
        let now = Instant::now();
        let entry = Entry::new(1u8, Ttl::After(Duration::from_millis(50)).expires_at(now), 1);

        assert!(!entry.is_expired_at(Instant::now()));
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired_at(Instant::now()));
        assert_eq!(entry.ttl_remaining_at(Instant::now()), Some(Duration::ZERO));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = Entry::new((), Some(now), 0);

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - Duration::from_nanos(1)));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = Entry::new((), Ttl::After(Duration::from_secs(10)).expires_at(now), 0);

        assert_eq!(entry.ttl_remaining_at(now), Some(Duration::from_secs(10)));
        assert_eq!(
            entry.ttl_remaining_at(now + Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
    }

    #[test]
    fn test_ttl_from_std_duration() {
        assert_eq!(Ttl::from(Duration::ZERO), Ttl::Never);
        assert_eq!(
            Ttl::from(Duration::from_secs(1)),
            Ttl::After(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_ttl_from_chrono_delta() {
        assert_eq!(Ttl::from(chrono::TimeDelta::zero()), Ttl::Never);
        assert_eq!(
            Ttl::from(chrono::TimeDelta::milliseconds(1500)),
            Ttl::After(Duration::from_millis(1500))
        );
        assert_eq!(Ttl::from(chrono::TimeDelta::seconds(-5)), Ttl::Elapsed);
    }

    #[test]
    fn test_elapsed_ttl_is_immediately_expired() {
        let now = Instant::now();
        let entry = Entry::new((), Ttl::Elapsed.expires_at(now), 0);
        assert!(entry.is_expired_at(now));
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let now = Instant::now();
        assert_eq!(Ttl::After(Duration::MAX).expires_at(now), None);
    }
}
