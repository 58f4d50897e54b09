//! Wall-clock port.
//!
//! Signing and authentication read time only through [`TimeSource`], so tests
//! can pin the clock and get byte-identical tokens.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of unix time in whole seconds.
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp.
    fn now_unix(&self) -> i64;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_unix(&self) -> i64 {
        // A clock before 1970 reads as 0 rather than panicking.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedTimeSource {
    timestamp: AtomicI64,
}

impl FixedTimeSource {
    /// Create a clock frozen at `timestamp`.
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp: AtomicI64::new(timestamp),
        }
    }

    /// Move the clock by `secs` (may be negative).
    pub fn advance(&self, secs: i64) {
        self.timestamp.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, timestamp: i64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_unix(&self) -> i64 {
        self.timestamp.load(Ordering::SeqCst)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now_unix(&self) -> i64 {
        (**self).now_unix()
    }
}
