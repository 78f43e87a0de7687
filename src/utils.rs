//! Time utilities shared across the engine.
//!
//! The engine never calls `Utc::now()` directly; every component that needs
//! the current time goes through a [`Clock`] handle so tests can pin time
//! and replay order streams deterministically.

use chrono::{DateTime, Utc};

/// Source of "now" for the engine.
///
/// Production code uses [`SystemClock`]; tests use [`FixedClock`] to make
/// timestamp validation and trade records reproducible.
pub trait Clock: std::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Seconds since the Unix epoch for a timestamp, used in canonical order ids.
#[must_use]
#[inline]
pub fn epoch_seconds(timestamp: &DateTime<Utc>) -> i64 {
    timestamp.timestamp()
}
