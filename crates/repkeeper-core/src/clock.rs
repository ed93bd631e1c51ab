//! Time sources.
//!
//! Every component in the crate takes the current time as an explicit
//! epoch-millisecond argument. The [`Clock`] trait is only consulted at the
//! edges (the async driver and the CLI), which keeps the state machines
//! deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Reads the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        now_ms()
    }
}

/// Shared, manually advanced clock for tests and simulations.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, delta: u64) -> u64 {
        self.ms.fetch_add(delta, Ordering::SeqCst) + delta
    }

    pub fn advance_secs(&self, secs: u64) -> u64 {
        self.advance_ms(secs * 1000)
    }

    pub fn set_ms(&self, ms: u64) {
        self.ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Convert epoch milliseconds to a UTC timestamp, saturating at the epoch.
pub fn datetime_from_ms(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

/// Convert a UTC timestamp to epoch milliseconds; pre-epoch values clamp to 0.
pub fn ms_from_datetime(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}
