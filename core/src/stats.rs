//! Scan-wide counters shared across the worker pool.
//!
//! These are simple monotonic counts with no cross-field invariants, so they
//! use relaxed atomics rather than a lock.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ScanStats {
    scanned: AtomicU64,
    skipped: AtomicU64,
}

impl ScanStats {
    pub fn record_scanned(&self) {
        self.scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scanned(&self) -> u64 {
        self.scanned.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Addresses handled so far, probed or skipped. Drives progress display.
    pub fn processed(&self) -> u64 {
        self.scanned() + self.skipped()
    }
}
