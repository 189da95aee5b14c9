//! # IPv4 Range Model
//!
//! Inclusive `[start, end]` address intervals and the cursor that walks an
//! ordered list of them exactly once per pass.
//!
//! The cursor is the single source of candidate addresses for a scan: it can
//! be pulled synchronously via [`AddrCursor::next_u32`], or drained through a
//! bounded channel by the worker pool via [`AddrCursor::spawn_feeder`].

use std::net::Ipv4Addr;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TargetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Result<Self, TargetError> {
        if u32::from(start) > u32::from(end) {
            return Err(TargetError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one host.
    pub fn single(addr: Ipv4Addr) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Number of addresses in the range. 64-bit because a /0 holds 2^32.
    pub fn addr_count(&self) -> u64 {
        u64::from(u32::from(self.end)) - u64::from(u32::from(self.start)) + 1
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let value = u32::from(addr);
        u32::from(self.start) <= value && value <= u32::from(self.end)
    }
}

/// Walks an ordered list of ranges, yielding every address exactly once.
///
/// The cursor is `(range_idx, current)`; it only ever moves forward and
/// [`reset`](Self::reset) restores the initial position.
#[derive(Debug, Clone)]
pub struct AddrCursor {
    ranges: Vec<Ipv4Range>,
    total: u64,
    range_idx: usize,
    current: u32,
    exhausted: bool,
}

impl AddrCursor {
    pub fn new(ranges: Vec<Ipv4Range>) -> Self {
        let total = ranges.iter().map(Ipv4Range::addr_count).sum();
        let current = ranges.first().map(|r| u32::from(r.start)).unwrap_or(0);
        Self {
            exhausted: ranges.is_empty(),
            ranges,
            total,
            range_idx: 0,
            current,
        }
    }

    /// Total number of addresses across every range, computed once.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Next address as a canonical big-endian u32, or `None` when exhausted.
    /// Never blocks.
    pub fn next_u32(&mut self) -> Option<u32> {
        if self.exhausted {
            return None;
        }

        let value = self.current;
        let end = u32::from(self.ranges[self.range_idx].end);

        // Advance before the overflow edge: 255.255.255.255 is a valid end.
        if value == end {
            self.advance_range();
        } else {
            self.current = value + 1;
        }

        Some(value)
    }

    /// Restores the cursor to the first address of the first range.
    pub fn reset(&mut self) {
        self.range_idx = 0;
        self.current = self.ranges.first().map(|r| u32::from(r.start)).unwrap_or(0);
        self.exhausted = self.ranges.is_empty();
    }

    fn advance_range(&mut self) {
        self.range_idx += 1;
        match self.ranges.get(self.range_idx) {
            Some(range) => self.current = u32::from(range.start),
            None => self.exhausted = true,
        }
    }

    /// Spawns the single producer task feeding every remaining address into a
    /// bounded channel.
    ///
    /// The channel closing is the canonical "no more work" signal: it happens
    /// exactly once, on exhaustion or cancellation, when the sender drops.
    pub fn spawn_feeder(
        mut self,
        buffer: usize,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Ipv4Addr> {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        tokio::spawn(async move {
            while let Some(value) = self.next_u32() {
                let addr = Ipv4Addr::from(value);
                tokio::select! {
                    // Cancellation wins over a ready send slot.
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = tx.send(addr) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        rx
    }
}

impl Iterator for AddrCursor {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_u32().map(Ipv4Addr::from)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
