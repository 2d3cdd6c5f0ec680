//! Register read batching
//!
//! Groups sensor register addresses into the smallest set of contiguous
//! Modbus reads. Nearby addresses are merged into one range as long as the
//! gap stays within the configured threshold and the range stays under the
//! per-request register ceiling.

use serde::{Deserialize, Serialize};

/// Modbus holding-register read ceiling (protocol limit for function 0x03)
pub const MAX_REGISTERS_PER_REQUEST: u16 = 125;

/// Default merge gap: ranges separated by at most this many unused
/// registers are read in one request.
pub const DEFAULT_MAX_GAP: u16 = 10;

/// One contiguous register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRange {
    pub start_address: u16,
    pub count: u16,
}

impl RegisterRange {
    /// Create a range, clamping the count into `1..=125`.
    pub fn new(start_address: u16, count: u16) -> Self {
        Self {
            start_address,
            count: count.clamp(1, MAX_REGISTERS_PER_REQUEST),
        }
    }

    /// Last address covered by the range, inclusive.
    pub fn end_address(&self) -> u16 {
        self.start_address.saturating_add(self.count - 1)
    }

    /// Whether the range covers `address`.
    pub fn contains(&self, address: u16) -> bool {
        address >= self.start_address && address <= self.end_address()
    }

    /// Offset of `address` into the range's register slice.
    pub fn offset_of(&self, address: u16) -> Option<usize> {
        self.contains(address)
            .then(|| usize::from(address - self.start_address))
    }

    /// Iterate all addresses the range covers.
    pub fn addresses(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.count).map(move |i| self.start_address.saturating_add(i))
    }
}

/// Computes contiguous read ranges from sensor addresses.
#[derive(Debug, Clone, Copy)]
pub struct RegisterBatcher {
    max_registers: u16,
    max_gap: u16,
}

impl Default for RegisterBatcher {
    fn default() -> Self {
        Self::new(MAX_REGISTERS_PER_REQUEST, DEFAULT_MAX_GAP)
    }
}

impl RegisterBatcher {
    /// Create a batcher; `max_registers` is hard-capped at the protocol
    /// ceiling of 125.
    pub fn new(max_registers: u16, max_gap: u16) -> Self {
        Self {
            max_registers: max_registers.clamp(1, MAX_REGISTERS_PER_REQUEST),
            max_gap,
        }
    }

    /// Batch a multiset of addresses into ascending, non-overlapping
    /// ranges. Input is deduplicated and sorted first; a gap of exactly
    /// `max_gap` still merges, one more splits.
    pub fn batch(&self, addresses: &[u16]) -> Vec<RegisterRange> {
        let mut sorted: Vec<u16> = addresses.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges: Vec<RegisterRange> = Vec::new();
        for address in sorted {
            match ranges.last_mut() {
                Some(range)
                    if address - range.end_address() <= self.max_gap + 1
                        && address - range.start_address < self.max_registers =>
                {
                    range.count = address - range.start_address + 1;
                }
                _ => ranges.push(RegisterRange {
                    start_address: address,
                    count: 1,
                }),
            }
        }
        ranges
    }
}
