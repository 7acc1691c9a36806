//! Heap Profile Model and Parser
//!
//! Parses the textual heap profile served by a tcmalloc/gperftools style
//! `/heap` endpoint:
//!
//! ```text
//! heap profile:   28:  2464 [   28:  2464] @ heapprofile
//!      1:    80 [     1:    80] @ 0x7f5c31 0x7f5d02 0x4011ab
//!      3:  2048 [     3:  2048] @ 0x7f5c31 0x4011c0
//!
//! MAPPED_LIBRARIES:
//! 00400000-0040b000 r-xp 00000000 08:01 1234   /usr/bin/server
//! ```
//!
//! Line one carries the process-wide totals. Every following line up to the
//! `MAPPED_LIBRARIES:` marker describes one call stack as
//! `in_use_count: in_use_bytes [alloc_count: alloc_bytes] @ addr...`.

mod parser;

pub use parser::{ProfileParser, MAPPED_LIBRARIES_MARKER};

use crate::symbol::SymbolTable;

/// Process-wide totals from the header line
///
/// Informational only; nothing downstream depends on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileHeader {
    /// Live objects
    pub in_use_count: u64,
    /// Live bytes
    pub in_use_bytes: u64,
    /// Objects allocated over the profiling window
    pub alloc_count: u64,
    /// Bytes allocated over the profiling window
    pub alloc_bytes: u64,
}

/// Allocation counters attributed to a single call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRecord {
    pub in_use_count: u64,
    pub in_use_bytes: u64,
    pub alloc_count: u64,
    pub alloc_bytes: u64,
    /// Raw address tokens, in the order the profiler emitted them
    pub stack: Vec<String>,
}

impl StackRecord {
    /// Average size of a live object, 0 when nothing is live
    pub fn in_use_avg_size(&self) -> f64 {
        average(self.in_use_bytes, self.in_use_count)
    }

    /// Average size of an allocation, 0 when nothing was allocated
    pub fn alloc_avg_size(&self) -> f64 {
        average(self.alloc_bytes, self.alloc_count)
    }
}

fn average(bytes: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        bytes as f64 / count as f64
    }
}

/// Result of parsing one heap profile
#[derive(Debug, Clone, Default)]
pub struct HeapProfile {
    /// Totals from line one (zeroed when the header did not parse)
    pub header: ProfileHeader,
    /// Whether line one matched the header format
    pub header_parsed: bool,
    /// One entry per well-formed stack line, in source order
    pub records: Vec<StackRecord>,
    /// Every distinct address seen in any stack, unresolved
    pub symbols: SymbolTable,
    /// Stack lines that did not match the record format and were skipped
    pub malformed_lines: usize,
}
