//! Error taxonomy shared by every fallible core operation (§7).
//!
//! `ScanError` is the single `Err` type returned by the engine, the region
//! enumerator, the process-memory reader, and the scanner session. Per-region
//! read failures never reach this type as an `Err` — they are handled locally
//! (skipped, and recorded as a [`Warning`]) exactly as §7 specifies.

use std::fmt;

use crate::scan_types::{DataType, MatchType};

/// A failed core operation.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The target pid has no memory map, or its memory file could not be
    /// opened because the process does not exist.
    #[error("no such process: pid {pid}")]
    NoSuchProcess { pid: i32 },

    /// The target's memory map or memory file exists but this process lacks
    /// the privilege to read it.
    #[error("permission denied reading pid {pid}")]
    PermissionDenied { pid: i32, #[source] source: std::io::Error },

    /// `/proc/<pid>/maps` could not be parsed as a well-formed region list.
    #[error("could not parse memory map for pid {pid}: {reason}")]
    MapParseError { pid: i32, reason: String },

    /// The routine factory has no comparator for this combination of
    /// operands (e.g. an old-value-dependent match type with no previous
    /// snapshot available).
    #[error("no scan routine available for {data_type:?}/{match_type:?}")]
    RoutineUnavailable {
        data_type: DataType,
        match_type: MatchType,
    },

    /// A single region could not be read. Carried as the payload of a
    /// [`Warning`], never returned as the `Err` of `perform_scan` itself.
    #[error("region [{start:#x}, {end:#x}) unreadable: {source}")]
    RegionReadError {
        start: u64,
        end: u64,
        #[source]
        source: std::io::Error,
    },

    /// A malformed user value: e.g. a byte-array mask whose length doesn't
    /// match its pattern, or a zero-length pattern where one is required.
    #[error("invalid scan arguments: {reason}")]
    InvalidArguments { reason: String },

    /// The stop signal was observed at a region boundary.
    #[error("scan cancelled")]
    Cancelled,
}

/// A non-fatal note attached to an otherwise-successful scan pass.
///
/// Warnings never cause `perform_scan` to return `Err`; they accompany the
/// successful [`crate::session::ScanReport`] so the caller can surface them
/// without the pass itself having failed.
#[derive(Debug, Clone)]
pub enum Warning {
    /// A region's reader could not be opened or a read on it failed; the
    /// region was skipped and does not count toward `regions_visited`.
    RegionSkipped { start: u64, end: u64, reason: String },
    /// A previously-matched address fell outside every region in the fresh
    /// enumeration (its backing mapping was removed between passes); the
    /// match was dropped rather than silently retained.
    RegionUnmapped { address: u64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::RegionSkipped { start, end, reason } => {
                write!(f, "region [{start:#x}, {end:#x}) skipped: {reason}")
            }
            Warning::RegionUnmapped { address } => {
                write!(f, "match at {address:#x} dropped: containing region is no longer mapped")
            }
        }
    }
}
