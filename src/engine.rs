//! Scan engine (§4.9): orchestrates one pass over a target's regions,
//! invoking the routine at each probe position and recording matches.

use crate::concurrency::StopSignal;
use crate::config::{BLOCK_SIZE_DEFAULT, MAX_SCALAR_WIDTH, STEP_DEFAULT};
use crate::error::{ScanError, Warning};
use crate::matchset::{ByteRecord, MatchSet, Swath};
use crate::reader::ProcessMemoryReader;
use crate::region::{enumerate_regions, Region, RegionLevel};
use crate::routine::{make_routine, Routine};
use crate::scan_types::{DataType, MatchType, WidthFlags};
use crate::value::{OldValue, UserValue};

/// Parameters governing one scan pass, overriding [`crate::config`] defaults
/// at call time. No field is ever read from the environment (§9) — every
/// value here was supplied explicitly by the caller.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub data_type: DataType,
    pub match_type: MatchType,
    /// Stride, in bytes, between consecutive probe positions within a
    /// region. Must be positive.
    pub step: usize,
    /// Read-chunk size used when streaming a region's bytes.
    pub block_size: usize,
    pub region_level: RegionLevel,
    pub reverse_endianness: bool,
    /// Declared width flags for the user value, consulted by `AnyInt` /
    /// `AnyFloat` / `AnyNumber` dispatch (§4.5).
    pub user_width_flags: WidthFlags,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            data_type: DataType::I32,
            match_type: MatchType::Equal,
            step: STEP_DEFAULT,
            block_size: BLOCK_SIZE_DEFAULT,
            region_level: RegionLevel::default(),
            reverse_endianness: false,
            user_width_flags: WidthFlags::all_scalars(),
        }
    }
}

/// Non-negative counters reset at the start of every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStatistics {
    pub regions_visited: usize,
    pub bytes_scanned: u64,
    pub matches: usize,
}

impl ScanStatistics {
    /// Folds `other`'s counters into `self`. Used by the concurrency layer
    /// to combine each worker's private statistics after the join barrier.
    pub fn merge(&mut self, other: &ScanStatistics) {
        self.regions_visited += other.regions_visited;
        self.bytes_scanned += other.bytes_scanned;
        self.matches += other.matches;
    }
}

/// The result of one successful pass: the new match set, its statistics,
/// and any non-fatal warnings accumulated along the way.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub matches: MatchSet,
    pub stats: ScanStatistics,
    pub warnings: Vec<Warning>,
}

fn max_probe_width(data_type: DataType) -> usize {
    data_type.fixed_width().unwrap_or(MAX_SCALAR_WIDTH)
}

/// Resolves the routine for `options`, or `RoutineUnavailable`.
pub(crate) fn resolve_routine(options: &ScanOptions) -> Result<Routine, ScanError> {
    make_routine(
        options.data_type,
        options.match_type,
        options.user_width_flags,
        options.reverse_endianness,
    )
    .ok_or(ScanError::RoutineUnavailable {
        data_type: options.data_type,
        match_type: options.match_type,
    })
}

/// Runs a first-scan pass over `regions` using `reader`, a handle private to
/// the caller. Used directly by [`first_scan`] on the single-threaded path,
/// and once per shard by the concurrency layer (§4.10) with a per-worker
/// reader and an empty accumulator each.
///
/// Checks `stop` between regions (§5) and fails the whole pass with
/// [`ScanError::Cancelled`] the moment it is observed, discarding whatever
/// partial results this shard had accumulated so far.
pub(crate) fn scan_regions_first_pass(
    reader: &ProcessMemoryReader,
    regions: &[Region],
    options: &ScanOptions,
    routine: &Routine,
    user_value: &UserValue,
    stop: &StopSignal,
) -> Result<PassOutcome, ScanError> {
    let mut matches = MatchSet::new();
    let mut stats = ScanStatistics::default();
    let mut warnings = Vec::new();

    for region in regions {
        if stop.requested() {
            return Err(ScanError::Cancelled);
        }
        match scan_region_first_pass(reader, region, options, routine, user_value) {
            Ok(Some(swath)) => {
                stats.bytes_scanned += region.len();
                stats.matches += swath.live_count();
                stats.regions_visited += 1;
                matches.add_swath(swath);
            }
            Ok(None) => {
                stats.bytes_scanned += region.len();
                stats.regions_visited += 1;
            }
            Err(reason) => {
                warnings.push(Warning::RegionSkipped {
                    start: region.start,
                    end: region.end,
                    reason,
                });
            }
        }
    }

    Ok(PassOutcome { matches, stats, warnings })
}

/// Runs a first-scan pass: every probe position in every filtered region is
/// a fresh candidate, evaluated with no previous snapshot.
pub fn first_scan(
    pid: i32,
    options: &ScanOptions,
    user_value: &UserValue,
    stop: &StopSignal,
) -> Result<PassOutcome, ScanError> {
    let regions = enumerate_regions(pid, options.region_level)?;
    let routine = resolve_routine(options)?;
    let reader = ProcessMemoryReader::open(pid)?;
    scan_regions_first_pass(&reader, &regions, options, &routine, user_value, stop)
}

fn scan_region_first_pass(
    reader: &ProcessMemoryReader,
    region: &Region,
    options: &ScanOptions,
    routine: &Routine,
    user_value: &UserValue,
) -> Result<Option<Swath>, String> {
    let max_width = max_probe_width(options.data_type);
    let region_len = region.len() as usize;
    let mut records: Vec<ByteRecord> = vec![ByteRecord::default(); region_len];

    let mut chunk_start = 0usize;
    while chunk_start < region_len {
        let chunk_len = options.block_size.min(region_len - chunk_start);
        // Pad the chunk read so a probe near the chunk's tail can still see
        // a full-width view without crossing the region boundary.
        let read_len = (chunk_len + max_width).min(region_len - chunk_start);
        let mut buf = vec![0u8; read_len];
        reader
            .read_at(region.start + chunk_start as u64, &mut buf)
            .map_err(|e| e.to_string())?;

        let mut p = 0usize;
        while p < chunk_len {
            let view = &buf[p..];
            let mut flags = WidthFlags::empty();
            let matched_width = routine(view, None, user_value, &mut flags);
            if matched_width > 0 {
                records[chunk_start + p] = ByteRecord { old_byte: buf[p], flags };
                for i in 1..matched_width {
                    if chunk_start + p + i < region_len {
                        records[chunk_start + p + i] =
                            ByteRecord { old_byte: buf[p + i], flags: WidthFlags::empty() };
                    }
                }
            } else if !records[chunk_start + p].is_live() {
                records[chunk_start + p].old_byte = buf[p];
            }
            p += options.step;
        }
        chunk_start += chunk_len;
    }

    if records.iter().any(ByteRecord::is_live) {
        Ok(Some(Swath::new(region.start, records)))
    } else {
        Ok(None)
    }
}

/// Runs a refine-scan pass over `previous`: only previously-live addresses
/// are re-examined, each against a freshly read current value and its prior
/// old value.
pub fn refine_scan(
    pid: i32,
    options: &ScanOptions,
    user_value: &UserValue,
    previous: &MatchSet,
    stop: &StopSignal,
) -> Result<PassOutcome, ScanError> {
    if previous.is_empty() {
        return Ok(PassOutcome {
            matches: MatchSet::new(),
            stats: ScanStatistics::default(),
            warnings: Vec::new(),
        });
    }

    let fresh_regions = enumerate_regions(pid, options.region_level)?;
    let routine = resolve_routine(options)?;
    let reader = ProcessMemoryReader::open(pid)?;
    refine_swaths(&reader, previous.swaths(), &fresh_regions, options, &routine, user_value, stop)
}

/// Refines `swaths` (private to the caller's shard) against `fresh_regions`
/// using `reader`. Shared by the single-threaded [`refine_scan`] and the
/// concurrency layer's per-shard workers.
///
/// Checks `stop` between swaths (§5), mirroring the between-regions check in
/// [`scan_regions_first_pass`].
pub(crate) fn refine_swaths(
    reader: &ProcessMemoryReader,
    swaths: &[Swath],
    fresh_regions: &[Region],
    options: &ScanOptions,
    routine: &Routine,
    user_value: &UserValue,
    stop: &StopSignal,
) -> Result<PassOutcome, ScanError> {
    let mut matches = MatchSet::new();
    let mut stats = ScanStatistics::default();
    let mut warnings = Vec::new();
    let max_width = max_probe_width(options.data_type);

    for swath in swaths {
        if stop.requested() {
            return Err(ScanError::Cancelled);
        }
        let mut records = vec![ByteRecord::default(); swath.len()];
        let region_still_mapped = fresh_regions
            .iter()
            .any(|r| r.start <= swath.first_byte_in_child && swath.range().end <= r.end);

        if !region_still_mapped {
            for (addr, _, flags) in swath.iter_bytes() {
                if !flags.is_empty() {
                    warnings.push(Warning::RegionUnmapped { address: addr });
                }
            }
            continue;
        }

        for (offset, old_rec) in swath.data.iter().enumerate() {
            if !old_rec.is_live() {
                continue;
            }
            let addr = swath.first_byte_in_child + offset as u64;
            let read_len = max_width.min(swath.len() - offset);
            let mut buf = vec![0u8; read_len];
            match reader.read_at(addr, &mut buf) {
                Ok(_) => {
                    let old_bytes = swath.data[offset..(offset + read_len).min(swath.len())]
                        .iter()
                        .map(|r| r.old_byte)
                        .collect::<Vec<u8>>();
                    let old_value = OldValue::new(WidthFlags::all_scalars(), old_bytes);
                    let mut flags = WidthFlags::empty();
                    let matched_width = routine(&buf, Some(&old_value), user_value, &mut flags);
                    stats.bytes_scanned += read_len as u64;
                    if matched_width > 0 {
                        records[offset] = ByteRecord { old_byte: buf[0], flags };
                        // Dead neighbors carry the freshly read old byte with
                        // empty flags, so the next refinement's geometry and
                        // old-value bytes stay in sync with this one (§4.9).
                        for i in 1..matched_width {
                            if offset + i < records.len() {
                                records[offset + i] = ByteRecord { old_byte: buf[i], flags: WidthFlags::empty() };
                            }
                        }
                        stats.matches += 1;
                    }
                }
                Err(_) => {
                    warnings.push(Warning::RegionUnmapped { address: addr });
                }
            }
        }

        if records.iter().any(ByteRecord::is_live) {
            matches.add_swath(Swath::new(swath.first_byte_in_child, records));
        }
        stats.regions_visited += 1;
    }

    Ok(PassOutcome { matches, stats, warnings })
}
