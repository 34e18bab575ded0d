//! Concurrency layer (§4.10): shards regions (or swaths, for a refine pass)
//! across workers, each with a private reader and private match storage,
//! and merges on the caller thread once every worker joins.
//!
//! A pass is bulk-synchronous: fan out on shards via `rayon::scope`, barrier
//! at the scope's exit, merge on the calling thread. A `crossbeam_channel`
//! bounded-1 channel is the cooperative stop signal checked between shard
//! items, mirroring the teacher's channel-based worker coordination.

use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::ThreadPoolBuilder;

use crate::engine::{refine_swaths, resolve_routine, scan_regions_first_pass, PassOutcome, ScanOptions, ScanStatistics};
use crate::error::ScanError;
use crate::matchset::{MatchSet, Swath};
use crate::reader::ProcessMemoryReader;
use crate::region::{enumerate_regions, Region};
use crate::util::hardware_parallelism;
use crate::value::UserValue;

/// A cooperative cancellation signal, checked by workers between shard
/// items. Sending on the channel (or dropping the sender) is observed as a
/// request to stop; a worker that observes it abandons its remaining shard
/// items rather than completing them.
#[derive(Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    /// `true` once the paired sender has sent (or been dropped). Checks
    /// without draining the channel so repeated calls keep observing the
    /// same "stop requested" state.
    pub fn requested(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Creates a stop signal and the handle used to trigger it.
pub fn stop_channel() -> (Sender<()>, StopSignal) {
    let (tx, rx) = bounded(1);
    (tx, StopSignal { rx })
}

/// Splits `regions` into `n` size-balanced shards, in enumeration order:
/// each shard accumulates regions until it holds roughly `total / n` bytes,
/// then the next shard starts. The last shard absorbs any remainder.
fn shard_regions(regions: &[Region], n: usize) -> Vec<Vec<Region>> {
    if n <= 1 || regions.is_empty() {
        return vec![regions.to_vec()];
    }
    let total: u64 = regions.iter().map(Region::len).sum();
    let target = (total / n as u64).max(1);

    let mut shards: Vec<Vec<Region>> = Vec::with_capacity(n);
    let mut current = Vec::new();
    let mut current_bytes = 0u64;

    for region in regions {
        current.push(region.clone());
        current_bytes += region.len();
        if current_bytes >= target && shards.len() + 1 < n {
            shards.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
    }
    if !current.is_empty() {
        shards.push(current);
    }
    shards
}

/// Splits a match-set's swaths into `n` size-balanced shards, the refine
/// pass's analogue of [`shard_regions`].
fn shard_swaths(swaths: &[Swath], n: usize) -> Vec<Vec<Swath>> {
    if n <= 1 || swaths.is_empty() {
        return vec![swaths.to_vec()];
    }
    let total: usize = swaths.iter().map(Swath::len).sum();
    let target = (total / n).max(1);

    let mut shards: Vec<Vec<Swath>> = Vec::with_capacity(n);
    let mut current = Vec::new();
    let mut current_len = 0usize;

    for swath in swaths {
        current_len += swath.len();
        current.push(swath.clone());
        if current_len >= target && shards.len() + 1 < n {
            shards.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() {
        shards.push(current);
    }
    shards
}

/// The worker count for a pass over `item_count` shardable units: never
/// more than `hardware_parallelism()`, never more units than workers
/// (an idle worker accomplishes nothing), and `1` disables sharding
/// entirely so the single-threaded path runs instead.
fn worker_count(item_count: usize) -> usize {
    if item_count <= 1 {
        return 1;
    }
    hardware_parallelism().min(item_count).min(crate::config::MAX_WORKERS)
}

/// Runs a first-scan pass, sharding regions across `hardware_parallelism()`
/// workers when there is more than one region to justify it. Falls back to
/// the single-threaded path automatically when `worker_count() <= 1`.
///
/// Because shards preserve enumeration order and regions are disjoint and
/// sorted, concatenating each worker's private match-set in shard order
/// reproduces exactly the single-threaded scan's address ordering (§4.10).
pub fn first_scan_parallel(
    pid: i32,
    options: &ScanOptions,
    user_value: &UserValue,
    stop: &StopSignal,
) -> Result<PassOutcome, ScanError> {
    let regions = enumerate_regions(pid, options.region_level)?;
    let routine = resolve_routine(options)?;
    let n = worker_count(regions.len());

    if n <= 1 || !crate::config::MULTITHREAD {
        let reader = ProcessMemoryReader::open(pid)?;
        return scan_regions_first_pass(&reader, &regions, options, &routine, user_value, stop);
    }

    let shards = shard_regions(&regions, n);
    let pool = ThreadPoolBuilder::new()
        .num_threads(shards.len())
        .build()
        .map_err(|e| ScanError::InvalidArguments { reason: e.to_string() })?;

    let mut outcomes: Vec<Option<Result<PassOutcome, ScanError>>> = (0..shards.len()).map(|_| None).collect();
    {
        let slots: Vec<&mut Option<Result<PassOutcome, ScanError>>> = outcomes.iter_mut().collect();
        // `pool.scope` blocks until every spawned task below has completed
        // before it returns control past this block, so reading `outcomes`
        // after the block is race-free — the barrier join of §4.10/§5.
        pool.scope(|scope| {
            for (slot, shard) in slots.into_iter().zip(shards.iter()) {
                let routine = routine.clone();
                let options = options.clone();
                let user_value = user_value.clone();
                let stop = stop.clone();
                scope.spawn(move |_| {
                    *slot = Some(ProcessMemoryReader::open(pid).and_then(|reader| {
                        scan_regions_first_pass(&reader, shard, &options, &routine, &user_value, &stop)
                    }));
                });
            }
        });
    }

    let results: Vec<Result<PassOutcome, ScanError>> =
        outcomes.into_iter().map(|o| o.expect("every shard slot filled before scope exit")).collect();
    merge_outcomes(results)
}

/// Runs a refine-scan pass, sharding the previous match-set's swaths across
/// workers the same way [`first_scan_parallel`] shards regions.
pub fn refine_scan_parallel(
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
    let n = worker_count(previous.swaths().len());

    if n <= 1 || !crate::config::MULTITHREAD {
        let reader = ProcessMemoryReader::open(pid)?;
        return refine_swaths(&reader, previous.swaths(), &fresh_regions, options, &routine, user_value, stop);
    }

    let shards = shard_swaths(previous.swaths(), n);
    let pool = ThreadPoolBuilder::new()
        .num_threads(shards.len())
        .build()
        .map_err(|e| ScanError::InvalidArguments { reason: e.to_string() })?;

    let mut outcomes: Vec<Option<Result<PassOutcome, ScanError>>> = (0..shards.len()).map(|_| None).collect();
    {
        let slots: Vec<&mut Option<Result<PassOutcome, ScanError>>> = outcomes.iter_mut().collect();
        pool.scope(|scope| {
            for (slot, shard) in slots.into_iter().zip(shards.iter()) {
                let routine = routine.clone();
                let options = options.clone();
                let user_value = user_value.clone();
                let fresh_regions = &fresh_regions;
                let stop = stop.clone();
                scope.spawn(move |_| {
                    *slot = Some(ProcessMemoryReader::open(pid).and_then(|reader| {
                        refine_swaths(&reader, shard, fresh_regions, &options, &routine, &user_value, &stop)
                    }));
                });
            }
        });
    }

    let results: Vec<Result<PassOutcome, ScanError>> =
        outcomes.into_iter().map(|o| o.expect("every shard slot filled before scope exit")).collect();
    merge_outcomes(results)
}

fn merge_outcomes(results: Vec<Result<PassOutcome, ScanError>>) -> Result<PassOutcome, ScanError> {
    let mut matches = MatchSet::new();
    let mut stats = ScanStatistics::default();
    let mut warnings = Vec::new();
    for result in results {
        let outcome = result?;
        stats.merge(&outcome.stats);
        warnings.extend(outcome.warnings);
        matches.merge(outcome.matches);
    }
    // Shards are processed and concatenated in enumeration order, so the
    // merged set is already address-ordered; no sort is required.
    Ok(PassOutcome { matches, stats, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{BackingClass, Permissions, RegionLevel};

    fn region(start: u64, end: u64) -> Region {
        Region {
            start,
            end,
            perms: Permissions { read: true, write: true, execute: false, private: true },
            backing: BackingClass::Heap,
            pathname: None,
        }
    }

    #[test]
    fn shard_regions_preserves_all_regions() {
        let regions = vec![region(0, 100), region(100, 300), region(300, 310), region(310, 1000)];
        let shards = shard_regions(&regions, 3);
        let total: usize = shards.iter().map(Vec::len).sum();
        assert_eq!(total, regions.len());
        assert!(shards.len() <= 3);
    }

    #[test]
    fn shard_regions_with_one_worker_is_single_shard() {
        let regions = vec![region(0, 10), region(10, 20)];
        let shards = shard_regions(&regions, 1);
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].len(), 2);
    }

    #[test]
    fn worker_count_never_exceeds_item_count() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert!(worker_count(1000) <= crate::config::MAX_WORKERS);
    }

    #[test]
    fn stop_signal_not_requested_before_trigger() {
        let (_tx, sig) = stop_channel();
        assert!(!sig.requested());
    }

    #[test]
    fn stop_signal_requested_after_trigger() {
        let (tx, sig) = stop_channel();
        tx.send(()).unwrap();
        assert!(sig.requested());
    }

    #[test]
    fn region_level_default_is_heap_stack_only() {
        assert_eq!(RegionLevel::default(), RegionLevel::HeapStackOnly);
    }
}
