//! Scanner session (§4.11): a long-lived per-target object holding the
//! cumulative match set and the statistics from the most recent pass.

use crossbeam_channel::Sender;

use crate::concurrency::{first_scan_parallel, refine_scan_parallel, stop_channel, StopSignal};
use crate::engine::{ScanOptions, ScanStatistics};
use crate::error::{ScanError, Warning};
use crate::matchset::MatchSet;
use crate::value::UserValue;

/// The outcome of one `perform_scan` call, returned to the caller in
/// addition to being folded into the session's own state on success.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub match_count: usize,
    pub stats: ScanStatistics,
    pub warnings: Vec<Warning>,
}

/// Binds to a target pid and accumulates match state across successive
/// scan passes. Not safe for concurrent mutation — callers that want
/// concurrent reads of the observer methods between passes may do so
/// freely, but a session's own `&mut self` methods are not reentrant.
pub struct ScannerSession {
    pid: i32,
    matches: MatchSet,
    last_stats: Option<ScanStatistics>,
    stop_tx: Sender<()>,
    stop: StopSignal,
}

impl ScannerSession {
    /// Binds to `pid` without touching the target; no scan has run yet.
    pub fn new(pid: i32) -> Self {
        let (stop_tx, stop) = stop_channel();
        ScannerSession { pid, matches: MatchSet::new(), last_stats: None, stop_tx, stop }
    }

    /// A handle an external caller can use to cancel this session's
    /// in-progress or next `perform_scan` pass (§5's "callers may impose
    /// [cancellation] via the stop signal"). Sending on it — from any
    /// thread, at any time — causes the pass to fail with
    /// [`ScanError::Cancelled`] the next time it checks between regions or
    /// swaths; the session's state is left untouched by a cancelled pass.
    pub fn cancel_handle(&self) -> Sender<()> {
        self.stop_tx.clone()
    }

    /// Runs a pass. A first scan if [`Self::matches`] is currently empty,
    /// otherwise a refinement using the current match set as the previous
    /// snapshot. On success, replaces the current match set and last
    /// statistics; on failure, both are left untouched.
    pub fn perform_scan(
        &mut self,
        options: &ScanOptions,
        user_value: &UserValue,
    ) -> Result<ScanReport, ScanError> {
        let outcome = if self.matches.is_empty() {
            first_scan_parallel(self.pid, options, user_value, &self.stop)?
        } else {
            refine_scan_parallel(self.pid, options, user_value, &self.matches, &self.stop)?
        };

        let report = ScanReport {
            match_count: outcome.matches.count(),
            stats: outcome.stats,
            warnings: outcome.warnings,
        };
        self.matches = outcome.matches;
        self.last_stats = Some(outcome.stats);
        Ok(report)
    }

    /// The current cumulative match set.
    pub fn matches(&self) -> &MatchSet {
        &self.matches
    }

    /// Number of live matched bytes in the current match set.
    pub fn match_count(&self) -> usize {
        self.matches.count()
    }

    /// `true` if the current match set has any live match.
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Drops the current match set; the next `perform_scan` call becomes a
    /// first scan.
    pub fn clear_matches(&mut self) {
        self.matches = MatchSet::new();
        self.last_stats = None;
    }

    /// Statistics from the most recent successful pass, if any.
    pub fn last_stats(&self) -> Option<ScanStatistics> {
        self.last_stats
    }

    /// The pid this session is bound to.
    pub fn pid(&self) -> i32 {
        self.pid
    }
}
