//! CPU core counting, used by the concurrency layer (§4.10) to pick the
//! default worker count: `N = min(hardware_parallelism(), num_regions)`.

/// Returns the number of logical CPUs visible to this process.
///
/// Guaranteed to return a value ≥ 1 (falls back to 1 if the platform can't
/// report a value).
pub fn count_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Returns the physical core count when available, capped at the logical
/// core count. Used to size the default worker pool: hyperthread siblings
/// rarely help a memory-bandwidth-bound workload like scanning.
pub fn hardware_parallelism() -> usize {
    num_cpus::get_physical().max(1).min(count_cores().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_cores_at_least_one() {
        assert!(count_cores() >= 1);
    }

    #[test]
    fn hardware_parallelism_at_least_one() {
        assert!(hardware_parallelism() >= 1);
    }
}
