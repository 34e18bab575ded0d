//! Compile-time configuration constants.
//!
//! These are the defaults `ScanOptions` falls back to when a caller doesn't
//! override a field explicitly (§6). Nothing here is read from the
//! environment — the core takes configuration only through explicit
//! arguments, never ambient process state.

/// Default stride between consecutive probe positions within a region.
pub const STEP_DEFAULT: usize = 1;

/// Default read-chunk size used when streaming a region's bytes from the
/// target: one page on virtually every Linux platform.
pub const BLOCK_SIZE_DEFAULT: usize = 4 * 1024;

/// Whether a scan pass is sharded across a worker pool at all. Disabling the
/// `multithread` feature forces the single-threaded path unconditionally,
/// regardless of region count or `hardware_parallelism()`.
pub const MULTITHREAD: bool = cfg!(feature = "multithread");

/// Upper bound on worker count, independent of `hardware_parallelism()`. A
/// machine with an unusually large core count should not spin up one thread
/// per core when scanning a handful of regions; region count already caps
/// `N` in practice (§4.10), this is a secondary ceiling.
pub const MAX_WORKERS: usize = 64;

/// Number of bytes of scratch the engine keeps alongside the widest scalar
/// width (`B64` = 8 bytes) so that a probe position near a region's end can
/// still build a full-width view without reading past the enumerated region.
pub const MAX_SCALAR_WIDTH: usize = 8;
