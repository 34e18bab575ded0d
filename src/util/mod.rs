//! Cross-cutting helpers used by the concurrency layer and engine.
//!
//! Submodule:
//! - [`cores`] — logical/physical core counting, used to pick the default
//!   worker count for the concurrency layer (§4.10).
//!
//! The most commonly needed symbol is re-exported at the `util` module level.

pub mod cores;

pub use cores::{count_cores, hardware_parallelism};
