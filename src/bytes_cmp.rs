//! Prefix compare and first-occurrence search over a byte view (§4.4).
//!
//! Every operation here limits itself to the shorter of the caller's
//! declared pattern length and the haystack's own length — callers never
//! need to pre-truncate.

use crate::scan_types::WidthFlags;

/// Compares `hay`'s prefix against `pattern`. On success ORs `B8` into
/// `flags` and returns `pattern.len()`; returns 0 (and leaves `flags`
/// untouched) on mismatch or an empty pattern.
pub fn prefix_compare(hay: &[u8], pattern: &[u8], flags: &mut WidthFlags) -> usize {
    if pattern.is_empty() || hay.len() < pattern.len() {
        return 0;
    }
    if &hay[..pattern.len()] == pattern {
        *flags |= WidthFlags::B8;
        pattern.len()
    } else {
        0
    }
}

/// Compares `hay`'s prefix against `pattern` under `mask`
/// (`∀j. (hay[j] ^ pattern[j]) & mask[j] == 0`). `pattern` and `mask` must
/// be equal length or this returns 0. On success ORs `B8 | BYTE_ARRAY` into
/// `flags` and returns `pattern.len()`.
pub fn prefix_compare_masked(
    hay: &[u8],
    pattern: &[u8],
    mask: &[u8],
    flags: &mut WidthFlags,
) -> usize {
    if pattern.len() != mask.len() || pattern.is_empty() || hay.len() < pattern.len() {
        return 0;
    }
    let matched = hay
        .iter()
        .zip(pattern.iter())
        .zip(mask.iter())
        .all(|((h, p), m)| (h ^ p) & m == 0);
    if matched {
        *flags |= WidthFlags::B8 | WidthFlags::BYTE_ARRAY;
        pattern.len()
    } else {
        0
    }
}

/// Returns the offset of the first position in `hay` where a plain
/// prefix-compare against `pattern` succeeds, or `None`.
pub fn search(hay: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() || hay.len() < pattern.len() {
        return None;
    }
    let mut flags = WidthFlags::empty();
    (0..=hay.len() - pattern.len()).find(|&offset| {
        flags = WidthFlags::empty();
        prefix_compare(&hay[offset..], pattern, &mut flags) > 0
    })
}

/// Returns the offset of the first position in `hay` where a masked
/// prefix-compare succeeds, or `None`.
pub fn search_masked(hay: &[u8], pattern: &[u8], mask: &[u8]) -> Option<usize> {
    if pattern.len() != mask.len() || pattern.is_empty() || hay.len() < pattern.len() {
        return None;
    }
    let mut flags = WidthFlags::empty();
    (0..=hay.len() - pattern.len()).find(|&offset| {
        flags = WidthFlags::empty();
        prefix_compare_masked(&hay[offset..], pattern, mask, &mut flags) > 0
    })
}
