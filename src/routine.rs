//! Scan routine factory (§4.5): given `(dataType, matchType, userWidthFlags,
//! reverseEndian)`, produces the concrete comparison closure the engine
//! invokes once per candidate offset.
//!
//! A routine needs two things a bare `fn` pointer cannot carry: the match
//! type (a runtime value, not a type parameter) and the endianness direction
//! for this dispatch. Rather than generate a flat `DataType × MatchType`
//! table of named functions, the factory closes over both in a boxed
//! closure — the dispatch-time decision is paid once, not per candidate
//! offset, and the hot loop calls an ordinary `Fn` through a vtable exactly
//! the way the teacher's frame pipeline calls its boxed filter chain.

use std::sync::Arc;

use crate::bytes_cmp::{prefix_compare, prefix_compare_masked};
use crate::endian::{swap, EndianScalar};
use crate::scan_types::{DataType, MatchType, WidthFlags};
use crate::value::{OldValue, ScalarField, UserValue};

/// `(candidate bytes, previous snapshot, user value, out flags) -> matched width`.
///
/// `matched_width` is the number of bytes covered by the match starting at
/// the view's first byte; `0` means no match. Shared read-only across
/// worker threads during a parallel pass (§4.10), hence `Send + Sync`.
pub type Routine =
    Arc<dyn Fn(&[u8], Option<&OldValue>, &UserValue, &mut WidthFlags) -> usize + Send + Sync>;

/// Builds the routine for `(data_type, match_type, user_flags, reverse_endian)`,
/// or `None` if the combination is not well-formed (e.g. an ordering
/// predicate against a byte-array data type).
pub fn make_routine(
    data_type: DataType,
    match_type: MatchType,
    user_flags: WidthFlags,
    reverse_endian: bool,
) -> Option<Routine> {
    match data_type {
        DataType::I8 => scalar_routine::<i8>(match_type, reverse_endian),
        DataType::U8 => scalar_routine::<u8>(match_type, reverse_endian),
        DataType::I16 => scalar_routine::<i16>(match_type, reverse_endian),
        DataType::U16 => scalar_routine::<u16>(match_type, reverse_endian),
        DataType::I32 => scalar_routine::<i32>(match_type, reverse_endian),
        DataType::U32 => scalar_routine::<u32>(match_type, reverse_endian),
        DataType::I64 => scalar_routine::<i64>(match_type, reverse_endian),
        DataType::U64 => scalar_routine::<u64>(match_type, reverse_endian),
        DataType::F32 => scalar_routine::<f32>(match_type, reverse_endian),
        DataType::F64 => scalar_routine::<f64>(match_type, reverse_endian),
        DataType::AnyInt => any_int_routine(match_type, user_flags, reverse_endian),
        DataType::AnyFloat => any_float_routine(match_type, user_flags, reverse_endian),
        DataType::AnyNumber => any_number_routine(match_type, user_flags, reverse_endian),
        DataType::ByteArray => byte_array_routine(match_type),
        DataType::String => string_routine(match_type),
    }
}

/// Decodes a host-order scalar candidate, applying the byte swap first when
/// scanning a non-native-endian target.
fn decode<T: ScalarField + EndianScalar + crate::bytebuf::HostScalar>(
    bytes: &[u8],
    reverse_endian: bool,
) -> Option<T> {
    if bytes.len() < T::SIZE {
        return None;
    }
    let v = T::from_ne(bytes);
    Some(if reverse_endian { swap(v) } else { v })
}

/// Evaluates the non-delta predicates common to every scalar type via
/// `PartialOrd`. Delta predicates (`Changed`, `Increased`, …) are handled by
/// the per-type wrapper below since they need type-specific wrapping
/// arithmetic.
fn ordered_match<T: PartialOrd + Copy>(match_type: MatchType, cur: T, lo: T, hi: T) -> Option<bool> {
    match match_type {
        MatchType::Equal => Some(cur == lo),
        MatchType::NotEqual => Some(cur != lo),
        MatchType::Greater => Some(cur > lo),
        MatchType::Less => Some(cur < lo),
        MatchType::Range => {
            let (min, max) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            Some(cur >= min && cur <= max)
        }
        MatchType::Any => Some(true),
        _ => None,
    }
}

macro_rules! impl_int_scalar_routine {
    ($t:ty) => {
        impl CanScan for $t {
            fn bit_width_flag() -> WidthFlags {
                width_flag_for::<$t>()
            }

            fn eval(match_type: MatchType, bytes: &[u8], old: Option<&OldValue>, uv: &UserValue, reverse_endian: bool) -> bool {
                let cur = match decode::<$t>(bytes, reverse_endian) {
                    Some(v) => v,
                    None => return false,
                };
                let (lo, hi) = uv.range_for::<$t>();
                if let Some(m) = ordered_match(match_type, cur, lo, hi) {
                    return m;
                }
                let old_v = match old.and_then(|o| decode::<$t>(&o.bytes, reverse_endian)) {
                    Some(v) => v,
                    None => return false,
                };
                match match_type {
                    MatchType::Changed => cur != old_v,
                    MatchType::NotChanged => cur == old_v,
                    MatchType::Increased => cur > old_v,
                    MatchType::Decreased => cur < old_v,
                    MatchType::IncreasedBy => cur.wrapping_sub(old_v) == lo,
                    MatchType::DecreasedBy => old_v.wrapping_sub(cur) == lo,
                    _ => false,
                }
            }
        }
    };
}

macro_rules! impl_float_scalar_routine {
    ($t:ty, $bits:ty) => {
        impl CanScan for $t {
            fn bit_width_flag() -> WidthFlags {
                width_flag_for::<$t>()
            }

            fn eval(match_type: MatchType, bytes: &[u8], old: Option<&OldValue>, uv: &UserValue, reverse_endian: bool) -> bool {
                let cur = match decode::<$t>(bytes, reverse_endian) {
                    Some(v) => v,
                    None => return false,
                };
                let (lo, hi) = uv.range_for::<$t>();
                match match_type {
                    MatchType::Equal => return cur.to_bits() == lo.to_bits(),
                    MatchType::NotEqual => return cur.to_bits() != lo.to_bits(),
                    _ => {}
                }
                if let Some(m) = ordered_match(match_type, cur, lo, hi) {
                    return m;
                }
                let old_v = match old.and_then(|o| decode::<$t>(&o.bytes, reverse_endian)) {
                    Some(v) => v,
                    None => return false,
                };
                match match_type {
                    MatchType::Changed => cur.to_bits() != old_v.to_bits(),
                    MatchType::NotChanged => cur.to_bits() == old_v.to_bits(),
                    MatchType::Increased => cur > old_v,
                    MatchType::Decreased => cur < old_v,
                    MatchType::IncreasedBy => (cur - old_v) == lo,
                    MatchType::DecreasedBy => (old_v - cur) == lo,
                    _ => false,
                }
            }
        }
    };
}

/// A scalar type the routine factory can build a comparator for.
trait CanScan: ScalarField + EndianScalar + crate::bytebuf::HostScalar {
    fn bit_width_flag() -> WidthFlags;
    fn eval(
        match_type: MatchType,
        bytes: &[u8],
        old: Option<&OldValue>,
        uv: &UserValue,
        reverse_endian: bool,
    ) -> bool;
}

fn width_flag_for<T: ScalarField>() -> WidthFlags {
    T::WIDTH_FLAG
}

impl_int_scalar_routine!(i8);
impl_int_scalar_routine!(u8);
impl_int_scalar_routine!(i16);
impl_int_scalar_routine!(u16);
impl_int_scalar_routine!(i32);
impl_int_scalar_routine!(u32);
impl_int_scalar_routine!(i64);
impl_int_scalar_routine!(u64);
impl_float_scalar_routine!(f32, u32);
impl_float_scalar_routine!(f64, u64);

/// Builds the routine for a single fixed-width scalar `DataType`. Returns
/// `None` for an old-value predicate's own construction failures are not
/// possible here — those are detected per-call (absent old value -> no
/// match) rather than at factory time, since whether an old value will be
/// available depends on whether this is a first or refine pass.
fn scalar_routine<T: 'static + CanScan>(match_type: MatchType, reverse_endian: bool) -> Option<Routine> {
    Some(Arc::new(move |bytes, old, uv, out_flags| {
        if T::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= T::bit_width_flag();
            std::mem::size_of::<T>()
        } else {
            0
        }
    }))
}

/// `AnyInt` tries each width set in `user_flags` (or every integer width if
/// none are set), using the unsigned interpretation at that width, unions
/// matched widths, and returns the largest matched width.
fn any_int_routine(match_type: MatchType, user_flags: WidthFlags, reverse_endian: bool) -> Option<Routine> {
    let widths = effective_widths(user_flags, WidthFlags::all_scalars());
    Some(Arc::new(move |bytes, old, uv, out_flags| {
        let mut best = 0usize;
        if widths.contains(WidthFlags::B8) && u8::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= WidthFlags::B8;
            best = best.max(1);
        }
        if widths.contains(WidthFlags::B16) && u16::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= WidthFlags::B16;
            best = best.max(2);
        }
        if widths.contains(WidthFlags::B32) && u32::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= WidthFlags::B32;
            best = best.max(4);
        }
        if widths.contains(WidthFlags::B64) && u64::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= WidthFlags::B64;
            best = best.max(8);
        }
        best
    }))
}

/// `AnyFloat` tries f32 and/or f64 per `user_flags` (both if unspecified).
fn any_float_routine(match_type: MatchType, user_flags: WidthFlags, reverse_endian: bool) -> Option<Routine> {
    let widths = effective_widths(user_flags, WidthFlags::B32 | WidthFlags::B64);
    Some(Arc::new(move |bytes, old, uv, out_flags| {
        let mut best = 0usize;
        if widths.contains(WidthFlags::B32) && f32::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= WidthFlags::B32;
            best = best.max(4);
        }
        if widths.contains(WidthFlags::B64) && f64::eval(match_type, bytes, old, uv, reverse_endian) {
            *out_flags |= WidthFlags::B64;
            best = best.max(8);
        }
        best
    }))
}

/// `AnyNumber` checks integer widths first, then float widths; a float
/// match is recorded independently of any integer match at the same offset.
fn any_number_routine(match_type: MatchType, user_flags: WidthFlags, reverse_endian: bool) -> Option<Routine> {
    let int_routine = any_int_routine(match_type, user_flags, reverse_endian)?;
    let float_routine = any_float_routine(match_type, user_flags, reverse_endian)?;
    Some(Arc::new(move |bytes, old, uv, out_flags| {
        let int_best = int_routine(bytes, old, uv, out_flags);
        let float_best = float_routine(bytes, old, uv, out_flags);
        int_best.max(float_best)
    }))
}

fn effective_widths(user_flags: WidthFlags, relevant: WidthFlags) -> WidthFlags {
    let narrowed = user_flags & relevant;
    if narrowed.is_empty() {
        relevant
    } else {
        narrowed
    }
}

fn byte_array_routine(match_type: MatchType) -> Option<Routine> {
    match match_type {
        MatchType::Equal | MatchType::Any => Some(Arc::new(move |bytes, _old, uv, out_flags| {
            let pattern = match uv.pattern.as_deref() {
                Some(p) if !p.is_empty() => p,
                _ => return 0,
            };
            match uv.mask.as_deref() {
                Some(mask) => prefix_compare_masked(bytes, pattern, mask, out_flags),
                None => prefix_compare(bytes, pattern, out_flags),
            }
        })),
        MatchType::NotEqual => Some(Arc::new(move |bytes, _old, uv, out_flags| {
            let pattern = match uv.pattern.as_deref() {
                Some(p) if !p.is_empty() => p,
                _ => return 0,
            };
            let mut scratch = WidthFlags::empty();
            let matched = match uv.mask.as_deref() {
                Some(mask) => prefix_compare_masked(bytes, pattern, mask, &mut scratch),
                None => prefix_compare(bytes, pattern, &mut scratch),
            };
            if matched == 0 && bytes.len() >= pattern.len() {
                *out_flags |= WidthFlags::B8 | WidthFlags::BYTE_ARRAY;
                pattern.len()
            } else {
                0
            }
        })),
        _ => None,
    }
}

fn string_routine(match_type: MatchType) -> Option<Routine> {
    match match_type {
        MatchType::Equal | MatchType::Any => Some(Arc::new(move |bytes, _old, uv, out_flags| {
            let s = match uv.string.as_deref() {
                Some(s) if !s.is_empty() => s.as_bytes(),
                _ => return 0,
            };
            if bytes.len() >= s.len() && &bytes[..s.len()] == s {
                *out_flags |= WidthFlags::STRING;
                s.len()
            } else {
                0
            }
        })),
        MatchType::NotEqual => Some(Arc::new(move |bytes, _old, uv, out_flags| {
            let s = match uv.string.as_deref() {
                Some(s) if !s.is_empty() => s.as_bytes(),
                _ => return 0,
            };
            if bytes.len() >= s.len() && &bytes[..s.len()] != s {
                *out_flags |= WidthFlags::STRING;
                s.len()
            } else {
                0
            }
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> WidthFlags {
        WidthFlags::empty()
    }

    #[test]
    fn equal_i32_matches_exact_encoding() {
        let routine = make_routine(DataType::I32, MatchType::Equal, WidthFlags::B32, false).unwrap();
        let uv = UserValue::from_scalar(42i32);
        let mut out = flags();
        let bytes = 42i32.to_ne_bytes();
        assert_eq!(routine(&bytes, None, &uv, &mut out), 4);
        assert!(out.contains(WidthFlags::B32));
    }

    #[test]
    fn equal_i32_reverse_endian_swaps_before_compare() {
        let routine = make_routine(DataType::I32, MatchType::Equal, WidthFlags::B32, true).unwrap();
        let uv = UserValue::from_scalar(0x0102_0304i32);
        let mut out = flags();
        let bytes = 0x0102_0304i32.swap_bytes().to_ne_bytes();
        assert_eq!(routine(&bytes, None, &uv, &mut out), 4);
    }

    #[test]
    fn range_matches_regardless_of_bound_order() {
        let routine = make_routine(DataType::U16, MatchType::Range, WidthFlags::B16, false).unwrap();
        let uv = UserValue::from_range(100u16, 10u16);
        let mut out = flags();
        let bytes = 50u16.to_ne_bytes();
        assert_eq!(routine(&bytes, None, &uv, &mut out), 2);
    }

    #[test]
    fn increased_by_uses_wrapping_sub_for_unsigned() {
        let routine = make_routine(DataType::U8, MatchType::IncreasedBy, WidthFlags::B8, false).unwrap();
        let uv = UserValue::from_scalar(5u8);
        let old = OldValue::new(WidthFlags::B8, vec![250u8]);
        let mut out = flags();
        let bytes = [255u8];
        assert_eq!(routine(&bytes, Some(&old), &uv, &mut out), 1);
    }

    #[test]
    fn changed_with_no_old_value_does_not_match() {
        let routine = make_routine(DataType::I32, MatchType::Changed, WidthFlags::B32, false).unwrap();
        let uv = UserValue::from_scalar(0i32);
        let mut out = flags();
        let bytes = 7i32.to_ne_bytes();
        assert_eq!(routine(&bytes, None, &uv, &mut out), 0);
    }

    #[test]
    fn float_equal_is_bitwise_not_approximate() {
        let routine = make_routine(DataType::F32, MatchType::Equal, WidthFlags::B32, false).unwrap();
        let uv = UserValue::from_scalar(1.0f32);
        let mut out = flags();
        let bytes = 1.0000001f32.to_ne_bytes();
        assert_eq!(routine(&bytes, None, &uv, &mut out), 0);
        let exact = 1.0f32.to_ne_bytes();
        assert_eq!(routine(&exact, None, &uv, &mut out), 4);
    }

    #[test]
    fn byte_array_masked_equal() {
        let routine = make_routine(DataType::ByteArray, MatchType::Equal, WidthFlags::BYTE_ARRAY, false).unwrap();
        let uv = UserValue::from_masked_byte_array(vec![0x10, 0x00, 0x30], vec![0xFF, 0x00, 0xFF]).unwrap();
        let mut out = flags();
        let bytes = [0x10, 0x99, 0x30, 0x00];
        assert_eq!(routine(&bytes, None, &uv, &mut out), 3);
        assert!(out.contains(WidthFlags::BYTE_ARRAY));
    }

    #[test]
    fn string_equal_matches_prefix_bytes() {
        let routine = make_routine(DataType::String, MatchType::Equal, WidthFlags::STRING, false).unwrap();
        let uv = UserValue::from_string("hi");
        let mut out = flags();
        let bytes = b"hi there";
        assert_eq!(routine(bytes, None, &uv, &mut out), 2);
    }

    #[test]
    fn range_data_type_on_byte_array_is_not_well_formed() {
        assert!(make_routine(DataType::ByteArray, MatchType::Range, WidthFlags::BYTE_ARRAY, false).is_none());
    }

    #[test]
    fn any_number_unions_int_and_float_matches() {
        let routine = make_routine(DataType::AnyNumber, MatchType::Equal, WidthFlags::all_scalars(), false).unwrap();
        // Bytes interpreted as u8 == 0 everywhere won't also be float-equal to 0 bit-exact,
        // but this exercises that the union call succeeds without panicking.
        let uv = UserValue::from_scalar(0u8);
        let mut out = flags();
        let bytes = [0u8; 8];
        let matched = routine(&bytes, None, &uv, &mut out);
        assert!(matched >= 1);
    }
}
