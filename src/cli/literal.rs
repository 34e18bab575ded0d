//! Minimal value-literal parsing (§6): just enough to exercise a scan from
//! a terminal. The full literal grammar is an external collaborator's
//! concern; this covers decimal/hex integers, `low..high` ranges, decimal
//! floats, `0x`-prefixed hex byte arrays with `?`/`??` wildcards, and raw
//! strings.

use crate::error::ScanError;
use crate::scan_types::{DataType, WidthFlags};
use crate::value::{ScalarBounds, ScalarField, UserValue};

fn parse_int_literal(s: &str) -> Result<i128, ScanError> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).map_err(|e| ScanError::InvalidArguments { reason: e.to_string() })
    } else {
        s.parse::<i128>().map_err(|e| ScanError::InvalidArguments { reason: e.to_string() })
    }
}

fn parse_range(s: &str) -> Option<(&str, &str)> {
    s.split_once("..")
}

/// A point value for `AnyInt`/`AnyNumber`: every integer width's bounds slot
/// is populated with `v`'s truncation to that width, since `any_int_routine`
/// tries whichever widths `ScanOptions.user_width_flags` selects (§4.5) and
/// each must see the user's value at its own width, not a zeroed slot.
fn any_width_scalar(v: i128) -> UserValue {
    let mut bounds = ScalarBounds::default();
    u8::store_bounds(&mut bounds, v as u8, v as u8);
    u16::store_bounds(&mut bounds, v as u16, v as u16);
    u32::store_bounds(&mut bounds, v as u32, v as u32);
    u64::store_bounds(&mut bounds, v as u64, v as u64);
    UserValue { bounds, pattern: None, mask: None, string: None, width_flags: WidthFlags::all_scalars() }
}

/// The `AnyInt`/`AnyNumber` analogue of [`any_width_scalar`] for a `lo..hi` range.
fn any_width_range(lo: i128, hi: i128) -> UserValue {
    let mut bounds = ScalarBounds::default();
    u8::store_bounds(&mut bounds, lo as u8, hi as u8);
    u16::store_bounds(&mut bounds, lo as u16, hi as u16);
    u32::store_bounds(&mut bounds, lo as u32, hi as u32);
    u64::store_bounds(&mut bounds, lo as u64, hi as u64);
    UserValue { bounds, pattern: None, mask: None, string: None, width_flags: WidthFlags::all_scalars() }
}

/// Stores `v` in the `ScalarBounds` slot matching `data_type`'s declared
/// width, so a routine built for that exact `DataType` (which reads its own
/// type's slot via [`UserValue::range_for`]) sees the user's value rather
/// than an always-zero `i64` slot.
fn int_scalar(data_type: DataType, v: i128) -> UserValue {
    match data_type {
        DataType::I8 => UserValue::from_scalar(v as i8),
        DataType::U8 => UserValue::from_scalar(v as u8),
        DataType::I16 => UserValue::from_scalar(v as i16),
        DataType::U16 => UserValue::from_scalar(v as u16),
        DataType::I32 => UserValue::from_scalar(v as i32),
        DataType::U32 => UserValue::from_scalar(v as u32),
        DataType::I64 => UserValue::from_scalar(v as i64),
        DataType::U64 => UserValue::from_scalar(v as u64),
        DataType::AnyInt | DataType::AnyNumber => any_width_scalar(v),
        DataType::F32 | DataType::F64 | DataType::AnyFloat | DataType::ByteArray | DataType::String => {
            unreachable!("int_scalar is only reached for integer data types")
        }
    }
}

/// The range analogue of [`int_scalar`].
fn int_range(data_type: DataType, lo: i128, hi: i128) -> UserValue {
    match data_type {
        DataType::I8 => UserValue::from_range(lo as i8, hi as i8),
        DataType::U8 => UserValue::from_range(lo as u8, hi as u8),
        DataType::I16 => UserValue::from_range(lo as i16, hi as i16),
        DataType::U16 => UserValue::from_range(lo as u16, hi as u16),
        DataType::I32 => UserValue::from_range(lo as i32, hi as i32),
        DataType::U32 => UserValue::from_range(lo as u32, hi as u32),
        DataType::I64 => UserValue::from_range(lo as i64, hi as i64),
        DataType::U64 => UserValue::from_range(lo as u64, hi as u64),
        DataType::AnyInt | DataType::AnyNumber => any_width_range(lo, hi),
        DataType::F32 | DataType::F64 | DataType::AnyFloat | DataType::ByteArray | DataType::String => {
            unreachable!("int_range is only reached for integer data types")
        }
    }
}

/// A masked byte pattern and its wildcard mask, parsed from a `0x`-prefixed
/// even-length hex literal where `?`/`??` positions are wildcard bits.
fn parse_byte_array(s: &str) -> Result<(Vec<u8>, Vec<u8>), ScanError> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ScanError::InvalidArguments { reason: "byte array literal must be 0x-prefixed".into() })?;
    if hex.len() % 2 != 0 {
        return Err(ScanError::InvalidArguments { reason: "byte array literal must have even length".into() });
    }
    let mut pattern = Vec::with_capacity(hex.len() / 2);
    let mut mask = Vec::with_capacity(hex.len() / 2);
    let chars: Vec<char> = hex.chars().collect();
    for pair in chars.chunks(2) {
        let (hi, lo) = (pair[0], pair[1]);
        if hi == '?' && lo == '?' {
            pattern.push(0);
            mask.push(0x00);
        } else {
            let byte_str: String = [hi, lo].iter().collect();
            let byte = u8::from_str_radix(&byte_str, 16)
                .map_err(|e| ScanError::InvalidArguments { reason: e.to_string() })?;
            pattern.push(byte);
            mask.push(0xFF);
        }
    }
    Ok((pattern, mask))
}

/// Parses `text` as a [`UserValue`] appropriate for `data_type`.
pub fn parse_literal(data_type: DataType, text: &str) -> Result<UserValue, ScanError> {
    match data_type {
        DataType::ByteArray => {
            let (pattern, mask) = parse_byte_array(text)?;
            if mask.iter().all(|&m| m == 0xFF) {
                Ok(UserValue::from_byte_array(pattern))
            } else {
                UserValue::from_masked_byte_array(pattern, mask)
                    .ok_or_else(|| ScanError::InvalidArguments { reason: "mask/pattern length mismatch".into() })
            }
        }
        DataType::String => Ok(UserValue::from_string(text.to_owned())),
        DataType::F32 | DataType::F64 | DataType::AnyFloat => {
            if let Some((lo, hi)) = parse_range(text) {
                let lo: f64 = lo.trim().parse().map_err(|e: std::num::ParseFloatError| ScanError::InvalidArguments { reason: e.to_string() })?;
                let hi: f64 = hi.trim().parse().map_err(|e: std::num::ParseFloatError| ScanError::InvalidArguments { reason: e.to_string() })?;
                Ok(UserValue::from_range(lo, hi))
            } else {
                let v: f64 = text.trim().parse().map_err(|e: std::num::ParseFloatError| ScanError::InvalidArguments { reason: e.to_string() })?;
                Ok(UserValue::from_scalar(v))
            }
        }
        _ => {
            if let Some((lo, hi)) = parse_range(text) {
                let lo = parse_int_literal(lo)?;
                let hi = parse_int_literal(hi)?;
                Ok(int_range(data_type, lo, hi))
            } else {
                let v = parse_int_literal(text)?;
                Ok(int_scalar(data_type, v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_scalar() {
        let uv = parse_literal(DataType::I32, "42").unwrap();
        assert_eq!(uv.range_for::<i32>(), (42, 42));
    }

    #[test]
    fn parses_hex_scalar() {
        let uv = parse_literal(DataType::I32, "0xFF").unwrap();
        assert_eq!(uv.range_for::<i32>(), (255, 255));
    }

    #[test]
    fn parses_range() {
        let uv = parse_literal(DataType::U16, "10..20").unwrap();
        assert_eq!(uv.range_for::<u16>(), (10, 20));
    }

    #[test]
    fn parses_scalar_into_the_matching_width_slot_not_always_i64() {
        let uv = parse_literal(DataType::U8, "200").unwrap();
        assert_eq!(uv.range_for::<u8>(), (200, 200));
        // The bug under test stored everything in the i64 slot regardless of
        // data_type, leaving every other width's slot at its zeroed default.
        assert_eq!(uv.range_for::<i64>(), (0, 0));
    }

    #[test]
    fn parses_range_into_the_matching_width_slot() {
        let uv = parse_literal(DataType::I16, "-5..5").unwrap();
        assert_eq!(uv.range_for::<i16>(), (-5, 5));
    }

    #[test]
    fn any_int_literal_populates_every_integer_width_slot() {
        let uv = parse_literal(DataType::AnyInt, "7").unwrap();
        assert_eq!(uv.range_for::<u8>(), (7, 7));
        assert_eq!(uv.range_for::<u16>(), (7, 7));
        assert_eq!(uv.range_for::<u32>(), (7, 7));
        assert_eq!(uv.range_for::<u64>(), (7, 7));
        assert_eq!(uv.width_flags, WidthFlags::all_scalars());
    }

    #[test]
    fn any_number_range_populates_every_integer_width_slot() {
        let uv = parse_literal(DataType::AnyNumber, "1..9").unwrap();
        assert_eq!(uv.range_for::<u8>(), (1, 9));
        assert_eq!(uv.range_for::<u32>(), (1, 9));
    }

    #[test]
    fn parses_masked_byte_array() {
        let uv = parse_literal(DataType::ByteArray, "0xAA??BB").unwrap();
        assert_eq!(uv.pattern.as_deref(), Some([0xAA, 0x00, 0xBB].as_slice()));
        assert_eq!(uv.mask.as_deref(), Some([0xFF, 0x00, 0xFF].as_slice()));
    }

    #[test]
    fn rejects_odd_length_byte_array() {
        assert!(parse_literal(DataType::ByteArray, "0xAAB").is_err());
    }

    #[test]
    fn parses_float_scalar() {
        let uv = parse_literal(DataType::F32, "3.5").unwrap();
        assert_eq!(uv.range_for::<f64>(), (3.5, 3.5));
    }
}
