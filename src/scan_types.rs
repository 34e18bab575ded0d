//! Scan vocabulary: the data types a comparison is made over, the predicates
//! available, and the width bitset a byte-array/string match narrows to (§3).

use bitflags::bitflags;

/// The interpretation applied to a candidate byte window before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Any of the signed/unsigned integer widths the flags select.
    AnyInt,
    /// Either float width the flags select.
    AnyFloat,
    /// Any numeric type at all (integer or float).
    AnyNumber,
    /// A fixed-length byte pattern, optionally with a wildcard mask.
    ByteArray,
    /// A byte pattern interpreted as text (no implicit wildcard support).
    String,
}

impl DataType {
    /// The fixed comparison width in bytes, or `None` for the variable-width
    /// `ByteArray`/`String` types (whose width is the pattern's own length).
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::I8 | DataType::U8 => Some(1),
            DataType::I16 | DataType::U16 => Some(2),
            DataType::I32 | DataType::U32 | DataType::F32 => Some(4),
            DataType::I64 | DataType::U64 | DataType::F64 => Some(8),
            DataType::AnyInt | DataType::AnyFloat | DataType::AnyNumber => None,
            DataType::ByteArray | DataType::String => None,
        }
    }

    /// `true` for the float-only types, where `Equal`/`NotEqual` compare the
    /// exact bit pattern rather than going through `PartialOrd` (§4.5 edge
    /// case) — a candidate differing by even one rounding ulp is a miss.
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64 | DataType::AnyFloat)
    }
}

/// The predicate applied between a candidate value and the user's operand(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    Equal,
    NotEqual,
    Greater,
    Less,
    /// Inclusive of both bounds; bounds are sorted before comparison so the
    /// user's argument order does not matter (§9 Open Question, resolved).
    Range,
    /// Matches every readable candidate; used for the unconstrained first
    /// scan that seeds a session's match set.
    Any,
    /// Current value differs from the previous snapshot.
    Changed,
    /// Current value equals the previous snapshot.
    NotChanged,
    /// Current value is strictly greater than the previous snapshot.
    Increased,
    /// Current value is strictly less than the previous snapshot.
    Decreased,
    /// `current - previous == operand`, using wrapping arithmetic on
    /// unsigned integer types (§4.5).
    IncreasedBy,
    /// `previous - current == operand`, using wrapping arithmetic on
    /// unsigned integer types (§4.5).
    DecreasedBy,
}

impl MatchType {
    /// `true` if this predicate requires a previous snapshot value to
    /// evaluate. A refine scan with no prior snapshot for a given address
    /// cannot apply these and the match is dropped (§4.7).
    pub fn needs_old_value(self) -> bool {
        matches!(
            self,
            MatchType::Changed
                | MatchType::NotChanged
                | MatchType::Increased
                | MatchType::Decreased
                | MatchType::IncreasedBy
                | MatchType::DecreasedBy
        )
    }
}

bitflags! {
    /// The set of candidate widths a byte-array or string match is willing
    /// to try at a given offset, before the comparator narrows to the one
    /// that fits the user's literal (§3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WidthFlags: u32 {
        const B8         = 0b0000_0001;
        const B16        = 0b0000_0010;
        const B32        = 0b0000_0100;
        const B64        = 0b0000_1000;
        const BYTE_ARRAY = 0b0001_0000;
        const STRING     = 0b0010_0000;
    }
}

impl WidthFlags {
    /// The flag set matching every scalar width, with no byte-array/string
    /// component. Used as the default for a bare numeric scan.
    pub fn all_scalars() -> Self {
        WidthFlags::B8 | WidthFlags::B16 | WidthFlags::B32 | WidthFlags::B64
    }
}
