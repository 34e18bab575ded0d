//! Command-line argument grammar for a single scan pass.

use clap::{Parser, ValueEnum};

use crate::region::RegionLevel;
use crate::scan_types::{DataType, MatchType};

/// Run one scan pass against a target process and print the matches.
#[derive(Debug, Parser)]
#[command(name = "vmscan", version, about)]
pub struct Args {
    /// Target process id.
    pub pid: i32,

    /// The value to search for (e.g. `42`, `10..20`, `0xdeadbeef`,
    /// `0xAA??BB` for a masked byte pattern, or a bare string).
    pub value: String,

    /// Interpretation applied to candidate bytes before comparison.
    #[arg(long, value_enum, default_value = "i32")]
    pub data_type: CliDataType,

    /// Predicate applied between the candidate and the value.
    #[arg(long, value_enum, default_value = "equal")]
    pub match_type: CliMatchType,

    /// Which mappings to visit.
    #[arg(long, value_enum, default_value = "heap-stack-only")]
    pub region_level: CliRegionLevel,

    /// Byte-swap candidates before comparing (for a non-native-endian target).
    #[arg(long)]
    pub reverse_endianness: bool,

    /// Probe stride in bytes.
    #[arg(long, default_value_t = 1)]
    pub step: usize,
}

/// `clap`-friendly mirror of [`DataType`]; converted via [`Into`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDataType {
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
    AnyInt,
    AnyFloat,
    AnyNumber,
    ByteArray,
    String,
}

impl From<CliDataType> for DataType {
    fn from(v: CliDataType) -> Self {
        match v {
            CliDataType::I8 => DataType::I8,
            CliDataType::I16 => DataType::I16,
            CliDataType::I32 => DataType::I32,
            CliDataType::I64 => DataType::I64,
            CliDataType::U8 => DataType::U8,
            CliDataType::U16 => DataType::U16,
            CliDataType::U32 => DataType::U32,
            CliDataType::U64 => DataType::U64,
            CliDataType::F32 => DataType::F32,
            CliDataType::F64 => DataType::F64,
            CliDataType::AnyInt => DataType::AnyInt,
            CliDataType::AnyFloat => DataType::AnyFloat,
            CliDataType::AnyNumber => DataType::AnyNumber,
            CliDataType::ByteArray => DataType::ByteArray,
            CliDataType::String => DataType::String,
        }
    }
}

/// `clap`-friendly mirror of [`MatchType`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliMatchType {
    Equal,
    NotEqual,
    Greater,
    Less,
    Range,
    Any,
    Changed,
    NotChanged,
    Increased,
    Decreased,
    IncreasedBy,
    DecreasedBy,
}

impl From<CliMatchType> for MatchType {
    fn from(v: CliMatchType) -> Self {
        match v {
            CliMatchType::Equal => MatchType::Equal,
            CliMatchType::NotEqual => MatchType::NotEqual,
            CliMatchType::Greater => MatchType::Greater,
            CliMatchType::Less => MatchType::Less,
            CliMatchType::Range => MatchType::Range,
            CliMatchType::Any => MatchType::Any,
            CliMatchType::Changed => MatchType::Changed,
            CliMatchType::NotChanged => MatchType::NotChanged,
            CliMatchType::Increased => MatchType::Increased,
            CliMatchType::Decreased => MatchType::Decreased,
            CliMatchType::IncreasedBy => MatchType::IncreasedBy,
            CliMatchType::DecreasedBy => MatchType::DecreasedBy,
        }
    }
}

/// `clap`-friendly mirror of [`RegionLevel`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliRegionLevel {
    HeapStackOnly,
    Writable,
    AllReadable,
}

impl From<CliRegionLevel> for RegionLevel {
    fn from(v: CliRegionLevel) -> Self {
        match v {
            CliRegionLevel::HeapStackOnly => RegionLevel::HeapStackOnly,
            CliRegionLevel::Writable => RegionLevel::Writable,
            CliRegionLevel::AllReadable => RegionLevel::AllReadable,
        }
    }
}
