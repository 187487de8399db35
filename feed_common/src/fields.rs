//! Field codes of the quote record format.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Single-byte tag identifying the attribute that follows in a record.
///
/// `Symbol` is only meaningful in a subscription request; the symbol of a
/// record travels in its header, never as a tagged field.
#[allow(missing_docs)]
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
    EnumIter,
)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FieldCode {
    Symbol = 0,
    Bid = 1,
    Ask = 2,
    Last = 3,
    BidSize = 4,
    AskSize = 5,
    BidId = 6,
    AskId = 7,
    Volume = 8,
    LastSize = 9,
    TradeTime = 10,
    QuoteTime = 11,
    High = 12,
    Low = 13,
    Tick = 14,
    PrevClose = 15,
    Exchange = 16,
    Reserved17 = 17,
    Reserved18 = 18,
    IslandBid = 19,
    IslandAsk = 20,
    IslandVolume = 21,
}

/// How a field's payload is laid out after its code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLayout {
    /// 4-byte float word.
    Float,
    /// 4-byte big-endian unsigned integer.
    UInt,
    /// 4 reserved bytes followed by a 4-byte unsigned integer.
    SkipUInt,
    /// 4-byte seconds value rendered as `HH:MM:SS`.
    Time,
    /// 2-byte value rendered as one character.
    Char,
    /// Nothing follows.
    Empty,
}

impl FieldLayout {
    /// Total bytes consumed after the code byte.
    pub fn width(self) -> usize {
        match self {
            FieldLayout::Float | FieldLayout::UInt | FieldLayout::Time => 4,
            FieldLayout::SkipUInt => 8,
            FieldLayout::Char => 2,
            FieldLayout::Empty => 0,
        }
    }
}

impl FieldCode {
    /// Highest code a subscription may request.
    pub const MAX: u8 = 21;

    /// Maps a wire byte to a field code.
    pub fn from_u8(v: u8) -> Option<Self> {
        use FieldCode::*;
        let code = match v {
            0 => Symbol,
            1 => Bid,
            2 => Ask,
            3 => Last,
            4 => BidSize,
            5 => AskSize,
            6 => BidId,
            7 => AskId,
            8 => Volume,
            9 => LastSize,
            10 => TradeTime,
            11 => QuoteTime,
            12 => High,
            13 => Low,
            14 => Tick,
            15 => PrevClose,
            16 => Exchange,
            17 => Reserved17,
            18 => Reserved18,
            19 => IslandBid,
            20 => IslandAsk,
            21 => IslandVolume,
            _ => return None,
        };
        Some(code)
    }

    /// Wire byte of this code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Payload layout, or `None` for codes that never appear inside a record.
    pub fn layout(self) -> Option<FieldLayout> {
        use FieldCode::*;
        match self {
            Symbol => None,
            Bid | Ask | Last | High | Low | PrevClose | IslandBid | IslandAsk => {
                Some(FieldLayout::Float)
            }
            BidSize | AskSize | LastSize => Some(FieldLayout::UInt),
            Volume | IslandVolume => Some(FieldLayout::SkipUInt),
            TradeTime | QuoteTime => Some(FieldLayout::Time),
            BidId | AskId | Tick | Exchange => Some(FieldLayout::Char),
            Reserved17 | Reserved18 => Some(FieldLayout::Empty),
        }
    }
}
