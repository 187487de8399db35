//! Decoded quote types.
//!
//! A `Quote` holds whatever fields one record carried for a symbol; a
//! `QuoteBatch` holds every quote decoded from one physical message, in the order
//! the symbols were first seen, together with the soft warnings raised on the way.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::fields::FieldCode;
use crate::result::Result;

/// Fields of one symbol within one update. Only `symbol` is always present.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol (e.g., `AAPL`).
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<u32>,
    /// Exchange the bid is quoted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_id: Option<char>,
    /// Exchange the ask is quoted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_id: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_size: Option<u32>,
    /// `HH:MM:SS`, UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_time: Option<String>,
    /// `HH:MM:SS`, UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Tick direction character.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_close: Option<f64>,
    /// Primary exchange code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub island_bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub island_ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub island_volume: Option<u32>,
}

// Keeps the field list in one place for `merge` and `present_fields`.
macro_rules! for_each_field {
    ($mac:ident!($($args:tt)*)) => {
        $mac!($($args)*;
            bid => Bid,
            ask => Ask,
            last => Last,
            bid_size => BidSize,
            ask_size => AskSize,
            bid_id => BidId,
            ask_id => AskId,
            volume => Volume,
            last_size => LastSize,
            trade_time => TradeTime,
            quote_time => QuoteTime,
            high => High,
            low => Low,
            tick => Tick,
            prev_close => PrevClose,
            exchange => Exchange,
            island_bid => IslandBid,
            island_ask => IslandAsk,
            island_volume => IslandVolume
        )
    };
}

macro_rules! overwrite_present {
    ($dst:expr, $src:expr; $($field:ident => $code:ident),*) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field.clone();
            }
        )*
    };
}

macro_rules! clear_unlisted {
    ($quote:expr, $keep:expr; $($field:ident => $code:ident),*) => {
        $(
            if !$keep.contains(&FieldCode::$code) {
                $quote.$field = None;
            }
        )*
    };
}

macro_rules! collect_present {
    ($quote:expr, $out:expr; $($field:ident => $code:ident),*) => {
        $(
            if $quote.$field.is_some() {
                $out.push(FieldCode::$code);
            }
        )*
    };
}

/// Value of one tagged field, typed by its [`FieldLayout`](crate::fields::FieldLayout).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Float fields: prices.
    Price(f64),
    /// Integer fields: sizes and volumes.
    Count(u32),
    /// Time fields as `HH:MM:SS`.
    Time(String),
    /// Single character codes.
    Char(char),
}

impl Quote {
    /// Creates a quote with only the symbol set.
    pub fn new(symbol: impl Into<String>) -> Self {
        Quote {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Overwrites every field that `delta` carries; other fields are kept.
    pub fn merge(&mut self, delta: &Quote) {
        for_each_field!(overwrite_present!(self, delta));
    }

    /// Drops every field whose code is not in `keep`.
    pub fn retain_fields(&mut self, keep: &[FieldCode]) {
        for_each_field!(clear_unlisted!(self, keep));
    }

    /// Stores `value` under `field`. Fails if the value's type does not match the field.
    pub fn set(&mut self, field: FieldCode, value: FieldValue) -> Result<()> {
        use FieldValue::*;
        match (field, value) {
            (FieldCode::Bid, Price(v)) => self.bid = Some(v),
            (FieldCode::Ask, Price(v)) => self.ask = Some(v),
            (FieldCode::Last, Price(v)) => self.last = Some(v),
            (FieldCode::High, Price(v)) => self.high = Some(v),
            (FieldCode::Low, Price(v)) => self.low = Some(v),
            (FieldCode::PrevClose, Price(v)) => self.prev_close = Some(v),
            (FieldCode::IslandBid, Price(v)) => self.island_bid = Some(v),
            (FieldCode::IslandAsk, Price(v)) => self.island_ask = Some(v),
            (FieldCode::BidSize, Count(v)) => self.bid_size = Some(v),
            (FieldCode::AskSize, Count(v)) => self.ask_size = Some(v),
            (FieldCode::LastSize, Count(v)) => self.last_size = Some(v),
            (FieldCode::Volume, Count(v)) => self.volume = Some(v),
            (FieldCode::IslandVolume, Count(v)) => self.island_volume = Some(v),
            (FieldCode::TradeTime, Time(v)) => self.trade_time = Some(v),
            (FieldCode::QuoteTime, Time(v)) => self.quote_time = Some(v),
            (FieldCode::BidId, Char(v)) => self.bid_id = Some(v),
            (FieldCode::AskId, Char(v)) => self.ask_id = Some(v),
            (FieldCode::Tick, Char(v)) => self.tick = Some(v),
            (FieldCode::Exchange, Char(v)) => self.exchange = Some(v),
            (field, value) => {
                return Err(FeedError::Format(format!("{} cannot hold {:?}", field, value)));
            }
        }
        Ok(())
    }

    /// Current value of `field`, if present.
    pub fn value(&self, field: FieldCode) -> Option<FieldValue> {
        use FieldValue::*;
        match field {
            FieldCode::Bid => self.bid.map(Price),
            FieldCode::Ask => self.ask.map(Price),
            FieldCode::Last => self.last.map(Price),
            FieldCode::High => self.high.map(Price),
            FieldCode::Low => self.low.map(Price),
            FieldCode::PrevClose => self.prev_close.map(Price),
            FieldCode::IslandBid => self.island_bid.map(Price),
            FieldCode::IslandAsk => self.island_ask.map(Price),
            FieldCode::BidSize => self.bid_size.map(Count),
            FieldCode::AskSize => self.ask_size.map(Count),
            FieldCode::LastSize => self.last_size.map(Count),
            FieldCode::Volume => self.volume.map(Count),
            FieldCode::IslandVolume => self.island_volume.map(Count),
            FieldCode::TradeTime => self.trade_time.clone().map(Time),
            FieldCode::QuoteTime => self.quote_time.clone().map(Time),
            FieldCode::BidId => self.bid_id.map(Char),
            FieldCode::AskId => self.ask_id.map(Char),
            FieldCode::Tick => self.tick.map(Char),
            FieldCode::Exchange => self.exchange.map(Char),
            FieldCode::Symbol | FieldCode::Reserved17 | FieldCode::Reserved18 => None,
        }
    }

    /// Field codes present in this quote, in code order.
    pub fn present_fields(&self) -> Vec<FieldCode> {
        let mut fields = Vec::new();
        for_each_field!(collect_present!(self, fields));
        fields
    }
}

/// Non-fatal inconsistency noticed while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeWarning {
    /// The marker after the segment size was not 1.
    MarkerMismatch {
        /// Value found.
        found: u16,
        /// Offset of the marker.
        offset: usize,
    },
    /// A reserved field code (17 or 18) was present.
    ReservedField {
        /// The reserved code.
        code: u8,
        /// Symbol of the record carrying it.
        symbol: String,
    },
    /// The symbol is longer than the protocol convention allows.
    SymbolTooLong {
        /// The symbol as decoded.
        symbol: String,
        /// Its length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::MarkerMismatch { found, offset } => {
                write!(f, "unexpected marker value {} at offset {}, expected 1", found, offset)
            }
            DecodeWarning::ReservedField { code, symbol } => {
                write!(f, "reserved field code {} present for {}", code, symbol)
            }
            DecodeWarning::SymbolTooLong { symbol, len, max } => {
                write!(f, "symbol {:?} is {} bytes, longer than {}", symbol, len, max)
            }
        }
    }
}

/// Every quote decoded from one physical message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuoteBatch {
    quotes: Vec<Quote>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<DecodeWarning>,
}

impl QuoteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a quote. A quote for a symbol already in the batch replaces it in place.
    pub fn insert(&mut self, quote: Quote) {
        match self.quotes.iter_mut().find(|q| q.symbol == quote.symbol) {
            Some(existing) => *existing = quote,
            None => self.quotes.push(quote),
        }
    }

    /// Looks up the quote for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.symbol == symbol)
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// `true` if the batch holds no quotes.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Quotes in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.iter()
    }

    /// Symbols in first-seen order.
    pub fn symbols(&self) -> Vec<&str> {
        self.quotes.iter().map(|q| q.symbol.as_str()).collect()
    }

    /// Records a soft warning.
    pub fn push_warning(&mut self, warning: DecodeWarning) {
        self.warnings.push(warning);
    }

    /// Soft warnings raised while decoding this batch.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }
}

impl FromIterator<Quote> for QuoteBatch {
    fn from_iter<I: IntoIterator<Item = Quote>>(iter: I) -> Self {
        let mut batch = QuoteBatch::new();
        for quote in iter {
            batch.insert(quote);
        }
        batch
    }
}

impl IntoIterator for QuoteBatch {
    type Item = Quote;
    type IntoIter = std::vec::IntoIter<Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.into_iter()
    }
}
