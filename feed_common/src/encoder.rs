//! Record encoder, the inverse of [`RecordDecoder`](crate::decoder::RecordDecoder).
//!
//! The live feed never needs to encode; this exists for the simulator, tests and
//! benchmarks. Prices are narrowed to `f32` because that is all the wire carries.
use byteorder::{BigEndian, WriteBytesExt};
use chrono::{NaiveTime, Timelike};

use crate::error::FeedError;
use crate::fields::{FieldCode, FieldLayout};
use crate::float_codec;
use crate::net::{MARKER, STATUS_QUOTE, TERMINATOR};
use crate::quote::{FieldValue, Quote};
use crate::result::Result;

/// Builds quote records and messages.
pub struct RecordEncoder;

impl RecordEncoder {
    /// Encodes a single record: status byte, segment and terminator.
    pub fn encode_record(quote: &Quote) -> Result<Vec<u8>> {
        let symbol = quote.symbol.as_bytes();
        let mut segment = Vec::with_capacity(32);
        segment.write_u16::<BigEndian>(MARKER)?;
        segment.write_u8(0)?;
        segment.write_u16::<BigEndian>(symbol_len(symbol)?)?;
        segment.extend_from_slice(symbol);
        for field in quote.present_fields() {
            write_field(&mut segment, quote, field)?;
        }

        let size = u16::try_from(segment.len())
            .map_err(|_| FeedError::Format(format!("segment of {} bytes too long", segment.len())))?;
        let mut record = Vec::with_capacity(segment.len() + 5);
        record.write_u8(STATUS_QUOTE)?;
        record.write_u16::<BigEndian>(size)?;
        record.extend_from_slice(&segment);
        record.write_u16::<BigEndian>(TERMINATOR)?;
        Ok(record)
    }

    /// Concatenates one record per quote into a single message.
    pub fn encode_message<'a, I>(quotes: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = &'a Quote>,
    {
        let mut message = Vec::new();
        for quote in quotes {
            message.extend_from_slice(&Self::encode_record(quote)?);
        }
        Ok(message)
    }
}

fn symbol_len(symbol: &[u8]) -> Result<u16> {
    u16::try_from(symbol.len())
        .map_err(|_| FeedError::Format(format!("symbol of {} bytes too long", symbol.len())))
}

fn write_field(out: &mut Vec<u8>, quote: &Quote, field: FieldCode) -> Result<()> {
    let (Some(layout), Some(value)) = (field.layout(), quote.value(field)) else {
        return Ok(());
    };
    out.write_u8(field.code())?;
    if layout == FieldLayout::SkipUInt {
        out.write_u32::<BigEndian>(0)?;
    }
    match value {
        FieldValue::Price(price) => write_float(out, price),
        FieldValue::Count(count) => {
            out.write_u32::<BigEndian>(count)?;
            Ok(())
        }
        FieldValue::Time(text) => write_time(out, &text),
        FieldValue::Char(c) => write_char(out, c),
    }
}

fn write_float(out: &mut Vec<u8>, value: f64) -> Result<()> {
    let bits = float_codec::encode(value as f32);
    let word = u32::from_str_radix(&bits, 2)
        .map_err(|e| FeedError::Format(format!("bad float bit string {:?}: {}", bits, e)))?;
    out.write_u32::<BigEndian>(word)?;
    Ok(())
}

fn write_char(out: &mut Vec<u8>, c: char) -> Result<()> {
    let v = u16::try_from(u32::from(c))
        .map_err(|_| FeedError::Format(format!("character {:?} does not fit in 16 bits", c)))?;
    out.write_u16::<BigEndian>(v)?;
    Ok(())
}

fn write_time(out: &mut Vec<u8>, text: &str) -> Result<()> {
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
        .map_err(|e| FeedError::Format(format!("bad time {:?}: {}", text, e)))?;
    out.write_u32::<BigEndian>(time.num_seconds_from_midnight())?;
    Ok(())
}
