//! Quote record decoder.
//!
//! One physical message is a run of records, each laid out as:
//!
//! ```text
//! [status u8][size u16][marker u16][pad u8][sym_len u16][symbol ..][fields ..][terminator u16]
//!            |<------------------------- size ------------------------->|
//! ```
//!
//! All integers are big-endian. `size` counts the bytes from the marker through the
//! last field; the terminator follows the segment. Fields are a code byte followed by
//! a code-specific payload (see [`FieldCode`]). Structural problems abort the whole
//! message; consistency problems are reported as [`DecodeWarning`]s unless the
//! matching [`ConsistencyPolicy`] is `Reject`.
use byteorder::{BigEndian, ByteOrder};
use chrono::DateTime;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::fields::{FieldCode, FieldLayout};
use crate::float_codec::{ExponentBitOrder, FloatCodec};
use crate::net::{MARKER, MAX_SYMBOL_LEN, TERMINATOR};
use crate::quote::{DecodeWarning, FieldValue, Quote, QuoteBatch};
use crate::result::Result;

/// What to do when a record is well-formed but not what the protocol promises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyPolicy {
    /// Log a warning, keep decoding.
    #[default]
    Warn,
    /// Fail the message.
    Reject,
}

/// Decoder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Longest symbol accepted without complaint.
    pub max_symbol_len: usize,
    /// Handling of symbols longer than `max_symbol_len`.
    pub symbol_policy: ConsistencyPolicy,
    /// Handling of a marker value other than 1.
    pub marker_policy: ConsistencyPolicy,
    /// Exponent bit order for float fields.
    pub exponent_order: ExponentBitOrder,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_symbol_len: MAX_SYMBOL_LEN,
            symbol_policy: ConsistencyPolicy::Warn,
            marker_policy: ConsistencyPolicy::Warn,
            exponent_order: ExponentBitOrder::MsbFirst,
        }
    }
}

/// Bounds-checked big-endian cursor over a message buffer.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(FeedError::InsufficientData {
                offset: self.pos,
                need: n,
                have: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// Decodes framed quote messages into [`QuoteBatch`]es.
#[derive(Debug, Clone, Default)]
pub struct RecordDecoder {
    options: DecoderOptions,
    codec: FloatCodec,
}

impl RecordDecoder {
    /// Creates a decoder with the given options.
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            codec: FloatCodec::new(options.exponent_order),
        }
    }

    /// Options this decoder was built with.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decodes every record in `buffer`. Any structural error fails the whole
    /// message and no partial batch is returned.
    pub fn decode(&self, buffer: &[u8]) -> Result<QuoteBatch> {
        let mut reader = ByteReader::new(buffer);
        let mut batch = QuoteBatch::new();

        while !reader.is_at_end() {
            let quote = self.decode_record(&mut reader, &mut batch)?;
            batch.insert(quote);
        }

        debug!(
            "Decoded {} bytes into {} quotes: {:?}",
            buffer.len(),
            batch.len(),
            batch.symbols()
        );
        Ok(batch)
    }

    fn decode_record(&self, r: &mut ByteReader<'_>, batch: &mut QuoteBatch) -> Result<Quote> {
        r.skip(1)?;
        let size = r.read_u16()? as usize;
        let end = r.pos + size;
        if end > r.buf.len() {
            return Err(FeedError::InsufficientData {
                offset: r.pos,
                need: size,
                have: r.buf.len(),
            });
        }

        let marker_offset = r.pos;
        let marker = r.read_u16()?;
        if marker != MARKER {
            match self.options.marker_policy {
                ConsistencyPolicy::Reject => return Err(FeedError::BadMarker { found: marker }),
                ConsistencyPolicy::Warn => report(
                    batch,
                    DecodeWarning::MarkerMismatch {
                        found: marker,
                        offset: marker_offset,
                    },
                ),
            }
        }

        r.skip(1)?;
        let sym_len = r.read_u16()? as usize;
        let symbol = String::from_utf8_lossy(r.take(sym_len)?).into_owned();
        if sym_len > self.options.max_symbol_len {
            match self.options.symbol_policy {
                ConsistencyPolicy::Reject => {
                    return Err(FeedError::SymbolTooLong {
                        len: sym_len,
                        max: self.options.max_symbol_len,
                    });
                }
                ConsistencyPolicy::Warn => report(
                    batch,
                    DecodeWarning::SymbolTooLong {
                        symbol: symbol.clone(),
                        len: sym_len,
                        max: self.options.max_symbol_len,
                    },
                ),
            }
        }

        let mut quote = Quote::new(symbol);
        while r.pos < end {
            self.decode_field(r, &mut quote, batch)?;
        }
        if r.pos != end {
            return Err(FeedError::ParityMismatch {
                cursor: r.pos,
                expected: end,
            });
        }

        let terminator_offset = r.pos;
        let terminator = r.read_u16()?;
        if terminator != TERMINATOR {
            return Err(FeedError::BadTerminator {
                found: terminator,
                offset: terminator_offset,
            });
        }
        Ok(quote)
    }

    fn decode_field(
        &self,
        r: &mut ByteReader<'_>,
        quote: &mut Quote,
        batch: &mut QuoteBatch,
    ) -> Result<()> {
        let offset = r.pos;
        let code = r.read_u8()?;
        let field = FieldCode::from_u8(code).ok_or(FeedError::UnknownFieldCode { code, offset })?;
        // `Symbol` only travels in the record header.
        let layout = field.layout().ok_or(FeedError::UnknownFieldCode { code, offset })?;

        let value = match layout {
            FieldLayout::Float => FieldValue::Price(self.read_float(r)?),
            FieldLayout::UInt => FieldValue::Count(r.read_u32()?),
            FieldLayout::SkipUInt => {
                r.skip(4)?;
                FieldValue::Count(r.read_u32()?)
            }
            FieldLayout::Time => FieldValue::Time(read_time(r)?),
            FieldLayout::Char => FieldValue::Char(read_char(r)?),
            FieldLayout::Empty => {
                report(
                    batch,
                    DecodeWarning::ReservedField {
                        code,
                        symbol: quote.symbol.clone(),
                    },
                );
                return Ok(());
            }
        };
        quote.set(field, value)
    }

    fn read_float(&self, r: &mut ByteReader<'_>) -> Result<f64> {
        let word = r.read_u32()?;
        self.codec.decode_word(word)
    }
}

fn report(batch: &mut QuoteBatch, warning: DecodeWarning) {
    warn!("{}", warning);
    batch.push_warning(warning);
}

fn read_char(r: &mut ByteReader<'_>) -> Result<char> {
    let v = r.read_u16()?;
    Ok(char::from_u32(u32::from(v)).unwrap_or(char::REPLACEMENT_CHARACTER))
}

fn read_time(r: &mut ByteReader<'_>) -> Result<String> {
    let secs = r.read_u32()?;
    format_time(secs)
}

/// Renders a seconds value as `HH:MM:SS` in UTC.
pub fn format_time(secs: u32) -> Result<String> {
    DateTime::from_timestamp(i64::from(secs), 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .ok_or_else(|| FeedError::Format(format!("time value {} out of range", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::STATUS_QUOTE;

    /// Builds one record by hand: `fields` is the raw field area.
    fn record(symbol: &[u8], fields: &[u8]) -> Vec<u8> {
        let size = 2 + 1 + 2 + symbol.len() + fields.len();
        let mut msg = vec![STATUS_QUOTE];
        msg.extend_from_slice(&(size as u16).to_be_bytes());
        msg.extend_from_slice(&1u16.to_be_bytes());
        msg.push(0);
        msg.extend_from_slice(&(symbol.len() as u16).to_be_bytes());
        msg.extend_from_slice(symbol);
        msg.extend_from_slice(fields);
        msg.extend_from_slice(&TERMINATOR.to_be_bytes());
        msg
    }

    #[test]
    fn test_decode_bid() {
        let mut fields = vec![1u8];
        fields.extend_from_slice(&1.5f32.to_bits().to_be_bytes());
        let batch = RecordDecoder::default().decode(&record(b"AAPL", &fields)).unwrap();

        assert_eq!(batch.len(), 1);
        let quote = batch.get("AAPL").unwrap();
        assert_eq!(quote.bid, Some(1.5));
        assert_eq!(quote.present_fields(), vec![FieldCode::Bid]);
        assert!(batch.warnings().is_empty());
    }

    #[test]
    fn test_every_field_consumes_its_layout_width() {
        use strum::IntoEnumIterator;

        for field in FieldCode::iter() {
            let Some(layout) = field.layout() else { continue };
            if layout == FieldLayout::Empty {
                continue;
            }
            let mut fields = vec![field.code()];
            fields.resize(1 + layout.width(), 0);
            let batch = RecordDecoder::default().decode(&record(b"A", &fields)).unwrap();
            assert_eq!(batch.get("A").unwrap().present_fields(), vec![field], "{}", field);

            fields.pop();
            assert!(RecordDecoder::default().decode(&record(b"A", &fields)).is_err(), "{}", field);
        }
    }

    #[test]
    fn test_skipped_volume_and_chars() {
        let mut fields = vec![8u8, 0xde, 0xad, 0xbe, 0xef];
        fields.extend_from_slice(&12_345u32.to_be_bytes());
        fields.extend_from_slice(&[14, 0, b'+']);
        fields.extend_from_slice(&[16, 0, b'Q']);
        let batch = RecordDecoder::default().decode(&record(b"MSFT", &fields)).unwrap();

        let quote = batch.get("MSFT").unwrap();
        assert_eq!(quote.volume, Some(12_345));
        assert_eq!(quote.tick, Some('+'));
        assert_eq!(quote.exchange, Some('Q'));
    }

    #[test]
    fn test_time_format() {
        assert_eq!(format_time(0).unwrap(), "00:00:00");
        assert_eq!(format_time(34_200).unwrap(), "09:30:00");
        assert_eq!(format_time(86_399).unwrap(), "23:59:59");
        assert_eq!(format_time(86_400 + 61).unwrap(), "00:01:01");
    }

    #[test]
    fn test_surrogate_char_is_replaced() {
        let fields = [6u8, 0xd8, 0x00];
        let batch = RecordDecoder::default().decode(&record(b"X", &fields)).unwrap();
        assert_eq!(batch.get("X").unwrap().bid_id, Some(char::REPLACEMENT_CHARACTER));
    }

    #[test]
    fn test_symbol_code_inside_record_is_unknown() {
        let fields = [0u8];
        let result = RecordDecoder::default().decode(&record(b"X", &fields));
        assert!(matches!(result, Err(FeedError::UnknownFieldCode { code: 0, .. })));
    }

    #[test]
    fn test_field_overrunning_segment_fails_parity() {
        // Size claims one byte less than the float payload actually uses.
        let mut fields = vec![1u8];
        fields.extend_from_slice(&2.0f32.to_bits().to_be_bytes());
        let mut msg = record(b"X", &fields);
        let size = u16::from_be_bytes([msg[1], msg[2]]) - 1;
        msg[1..3].copy_from_slice(&size.to_be_bytes());

        let result = RecordDecoder::default().decode(&msg);
        assert!(matches!(result, Err(FeedError::ParityMismatch { .. })));
    }

    #[test]
    fn test_truncated_header() {
        let result = RecordDecoder::default().decode(&[STATUS_QUOTE, 0]);
        assert!(matches!(result, Err(FeedError::InsufficientData { .. })));
    }

    #[test]
    fn test_empty_buffer_is_empty_batch() {
        let batch = RecordDecoder::default().decode(&[]).unwrap();
        assert!(batch.is_empty());
    }
}
