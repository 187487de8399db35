//! Decoder for the feed's 32-bit floating point fields.
//!
//! Prices travel as a 32-bit word laid out as sign (1 bit), biased exponent
//! (8 bits) and mantissa fraction (23 bits). The codec works on the textual bit
//! string form of that word, so the result does not depend on the host byte order.
//! There is no special handling for an all-zero or all-one exponent: every
//! pattern decodes as `sign * (1 + fraction) * 2^(exponent - 127)`.
use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::result::Result;

/// Number of characters in an encoded float.
pub const FLOAT_BITS: usize = 32;
/// Exponent bias.
pub const EXPONENT_BIAS: i32 = 127;

const EXPONENT_RANGE: std::ops::Range<usize> = 1..9;
const MANTISSA_START: usize = 9;

/// How the eight exponent characters are turned into an integer.
///
/// Historical captures were decoded by reversing the exponent substring and
/// weighting position `k` by `2^k`, which reads the field most significant bit
/// first. `LsbFirst` weights the characters in received order instead; it is kept
/// so a capture that disagrees with the default can be decoded without a code change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExponentBitOrder {
    /// First exponent character carries weight `2^7`.
    #[default]
    MsbFirst,
    /// First exponent character carries weight `2^0`.
    LsbFirst,
}

/// Bit-string float decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec {
    exponent_order: ExponentBitOrder,
}

impl FloatCodec {
    /// Creates a codec with the given exponent bit order.
    pub fn new(exponent_order: ExponentBitOrder) -> Self {
        Self { exponent_order }
    }

    /// Decodes a 32 character string of `'0'`/`'1'`.
    pub fn decode(&self, bits: &str) -> Result<f64> {
        let bits = bits.as_bytes();
        if bits.len() != FLOAT_BITS {
            return Err(FeedError::Format(format!(
                "float bit string must be {} bits, got {}",
                FLOAT_BITS,
                bits.len()
            )));
        }
        if let Some(bad) = bits.iter().find(|b| **b != b'0' && **b != b'1') {
            return Err(FeedError::Format(format!(
                "float bit string contains non-binary character {:?}",
                *bad as char
            )));
        }

        let sign = if bits[0] == b'1' { -1.0 } else { 1.0 };
        let exponent = self.exponent_value(&bits[EXPONENT_RANGE]) - EXPONENT_BIAS;
        let mantissa = mantissa_value(&bits[MANTISSA_START..]);

        Ok(sign * mantissa * 2f64.powi(exponent))
    }

    /// Decodes a raw 32-bit word read big-endian from the wire.
    pub fn decode_word(&self, word: u32) -> Result<f64> {
        self.decode(&format!("{:032b}", word))
    }

    fn exponent_value(&self, bits: &[u8]) -> i32 {
        let weighted = |(k, b): (usize, &u8)| if *b == b'1' { 1i32 << k } else { 0 };
        match self.exponent_order {
            ExponentBitOrder::MsbFirst => bits.iter().rev().enumerate().map(weighted).sum(),
            ExponentBitOrder::LsbFirst => bits.iter().enumerate().map(weighted).sum(),
        }
    }
}

/// Implicit leading one plus the fraction bits, taken in received order.
fn mantissa_value(bits: &[u8]) -> f64 {
    bits.iter()
        .enumerate()
        .filter(|(_, b)| **b == b'1')
        .fold(1.0, |acc, (k, _)| acc + 2f64.powi(-(k as i32 + 1)))
}

/// Renders an `f32` as the bit string the feed would carry for it.
pub fn encode(value: f32) -> String {
    format!("{:032b}", value.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = "00111111100000000000000000000000";

    #[test]
    fn test_decode_one() {
        let codec = FloatCodec::default();
        assert_eq!(codec.decode(ONE).unwrap(), 1.0);
    }

    #[test]
    fn test_sign_bit_flips_sign_only() {
        let codec = FloatCodec::default();
        let negative = format!("1{}", &ONE[1..]);
        assert_eq!(codec.decode(&negative).unwrap(), -1.0);

        let pos = codec.decode(&encode(123.456)).unwrap();
        let neg = codec.decode(&encode(-123.456)).unwrap();
        assert_eq!(pos, -neg);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let codec = FloatCodec::default();
        assert!(matches!(codec.decode("0101"), Err(FeedError::Format(_))));
        assert!(matches!(codec.decode(&format!("{}0", ONE)), Err(FeedError::Format(_))));
        assert!(matches!(codec.decode(""), Err(FeedError::Format(_))));
    }

    #[test]
    fn test_rejects_non_binary() {
        let codec = FloatCodec::default();
        let bad = format!("2{}", &ONE[1..]);
        assert!(matches!(codec.decode(&bad), Err(FeedError::Format(_))));
    }

    #[test]
    fn test_default_order_matches_ieee_single() {
        let codec = FloatCodec::default();
        for value in [0.5f32, 1.5, -2.25, 100.125, 37.43, 1234.5677, 0.0001] {
            assert_eq!(codec.decode_word(value.to_bits()).unwrap(), value as f64);
        }
    }

    #[test]
    fn test_zero_exponent_is_not_subnormal() {
        let codec = FloatCodec::default();
        assert_eq!(codec.decode_word(0).unwrap(), 2f64.powi(-127));
    }

    #[test]
    fn test_lsb_first_exponent() {
        // 0111_1111 read lowest weight first is 254.
        let codec = FloatCodec::new(ExponentBitOrder::LsbFirst);
        assert_eq!(codec.decode(ONE).unwrap(), 2f64.powi(127));
    }
}
