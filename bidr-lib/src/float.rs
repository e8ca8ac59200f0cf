//! Magellan floating point decoding.
//!
//! Floating point values in Magellan data products are not IEEE 754. The exponent is
//! biased by 128, not 127, there are no denormals, and the fraction is stored in
//! byte-swapped 16-bit words.
//!
//! Bits are numbered over the raw field in source byte order, most-significant bit of
//! each byte first, so bit 0 is the MSB of the first byte. In that numbering:
//!
//! | Bits    | Meaning                                     |
//! |---------|---------------------------------------------|
//! | 0..7    | low-order fraction bits                     |
//! | 7..15   | exponent, bit 7 is the LSB, bit 14 the MSB  |
//! | 15      | sign                                        |
//! | 16..    | fraction words, most-significant word last  |
//!
//! The fraction is gathered from whole 16-bit words starting with the last word of the
//! field and ending with bits 0..7 of the first word.
use crate::error::{Error, Result};
use crate::scalar::take;

/// Supported Magellan float widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// 4 bytes, 23 fraction bits
    Single,
    /// 8 bytes, 55 fraction bits
    Double,
}

impl Precision {
    /// Byte width of a value of this precision.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
        }
    }

    /// Precision for a field width in bytes.
    ///
    /// # Errors
    /// [Error::InvalidDescriptor] for any width other than 4 or 8.
    pub fn from_width(width: usize) -> Result<Self> {
        match width {
            4 => Ok(Precision::Single),
            8 => Ok(Precision::Double),
            _ => Err(Error::InvalidDescriptor(format!(
                "float width must be 4 or 8 bytes, got {width}"
            ))),
        }
    }

    /// Bit ranges making up the fraction, in order of decreasing significance.
    fn fraction_words(self) -> &'static [(usize, usize)] {
        match self {
            Precision::Single => &[(16, 32), (0, 7)],
            Precision::Double => &[(48, 64), (32, 48), (16, 32), (0, 7)],
        }
    }
}

const EXPONENT_BIAS: i32 = 128;

#[inline]
fn bit(raw: &[u8], pos: usize) -> u8 {
    (raw[pos / 8] >> (7 - pos % 8)) & 1
}

// `raw` holds at least `precision.width()` bytes.
fn decode_raw(raw: &[u8], precision: Precision) -> f64 {
    let exponent_bits: i32 = (0..8).map(|i| i32::from(bit(raw, 7 + i)) << i).sum();
    if exponent_bits == 0 {
        return 0.0;
    }
    let exponent = exponent_bits - EXPONENT_BIAS;
    let sign = if bit(raw, 15) == 1 { -1.0 } else { 1.0 };

    let fraction: Vec<u8> = precision
        .fraction_words()
        .iter()
        .flat_map(|&(start, end)| (start..end).map(|pos| bit(raw, pos)))
        .collect();

    // Accumulate from the least significant bit upward to bound rounding error.
    let mut accum = 0.0f64;
    for (i, b) in fraction.iter().enumerate().rev() {
        if *b == 1 {
            accum += 2f64.powi(-(i as i32 + 1));
        }
    }

    sign * (1.0 + accum) * 2f64.powi(exponent)
}

/// Decode a Magellan float of the given precision from the front of `buf`.
///
/// # Errors
/// [Error::TruncatedInput] if there are not enough bytes.
pub fn decode(buf: &[u8], precision: Precision) -> Result<(f64, &[u8])> {
    let (raw, rest) = take(buf, precision.width())?;
    Ok((decode_raw(raw, precision), rest))
}
