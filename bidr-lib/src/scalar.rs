//! Fixed-width field decoders.
//!
//! Each decoder consumes a byte-aligned prefix of `buf` and returns the decoded value
//! along with the remaining, unconsumed, bytes. Decoders never copy the input; the
//! returned remainder is a sub-slice of `buf`.
use crate::error::{Error, Result};

/// Split `width` bytes off the front of `buf`.
///
/// # Errors
/// [Error::TruncatedInput] if `buf` is shorter than `width`.
pub fn take(buf: &[u8], width: usize) -> Result<(&[u8], &[u8])> {
    if buf.len() < width {
        return Err(Error::TruncatedInput {
            needed: width,
            available: buf.len(),
        });
    }
    Ok(buf.split_at(width))
}

fn check_int_width(width: usize) -> Result<()> {
    if width == 0 || width > 8 {
        return Err(Error::InvalidDescriptor(format!(
            "integer width must be 1..=8 bytes, got {width}"
        )));
    }
    Ok(())
}

/// Little-endian unsigned integer of `width` bytes (1..=8).
///
/// # Errors
/// [Error::InvalidDescriptor] for unsupported widths, [Error::TruncatedInput] if there
/// are not enough bytes.
pub fn unsigned(buf: &[u8], width: usize) -> Result<(u64, &[u8])> {
    check_int_width(width)?;
    let (x, rest) = take(buf, width)?;
    let mut le = [0u8; 8];
    le[..width].copy_from_slice(x);
    Ok((u64::from_le_bytes(le), rest))
}

/// Little-endian two's-complement integer of `width` bytes (1..=8), sign-extended.
///
/// # Errors
/// See [unsigned].
pub fn signed(buf: &[u8], width: usize) -> Result<(i64, &[u8])> {
    let (raw, rest) = unsigned(buf, width)?;
    let shift = 64 - 8 * width as u32;
    // shift the sign bit to the top, then arithmetic shift back down
    Ok((((raw << shift) as i64) >> shift, rest))
}

/// `width` bytes of ASCII text, returned without copying.
///
/// # Errors
/// [Error::Encoding] on the first non-ASCII byte, [Error::TruncatedInput] if there are
/// not enough bytes.
pub fn ascii(buf: &[u8], width: usize) -> Result<(&str, &[u8])> {
    let (x, rest) = take(buf, width)?;
    if let Some(index) = x.iter().position(|b| !b.is_ascii()) {
        return Err(Error::Encoding {
            index,
            byte: x[index],
        });
    }
    // ASCII is always valid UTF-8
    let text = std::str::from_utf8(x).map_err(|e| Error::Encoding {
        index: e.valid_up_to(),
        byte: x[e.valid_up_to()],
    })?;
    Ok((text, rest))
}

/// `width` bytes of ASCII text holding a base-10 integer.
///
/// Spaces surrounding the digits, within the field, are ignored and a single leading
/// sign is accepted.
///
/// # Errors
/// [Error::Format] if the field does not hold a decimal integer that fits in an `i64`,
/// otherwise the errors of [ascii].
pub fn ascii_integer(buf: &[u8], width: usize) -> Result<(i64, &[u8])> {
    let (text, rest) = ascii(buf, width)?;
    let trimmed = text.trim_matches(' ');
    let digits = trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Format(format!("{text:?}")));
    }
    let value = trimmed
        .parse::<i64>()
        .map_err(|e| Error::Format(format!("{text:?}: {e}")))?;
    Ok((value, rest))
}

/// `width` raw bytes.
///
/// # Errors
/// [Error::TruncatedInput] if there are not enough bytes.
pub fn bytes(buf: &[u8], width: usize) -> Result<(&[u8], &[u8])> {
    take(buf, width)
}

/// All remaining bytes, leaving an empty remainder.
#[must_use]
pub fn rest(buf: &[u8]) -> (&[u8], &[u8]) {
    buf.split_at(buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use test_case::test_case;

    #[test]
    fn test_read_unsigned() {
        assert_eq!(unsigned(b"\x00", 1).unwrap(), (0, &b""[..]));
        assert_eq!(unsigned(b"\x01", 1).unwrap(), (1, &b""[..]));
        assert_eq!(unsigned(b"\x05", 1).unwrap(), (5, &b""[..]));
        assert_eq!(unsigned(b"\xff", 1).unwrap(), (255, &b""[..]));
        assert_eq!(unsigned(&[0xfa, 0x0f], 2).unwrap(), (4090, &b""[..]));
    }

    #[test]
    fn test_read_signed() {
        assert_eq!(signed(b"\x00", 1).unwrap().0, 0);
        assert_eq!(signed(b"\x01", 1).unwrap().0, 1);
        assert_eq!(signed(b"\x05", 1).unwrap().0, 5);
        assert_eq!(signed(b"\xff", 1).unwrap().0, -1);
        assert_eq!(signed(b"\xfe", 1).unwrap().0, -2);
        assert_eq!(signed(b"\xf0", 1).unwrap().0, -16);
        assert_eq!(signed(&[0xff, 0x7f], 2).unwrap().0, i16::MAX as i64);
        assert_eq!(signed(&[0x00, 0x80], 2).unwrap().0, i16::MIN as i64);
    }

    #[test_case(1)]
    #[test_case(2)]
    #[test_case(3)]
    #[test_case(4)]
    #[test_case(5)]
    fn test_consumes_exactly_width(width: usize) {
        for extra in 0..4 {
            let buf = vec![0x5a; width + extra];
            let (_, rest) = unsigned(&buf, width).unwrap();
            assert_eq!(rest.len(), extra, "unsigned width={width} extra={extra}");
            let (_, rest) = signed(&buf, width).unwrap();
            assert_eq!(rest.len(), extra, "signed width={width} extra={extra}");
        }
    }

    #[test]
    fn test_random_unsigned_4() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let number: u32 = rng.gen();
            let bytes = number.to_le_bytes();
            let (value, rest) = unsigned(&bytes, 4).unwrap();
            assert_eq!(value, number as u64);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_random_signed_5() {
        let mut rng = rand::thread_rng();
        let limit: i64 = 1 << 39;
        for _ in 0..100 {
            let number = rng.gen_range(-limit..limit);
            let bytes = number.to_le_bytes();
            let (value, rest) = signed(&bytes[..5], 5).unwrap();
            assert_eq!(value, number);
            assert!(rest.is_empty());
        }
    }

    #[test_case(1, u8::MAX as u64, i8::MIN as i64, i8::MAX as i64)]
    #[test_case(2, u16::MAX as u64, i16::MIN as i64, i16::MAX as i64)]
    #[test_case(3, (1 << 24) - 1, -(1 << 23), (1 << 23) - 1)]
    #[test_case(4, u32::MAX as u64, i32::MIN as i64, i32::MAX as i64)]
    #[test_case(5, (1 << 40) - 1, -(1 << 39), (1 << 39) - 1)]
    #[test_case(6, (1 << 48) - 1, -(1 << 47), (1 << 47) - 1)]
    #[test_case(7, (1 << 56) - 1, -(1 << 55), (1 << 55) - 1)]
    #[test_case(8, u64::MAX, i64::MIN, i64::MAX)]
    fn test_int_range_limits(width: usize, umax: u64, smin: i64, smax: i64) {
        for expected in [0, 1, umax - 1, umax] {
            let bytes = expected.to_le_bytes();
            let (value, rest) = unsigned(&bytes[..width], width).unwrap();
            assert_eq!(value, expected, "width={width}");
            assert!(rest.is_empty());
        }
        for expected in [smin, smin + 1, -1, 0, 1, smax - 1, smax] {
            let bytes = expected.to_le_bytes();
            let (value, rest) = signed(&bytes[..width], width).unwrap();
            assert_eq!(value, expected, "width={width}");
            assert!(rest.is_empty());
        }
    }

    #[test_case(0)]
    #[test_case(9)]
    fn test_unsupported_int_width(width: usize) {
        let buf = [0u8; 16];
        assert!(matches!(
            unsigned(&buf, width),
            Err(Error::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_truncated() {
        let zult = unsigned(&[1, 2], 4);
        assert!(
            matches!(
                zult,
                Err(Error::TruncatedInput {
                    needed: 4,
                    available: 2
                })
            ),
            "{zult:?}"
        );
    }

    #[test]
    fn test_ascii() {
        let (text, rest) = ascii(b"foolish!", 7).unwrap();
        assert_eq!(text, "foolish");
        assert_eq!(rest, b"!");

        let zult = ascii(&[b'a', 0xc3, 0xa9], 3);
        assert!(
            matches!(zult, Err(Error::Encoding { index: 1, byte: 0xc3 })),
            "{zult:?}"
        );
    }

    #[test_case(b"01234", 1234; "leading zero")]
    #[test_case(b"  520", 520; "space padded")]
    #[test_case(b"-0042", -42; "negative")]
    #[test_case(b"+7   ", 7; "trailing space")]
    fn test_ascii_integer(input: &[u8], expected: i64) {
        let (value, rest) = ascii_integer(input, input.len()).unwrap();
        assert_eq!(value, expected);
        assert!(rest.is_empty());
    }

    #[test_case(b"12a45"; "letter")]
    #[test_case(b"     "; "blank")]
    #[test_case(b"1 2 3"; "inner space")]
    #[test_case(b"--1  "; "double sign")]
    fn test_ascii_integer_format_error(input: &[u8]) {
        let zult = ascii_integer(input, input.len());
        assert!(matches!(zult, Err(Error::Format(_))), "{zult:?}");
    }

    #[test]
    fn test_bytes_and_rest() {
        let buf = [1u8, 2, 3, 4];
        let (x, tail) = bytes(&buf, 3).unwrap();
        assert_eq!(x, &[1, 2, 3]);
        assert_eq!(tail, &[4]);

        let (x, tail) = rest(&buf);
        assert_eq!(x, &buf);
        assert!(tail.is_empty());

        let (x, tail) = bytes(&buf, 0).unwrap();
        assert!(x.is_empty());
        assert_eq!(tail, &buf);
    }
}
