#![allow(dead_code)]

pub const IMAGE_PRIMARY_TYPE: &str = "NJPL1I00015C";

/// One synthetic image line: offset to first valid pixel, pointer to last, pixels.
pub type Line = (u16, u16, Vec<u8>);

/// Bytes of an image data logical record with an annotation label carrying `extra`
/// bytes after the line count and length.
pub fn image_record(orbit: u16, pixels_per_line: usize, lines: &[Line], extra: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(2u16.to_le_bytes());
    body.extend(4u16.to_le_bytes());
    body.extend(orbit.to_le_bytes());
    body.push(65);
    body.push(u8::try_from(4 + extra.len()).unwrap());
    body.extend(u16::try_from(lines.len()).unwrap().to_le_bytes());
    body.extend(u16::try_from(pixels_per_line + 4).unwrap().to_le_bytes());
    body.extend(extra);
    for (first, last, pixels) in lines {
        assert_eq!(pixels.len(), pixels_per_line);
        body.extend(first.to_le_bytes());
        body.extend(last.to_le_bytes());
        body.extend(pixels);
    }
    logical_record(IMAGE_PRIMARY_TYPE, &body)
}

/// A logical record with the given primary type and body.
pub fn logical_record(primary_type: &str, body: &[u8]) -> Vec<u8> {
    assert_eq!(primary_type.len(), 12);
    let mut buf = primary_type.as_bytes().to_vec();
    buf.extend(format!("{:08}", body.len()).as_bytes());
    buf.extend(body);
    buf
}

/// `count` lines of `width` pixels where line `n` holds the value `n` in every pixel
/// and the valid range is `[n % width, width)`.
pub fn ramp_lines(count: usize, width: usize) -> Vec<Line> {
    (0..count)
        .map(|n| {
            let first = u16::try_from(n % width).unwrap();
            let last = u16::try_from(width).unwrap();
            (first, last, vec![(n % 256) as u8; width])
        })
        .collect()
}
