//! Schemas for Magellan Full-resolution Basic Image Data Record (F-BIDR) files.
//!
//! An F-BIDR data file is a series of logical records, each starting with a 20-byte ASCII
//! primary header giving the record type and the number of bytes that follow. The files
//! are written in 32500-byte physical records padded with `^`.
//!
//! ```
//! use bidr::{fbidr, RecordReader};
//!
//! let mut file = b"NJPL1I00015C00000003".to_vec();
//! file.extend([1, 2, 3]);
//!
//! let reader = RecordReader::builder()
//!     .descriptor(fbidr::logical_record())
//!     .build();
//! let (records, rest) = reader.read_all(&file).unwrap();
//! assert_eq!(records.len(), 1);
//! assert!(rest.is_empty());
//! ```
use tracing::warn;

use crate::descriptor::{Decoded, Descriptor, Length};
use crate::engine::decode;
use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree};

/// Size of a physical record in bytes.
pub const PHYSICAL_RECORD_LEN: usize = 32500;
/// Padding at the end of a physical record.
pub const FILL: u8 = b'^';

/// Length of the primary header.
pub const PRIMARY_HEADER_LEN: usize = 20;
/// Bytes of line prefix before pixel data.
pub const LINE_PREFIX_LEN: usize = 4;

/// Split `buf` into physical records with trailing fill removed.
///
/// A final record shorter than [PHYSICAL_RECORD_LEN] is produced unchanged.
pub fn physical_records(buf: &[u8]) -> impl Iterator<Item = &[u8]> {
    buf.chunks(PHYSICAL_RECORD_LEN)
        .enumerate()
        .map(|(index, chunk)| {
            if chunk.len() < PHYSICAL_RECORD_LEN {
                warn!(index, len = chunk.len(), "short physical record");
                return chunk;
            }
            let end = chunk
                .iter()
                .rposition(|b| *b != FILL)
                .map_or(0, |pos| pos + 1);
            &chunk[..end]
        })
}

fn primary_header() -> Vec<(&'static str, Descriptor)> {
    vec![
        ("primary_type", Descriptor::ascii(12)),
        ("remaining_length", Descriptor::ascii_integer(8)),
    ]
}

fn secondary_header(label: (&'static str, Descriptor)) -> Descriptor {
    Descriptor::group([
        ("secondary_type", Descriptor::unsigned(2)),
        ("remaining_length", Descriptor::unsigned(2)),
        ("orbit_number", Descriptor::unsigned(2)),
        (
            "annotation_block",
            Descriptor::group([
                ("data_class", Descriptor::unsigned(1)),
                ("remaining_length", Descriptor::unsigned(1)),
                label,
            ]),
        ),
    ])
}

/// Any logical record: the primary header followed by an uninterpreted `body`.
#[must_use]
pub fn logical_record() -> Descriptor {
    let mut fields = primary_header();
    fields.push((
        "body",
        Descriptor::variable(Length::field("remaining_length")),
    ));
    Descriptor::group(fields)
}

/// The primary and secondary headers of a logical record, with the annotation label
/// kept as raw bytes. The rest of the record is not consumed.
#[must_use]
pub fn header_record() -> Descriptor {
    let mut fields = primary_header();
    fields.push((
        "secondary_header",
        secondary_header((
            "label",
            Descriptor::variable(Length::field("remaining_length")),
        )),
    ));
    Descriptor::group(fields)
}

/// A single image line of `pixels` bytes plus its valid-pixel prefix.
#[must_use]
pub fn image_line(pixels: usize) -> Descriptor {
    Descriptor::group([
        ("offset_to_first", Descriptor::unsigned(2)),
        ("pointer_to_last", Descriptor::unsigned(2)),
        ("pixels", Descriptor::bytes(pixels)),
    ])
}

fn label_dimension(tree: &Tree<'_>, label: NodeId, name: &str) -> Result<usize> {
    let value = tree.resolve(label, name)?;
    value
        .as_usize()
        .ok_or_else(|| Error::LengthResolution(format!("{name}: {value:?}")))
}

fn data_block() -> Descriptor {
    Descriptor::custom(|buf, tree, at| {
        let label = tree.lookup(at, "secondary_header/annotation_block/annotation_label")?;
        let count = label_dimension(tree, label, "line_count")?;
        let line_length = label_dimension(tree, label, "line_length")?;
        let pixels = line_length.checked_sub(LINE_PREFIX_LEN).ok_or_else(|| {
            Error::LengthResolution(format!("line_length {line_length} has no room for pixels"))
        })?;

        let (lines, rest) = decode(buf, &Descriptor::repeat(&image_line(pixels), count))?;
        Ok((Decoded::Tree(lines), rest))
    })
}

/// An image data logical record: headers, image annotation label and `data_block`, a
/// sequence of `line_count` lines (see [image_line]).
#[must_use]
pub fn image_record() -> Descriptor {
    let mut fields = primary_header();
    fields.push((
        "secondary_header",
        secondary_header((
            "annotation_label",
            Descriptor::group([
                ("line_count", Descriptor::unsigned(2)),
                ("line_length", Descriptor::unsigned(2)),
                (
                    "the_rest",
                    Descriptor::variable(Length::field_less(
                        "../remaining_length",
                        LINE_PREFIX_LEN,
                    )),
                ),
            ]),
        )),
    ));
    fields.push(("data_block", data_block()));
    Descriptor::group(fields)
}

/// Side of the ground track an image was looking at. Line offsets for right-looking
/// images include the 4 byte line prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Look {
    #[default]
    Left,
    Right,
}

/// The valid pixels of an image line decoded with [image_line], clamped to the line.
///
/// # Errors
/// [Error::UnresolvedReference] if `line` is not a decoded image line.
pub fn valid_pixels<'t>(tree: &'t Tree<'_>, line: NodeId, look: Look) -> Result<&'t [u8]> {
    let bound = |name: &str| -> Result<usize> {
        let value = tree.resolve(line, name)?;
        let x = value.as_usize().ok_or_else(|| {
            Error::UnresolvedReference(format!("{name} is not an integer: {value:?}"))
        })?;
        Ok(match look {
            Look::Left => x,
            Look::Right => x.saturating_sub(LINE_PREFIX_LEN),
        })
    };
    let first = bound("offset_to_first")?;
    let last = bound("pointer_to_last")?;

    let pixels = tree.lookup(line, "pixels")?;
    let pixels = tree.value(pixels).as_bytes().ok_or_else(|| {
        Error::UnresolvedReference(format!("{}/pixels is not bytes", tree.path(line)))
    })?;
    let start = first.min(pixels.len());
    let end = last.clamp(start, pixels.len());
    Ok(&pixels[start..end])
}
