//! Reading a buffer as a series of independent top-level records.
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::descriptor::Descriptor;
use crate::engine::decode;
use crate::error::{Error, Result};
use crate::tree::Tree;

/// A single decoded top-level record.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    /// Offset of the first byte of this record in the input
    pub offset: usize,
    /// Number of bytes this record consumed
    pub len: usize,
    pub tree: Tree<'a>,
}

/// Decodes consecutive records that all share one descriptor.
///
/// ```
/// use bidr::{Descriptor, RecordReader};
///
/// let reader = RecordReader::builder()
///     .descriptor(Descriptor::unsigned(2))
///     .limit(Some(2))
///     .build();
/// let records: Vec<_> = reader.read(&[1, 0, 2, 0, 3, 0]).collect();
/// assert_eq!(records.len(), 2);
/// ```
#[derive(TypedBuilder, Clone, Debug)]
pub struct RecordReader {
    descriptor: Descriptor,
    /// Maximum number of records to produce. `None` reads until the input is exhausted.
    #[builder(default)]
    limit: Option<usize>,
}

impl RecordReader {
    /// Iterate over the records in `buf`.
    ///
    /// Iteration ends when the input is exhausted, the limit is reached, or after the
    /// first error. Error offsets are relative to the start of `buf`.
    #[must_use]
    pub fn read<'r, 'a>(&'r self, buf: &'a [u8]) -> Records<'r, 'a> {
        Records {
            reader: self,
            buf,
            offset: 0,
            count: 0,
            done: false,
        }
    }

    /// Decode all records, returning them along with any bytes left over because the
    /// limit was reached.
    ///
    /// # Errors
    /// The first record decode failure.
    pub fn read_all<'a>(&self, buf: &'a [u8]) -> Result<(Vec<Record<'a>>, &'a [u8])> {
        let mut records = Vec::new();
        let mut end = 0;
        for zult in self.read(buf) {
            let record = zult?;
            end = record.offset + record.len;
            records.push(record);
        }
        Ok((records, &buf[end..]))
    }
}

/// Iterator returned by [RecordReader::read].
pub struct Records<'r, 'a> {
    reader: &'r RecordReader,
    buf: &'a [u8],
    offset: usize,
    count: usize,
    done: bool,
}

impl<'r, 'a> Records<'r, 'a> {
    /// Offset of the next record to be decoded.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'r, 'a> Iterator for Records<'r, 'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.buf.is_empty() {
            return None;
        }
        if self.reader.limit.is_some_and(|limit| self.count >= limit) {
            debug!(count = self.count, "record limit reached");
            return None;
        }

        match decode(self.buf, &self.reader.descriptor) {
            Ok((tree, rest)) => {
                let len = self.buf.len() - rest.len();
                if len == 0 {
                    self.done = true;
                    return Some(Err(Error::InvalidDescriptor(format!(
                        "record at {} consumed no bytes",
                        self.offset
                    ))
                    .at(self.offset, "/".into())));
                }
                let record = Record {
                    offset: self.offset,
                    len,
                    tree,
                };
                self.offset += len;
                self.count += 1;
                self.buf = rest;
                Some(Ok(record))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.at(self.offset, "/".into())))
            }
        }
    }
}
