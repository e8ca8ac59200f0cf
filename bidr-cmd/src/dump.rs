use anyhow::{Context, Result};
use bidr::{fbidr, Descriptor, Flatten, Plain, Record, RecordReader};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    io::{stdout, BufWriter, Write},
    path::Path,
};
use tracing::info;

#[derive(Debug, Clone)]
pub enum Schema {
    Logical,
    Header,
    Image,
}

impl Schema {
    fn descriptor(&self) -> Descriptor {
        match self {
            Self::Logical => fbidr::logical_record(),
            Self::Header => fbidr::header_record(),
            Self::Image => fbidr::image_record(),
        }
    }
}

impl clap::ValueEnum for Schema {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Logical, Self::Header, Self::Image]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Logical => Some(clap::builder::PossibleValue::new("logical")),
            Self::Header => Some(clap::builder::PossibleValue::new("header")),
            Self::Image => Some(clap::builder::PossibleValue::new("image")),
        }
    }
}

#[derive(Serialize)]
struct Line<'a> {
    offset: usize,
    len: usize,
    record: Plain<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provenance: Option<BTreeMap<String, [usize; 2]>>,
}

impl<'a> Line<'a> {
    fn new(record: &Record<'a>, provenance: bool) -> Self {
        let provenance = provenance.then(|| {
            record
                .tree
                .provenances()
                .map(|(path, p)| (path, [record.offset + p.start, p.len]))
                .collect()
        });
        Line {
            offset: record.offset,
            len: record.len,
            record: record.tree.flatten(),
            provenance,
        }
    }
}

pub fn dump(fpath: &Path, schema: &Schema, limit: Option<usize>, provenance: bool) -> Result<()> {
    let buf = std::fs::read(fpath).context("reading input")?;
    let reader = RecordReader::builder()
        .descriptor(schema.descriptor())
        .limit(limit)
        .build();

    let mut out = BufWriter::new(stdout().lock());
    let mut count = 0;
    for zult in reader.read(&buf) {
        let record = zult.with_context(|| format!("decoding record {count}"))?;
        serde_json::to_writer(&mut out, &Line::new(&record, provenance))
            .context("serializing record")?;
        out.write_all(b"\n").context("writing to stdout")?;
        count += 1;
    }
    out.flush().context("writing to stdout")?;

    info!("wrote {count} records");
    Ok(())
}
