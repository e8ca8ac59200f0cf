use anyhow::{Context, Result};
use bidr::{fbidr, RecordReader};
use handlebars::handlebars_helper;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    io::{stdout, Write},
    path::Path,
};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct Summary {
    total_records: usize,
    total_bytes: usize,
    smallest_record: Option<usize>,
    largest_record: Option<usize>,
}

impl Summary {
    fn add(&mut self, len: usize) {
        self.total_records += 1;
        self.total_bytes += len;
        self.smallest_record = Some(self.smallest_record.map_or(len, |cur| cur.min(len)));
        self.largest_record = Some(self.largest_record.map_or(len, |cur| cur.max(len)));
    }
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    file_bytes: usize,
    trailing_bytes: usize,
    error: Option<String>,
    summary: Summary,
    primary_types: BTreeMap<String, Summary>,
}

fn summarize(fpath: &Path, limit: Option<usize>) -> Result<Info> {
    let buf = std::fs::read(fpath).context("reading input")?;
    let reader = RecordReader::builder()
        .descriptor(fbidr::logical_record())
        .limit(limit)
        .build();

    let mut summary = Summary::default();
    let mut primary_types: BTreeMap<String, Summary> = BTreeMap::default();
    let mut error = None;

    for zult in reader.read(&buf) {
        let record = match zult {
            Ok(record) => record,
            Err(err) => {
                warn!("stopping at undecodable record: {err}");
                error = Some(err.to_string());
                break;
            }
        };
        summary.add(record.len);

        let primary_type = record
            .tree
            .resolve(record.tree.root(), "primary_type")
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        debug!(offset = record.offset, len = record.len, %primary_type, "record");
        primary_types.entry(primary_type).or_default().add(record.len);
    }

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        file_bytes: buf.len(),
        trailing_bytes: buf.len() - summary.total_bytes,
        error,
        summary,
        primary_types,
    })
}

pub fn info(fpath: &Path, format: &Format, limit: Option<usize>) -> Result<()> {
    let info = summarize(fpath, limit)?;

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let width = usize::try_from(num).unwrap_or(0).max(v.len());
        format!("{v:>width$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }}
===============================================================================
Bytes:     {{ file_bytes }}
Records:   {{ summary.total_records }}
Decoded:   {{ summary.total_bytes }}
Trailing:  {{ trailing_bytes }}
{{ #if error }}Error:     {{ error }}
{{ /if }}-------------------------------------------------------------------------------
Primary Type        Count          Bytes       Smallest        Largest
-------------------------------------------------------------------------------
{{ #each primary_types }}{{ lpad 12 @key }}  {{ lpad 11 total_records }}  {{ lpad 13 total_bytes }}  {{ lpad 13 smallest_record }}  {{ lpad 13 largest_record }}
{{/each }}
";
