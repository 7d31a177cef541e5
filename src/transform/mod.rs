// src/transform/mod.rs

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use tracing::info;

use crate::{error::Result, pipeline::RunStamp};

/// Column appended to every row, holding epoch seconds at write time.
pub const UPLOAD_TIMESTAMP: &str = "upload_timestamp";

/// Key that collects the values of records longer than the header.
pub const OVERFLOW_KEY: &str = "null";

/// Convert CSV `text` (header row first) into `<dir>/<stamp>.json`, one JSON object per line.
/// Returns the path of the written file.
pub fn csv_to_ndjson(text: &str, dir: &Path, stamp: &RunStamp) -> Result<PathBuf> {
    let path = dir.join(stamp.file_name());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut out = BufWriter::new(File::create(&path)?);
    let mut rows = 0usize;
    for record in reader.records() {
        let mut row = record_to_row(&headers, &record?);
        row.insert(UPLOAD_TIMESTAMP.to_string(), Value::from(Utc::now().timestamp()));

        // serde_json never escapes non-ASCII, so the line is written verbatim
        serde_json::to_writer(&mut out, &row)?;
        out.write_all(b"\n")?;
        rows += 1;
    }
    out.flush()?;

    info!(rows, "Wrote transformed data to {}", path.display());
    Ok(path)
}

/// Pair a record with the header, tolerating either being longer.
///
/// Surplus values go to an array under [`OVERFLOW_KEY`]; missing values become `null`.
/// A repeated header name keeps its first position and takes the last value.
pub fn record_to_row(headers: &StringRecord, record: &StringRecord) -> Map<String, Value> {
    let mut row = Map::with_capacity(headers.len() + 1);

    for (i, name) in headers.iter().enumerate() {
        let value = record
            .get(i)
            .map_or(Value::Null, |v| Value::String(v.to_string()));
        row.insert(name.to_string(), value);
    }

    if record.len() > headers.len() {
        let extra = record
            .iter()
            .skip(headers.len())
            .map(|v| Value::String(v.to_string()))
            .collect();
        row.insert(OVERFLOW_KEY.to_string(), Value::Array(extra));
    }

    row
}
