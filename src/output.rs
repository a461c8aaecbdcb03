//! Output formatting and persistence for reports and record exports.
//!
//! Supports JSON output, CSV export (optionally gzipped) and CSV append.

use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Prints a value to stdout as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `rows` as CSV with every field double-quoted.
///
/// Embedded double quotes are escaped by doubling them.
pub fn write_csv<W: Write, S: Serialize>(writer: W, rows: &[S], has_headers: bool) -> Result<W> {
    let mut writer = WriterBuilder::new()
        .has_headers(has_headers)
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Renders `rows` as a CSV string with a header line.
pub fn to_csv_string<S: Serialize>(rows: &[S]) -> Result<String> {
    let bytes = write_csv(Vec::new(), rows, true)?;
    Ok(String::from_utf8(bytes)?)
}

/// Writes `rows` to a new CSV file at `path`, gzip-compressed when `gzip` is
/// set. Returns the number of rows written.
pub fn export_csv<S: Serialize>(path: impl AsRef<Path>, rows: &[S], gzip: bool) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    if gzip {
        let encoder = write_csv(GzEncoder::new(file, Compression::default()), rows, true)?;
        encoder.finish()?;
    } else {
        write_csv(file, rows, true)?;
    }

    info!(path = %path.display(), rows = rows.len(), gzip, "CSV export written");
    Ok(rows.len())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, record: &impl Serialize) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}
