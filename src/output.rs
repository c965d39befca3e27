//! Output formatting and persistence for classification and count results.
//!
//! Supports JSON to a file or stdout, JSON logging, and CSV append.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::mode::ModeCounts;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// One CSV row of per-park mode counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeCountRow {
    pub reference: String,
    pub cw: u64,
    pub data: u64,
    pub ssb: u64,
    pub unk: u64,
    pub total: u64,
}

impl ModeCountRow {
    pub fn new(reference: impl Into<String>, counts: &ModeCounts) -> Self {
        Self {
            reference: reference.into(),
            cw: counts.cw,
            data: counts.data,
            ssb: counts.ssb,
            unk: counts.unk,
            total: counts.total(),
        }
    }
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize + ?Sized>(path: Option<&str>, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;

    match path {
        Some(path) => {
            debug!(path, bytes = body.len(), "Writing JSON output");
            std::fs::write(path, body).with_context(|| format!("failed to write {path}"))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{body}")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Appends mode-count rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_mode_counts(path: &str, rows: &[ModeCountRow]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = rows.len(), "Appending CSV records");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open {path}"))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
