//! File-facing collaborators: CSV recordings in, JSON metrics out, and the
//! beat tracking workbook.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use slog::{warn, Logger};

use crate::analysis::metrics::Metrics;
use crate::analysis::recording::RawSample;
use crate::Error;

pub mod tracking;

pub use tracking::{Band, Fill, TrackingSheet};

/// Reads a headerless `time,voltage` CSV. Fields are kept as text for the
/// validator; short rows get empty fields and undecodable rows are skipped.
pub fn load_csv(path: impl AsRef<Path>, log: &Logger) -> Result<Vec<RawSample>, Error> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        match record {
            Ok(record) => rows.push(RawSample::new(
                record.get(0).unwrap_or_default(),
                record.get(1).unwrap_or_default(),
            )),
            Err(e) => {
                warn!(log, "skipping unreadable row";
                    "file" => path.display().to_string(), "line" => line + 1, "error" => e.to_string());
            }
        }
    }
    Ok(rows)
}

/// Path of the JSON report written for a recording: same directory and
/// stem, `.json` extension.
pub fn json_path(csv_path: impl AsRef<Path>) -> PathBuf {
    csv_path.as_ref().with_extension("json")
}

pub fn write_json(csv_path: impl AsRef<Path>, metrics: &Metrics) -> Result<PathBuf, Error> {
    let path = json_path(csv_path);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(writer, metrics)?;
    Ok(path)
}

/// Numeric key of a recording file, taken from the digits after the last
/// `data` in its stem (`test_data12.csv` → 12).
pub fn file_key(path: impl AsRef<Path>) -> Option<u32> {
    let stem = path.as_ref().file_stem()?.to_str()?;
    let (_, tail) = stem.rsplit_once("data")?;
    tail.parse().ok()
}
