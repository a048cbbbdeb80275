//! Runs the analysis over many recording files.
//!
//! Recordings share nothing, so they can be analyzed in any order; results
//! always come back in input order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use slog::{info, warn, Logger};

use crate::analysis::metrics::Metrics;
use crate::analysis::{Analysis, DetectionMethod};
use crate::storage;
use crate::Error;

#[derive(Debug, Clone)]
pub struct RecordingReport {
    pub path: PathBuf,
    pub key: Option<u32>,
    pub dropped_rows: usize,
    pub method: DetectionMethod,
    pub metrics: Metrics,
}

/// `*.csv` files directly inside `dir`, sorted by name.
pub fn csv_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads, validates and analyzes one file.
pub fn process_file(
    analysis: &Analysis,
    path: &Path,
    window: Option<(f64, f64)>,
) -> Result<RecordingReport, Error> {
    let log = analysis.logger();
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let rows = storage::load_csv(path, log)?;
    let (recording, dropped_rows) = crate::analysis::recording::validate(&rows, log);
    let outcome = analysis.analyze(&recording, window, &label);

    Ok(RecordingReport {
        path: path.to_path_buf(),
        key: storage::file_key(path),
        dropped_rows,
        method: outcome.detection.method,
        metrics: outcome.metrics,
    })
}

pub struct Batch {
    analysis: Arc<Analysis>,
    rt: tokio::runtime::Runtime,
    logger: Logger,
}

impl Batch {
    pub fn new(analysis: Analysis, logger: Logger) -> Result<Self, Error> {
        let rt = tokio::runtime::Runtime::new()?;
        Ok(Batch {
            analysis: Arc::new(analysis),
            rt,
            logger,
        })
    }

    /// One file after the other.
    pub fn run_serial(
        &self,
        paths: &[PathBuf],
        window: Option<(f64, f64)>,
    ) -> Vec<Result<RecordingReport, Error>> {
        paths
            .iter()
            .map(|path| {
                let report = process_file(&self.analysis, path, window);
                self.log_result(path, &report);
                report
            })
            .collect()
    }

    /// Every file on the blocking pool at once.
    pub fn run_parallel(
        &self,
        paths: &[PathBuf],
        window: Option<(f64, f64)>,
    ) -> Vec<Result<RecordingReport, Error>> {
        let tasks: Vec<_> = paths
            .iter()
            .cloned()
            .map(|path| {
                let analysis = Arc::clone(&self.analysis);
                self.rt
                    .spawn_blocking(move || process_file(&analysis, &path, window))
            })
            .collect();

        let joined = self.rt.block_on(join_all(tasks));

        paths
            .iter()
            .zip(joined)
            .map(|(path, joined)| {
                let report = joined
                    .map_err(|e| Error::Task(e.to_string()))
                    .and_then(|report| report);
                self.log_result(path, &report);
                report
            })
            .collect()
    }

    fn log_result(&self, path: &Path, report: &Result<RecordingReport, Error>) {
        let file = path.display().to_string();
        match report {
            Ok(report) => info!(self.logger, "recording analyzed";
                "file" => file,
                "beats" => report.metrics.num_beats,
                "bpm" => report.metrics.mean_hr_bpm),
            Err(e) => warn!(self.logger, "recording failed";
                "file" => file, "error" => e.to_string()),
        }
    }
}
