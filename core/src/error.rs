//! Error type for the file-facing collaborators.
//!
//! The analysis pipeline itself never fails; these errors only come out of
//! loading recordings, writing reports and running batches.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tracking workbook error: {0}")]
    Sheet(String),

    #[error("Batch worker failed: {0}")]
    Task(String),
}
