//! Beat detection for single-channel ECG-like recordings.
//!
//! A recording is validated, padded, turned into a smoothed Hilbert envelope
//! and scanned for peaks. Unevenly spaced peaks trigger re-detection with a
//! relaxed filter; an empty detection falls back to threshold crossings.
//! The result is a [`Metrics`] record per recording.

pub mod analysis;
pub mod batch;
pub mod error;
pub mod log;
pub mod mock;
pub mod storage;

pub use analysis::metrics::{Interval, Metrics};
pub use analysis::recording::{RawSample, Recording, Sample, VoltageExtremes};
pub use analysis::{Analysis, DetectionMethod, Outcome, PadLevel, Parameters};
pub use error::Error;
