use serde::Serialize;
use slog::{info, warn, Logger};

use super::peaks::PeakSet;
use super::recording::VoltageExtremes;

/// Time window the heart rate is averaged over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interval {
    /// Caller supplied `(start, end)`.
    Explicit { start: f64, end: f64 },
    /// The whole recording.
    Default { duration: f64 },
}

impl Interval {
    /// Parses raw window bounds; anything that is not two finite numbers
    /// yields `None`.
    pub fn parse_window(start: &str, end: &str) -> Option<(f64, f64)> {
        let start = start.trim().parse::<f64>().ok()?;
        let end = end.trim().parse::<f64>().ok()?;
        (start.is_finite() && end.is_finite()).then_some((start, end))
    }

    /// Applies the caller's window, degrading to the full duration when the
    /// window is absent or falls outside `[0, duration]`.
    pub fn resolve(window: Option<(f64, f64)>, duration: f64, log: &Logger) -> Interval {
        match window {
            None => {
                info!(log, "no time window given, averaging over the whole recording";
                    "duration" => duration);
                Interval::Default { duration }
            }
            Some((start, end)) if start < 0.0 || end > duration || end <= start => {
                warn!(log, "time window outside recording, using default";
                    "start" => start, "end" => end, "duration" => duration);
                Interval::Default { duration }
            }
            Some((start, end)) => Interval::Explicit { start, end },
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Interval::Explicit { .. })
    }

    /// Beats per minute over this interval.
    ///
    /// Over the full duration the rate is floored to a whole number; over an
    /// explicit window only beats strictly inside it count and the rate is
    /// left fractional. A zero duration gives zero.
    pub fn bpm(&self, beats: &[f64]) -> f64 {
        match *self {
            Interval::Default { duration } => {
                if duration > 0.0 {
                    (beats.len() as f64 / duration * 60.0).floor()
                } else {
                    0.0
                }
            }
            Interval::Explicit { start, end } => {
                let inside = beats.iter().filter(|&&t| start < t && t < end).count();
                inside as f64 / (end - start) * 60.0
            }
        }
    }
}

/// Per-recording beat metrics, serialized verbatim to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub voltage_extremes: (f64, f64),
    pub duration: f64,
    pub num_beats: usize,
    pub mean_hr_bpm: f64,
    pub beats: Vec<f64>,
}

impl Metrics {
    pub fn new(
        peaks: &PeakSet,
        extremes: VoltageExtremes,
        duration: f64,
        interval: &Interval,
        log: &Logger,
    ) -> Self {
        let beats = peaks.times();
        let metrics = Metrics {
            voltage_extremes: extremes.as_tuple(),
            duration,
            num_beats: beats.len(),
            mean_hr_bpm: interval.bpm(&beats),
            beats,
        };
        info!(log, "metrics";
            "num_beats" => metrics.num_beats,
            "mean_hr_bpm" => metrics.mean_hr_bpm,
            "duration" => metrics.duration,
            "explicit_window" => interval.is_explicit());
        metrics
    }
}
