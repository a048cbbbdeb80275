use std::error::Error;
use std::fs;
use std::path::Path;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use slog::{o, warn, Logger};

pub mod filter;
pub mod metrics;
pub mod padding;
pub mod peaks;
#[cfg(feature = "plot")]
pub mod plotters;
pub mod recording;
pub mod spacing;
pub mod threshold;

use metrics::{Interval, Metrics};
use padding::PaddedRecording;
use peaks::{PeakDetector, PeakSet};
use recording::{RawSample, Recording};
use spacing::RetryPolicy;

/// Voltage used for the synthetic samples around a recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadLevel {
    /// Mean voltage of the validated recording.
    Mean,
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub pad_amount: usize,
    pub pad_level: PadLevel,
    pub dt_probe_index: usize,
    pub cutoff: f64,
    pub cutoff_step: f64,
    pub max_retries: usize,
    pub spacing_slack: f64,
    pub min_separation: usize,
    pub amplitude_gain: f64,
    pub threshold_ratio: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let detector = PeakDetector::default();
        Parameters {
            pad_amount: 150,
            pad_level: PadLevel::Mean,
            dt_probe_index: 50,
            cutoff: 0.005,
            cutoff_step: retry.cutoff_step,
            max_retries: retry.max_retries,
            spacing_slack: retry.spacing_slack,
            min_separation: detector.min_separation,
            amplitude_gain: detector.amplitude_gain,
            threshold_ratio: 0.75,
        }
    }
}

impl Parameters {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            cutoff_step: self.cutoff_step,
            max_retries: self.max_retries,
            spacing_slack: self.spacing_slack,
        }
    }

    pub fn detector(&self) -> PeakDetector {
        PeakDetector {
            min_separation: self.min_separation,
            amplitude_gain: self.amplitude_gain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Peaks of the smoothed Hilbert envelope.
    Envelope,
    /// Threshold crossings of the raw voltage.
    Threshold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub peaks: PeakSet,
    pub method: DetectionMethod,
    pub cutoff: f64,
    pub retries: usize,
    /// False when the first envelope contained NaN or infinite values.
    pub envelope_finite: bool,
}

/// Everything produced for one recording.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub metrics: Metrics,
    pub padded: PaddedRecording,
    /// Envelope at the cutoff that produced the final peaks.
    pub envelope: Array1<f64>,
    pub detection: Detection,
}

pub type Plotter = Box<
    dyn Fn(&PaddedRecording, ArrayView1<f64>, &Detection, &str) -> Result<(), Box<dyn Error>>
        + Send
        + Sync,
>;

pub struct Analysis {
    pub params: Parameters,

    pub plotter: Option<Plotter>,

    logger: Logger,
}

impl Analysis {
    pub fn new(params: Parameters, logger: Logger) -> Self {
        Analysis {
            params,
            plotter: None,
            logger,
        }
    }

    pub fn with_plotter(mut self, plotter: Plotter) -> Self {
        self.plotter = Some(plotter);
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Validates raw rows and analyzes what survives.
    pub fn analyze_raw(
        &self,
        rows: &[RawSample],
        window: Option<(f64, f64)>,
        label: &str,
    ) -> Outcome {
        let log = self.logger.new(o!("recording" => label.to_string()));
        let (recording, _) = recording::validate(rows, &log);
        self.analyze(&recording, window, label)
    }

    pub fn analyze(&self, recording: &Recording, window: Option<(f64, f64)>, label: &str) -> Outcome {
        let log = self.logger.new(o!("recording" => label.to_string()));
        let params = &self.params;

        let extremes = recording.extremes();
        let duration = recording.duration();
        let interval = Interval::resolve(window, duration, &log);

        let level = match params.pad_level {
            PadLevel::Mean => recording.mean_voltage().unwrap_or(0.0),
            PadLevel::Fixed(level) => level,
        };
        let dt = padding::estimate_dt(recording, params.dt_probe_index);
        let padded = padding::pad(recording, params.pad_amount, level, dt);

        let envelope = filter::envelope(&padded, params.cutoff);
        let envelope_finite = filter::is_finite(&envelope);
        if !envelope_finite {
            warn!(log, "envelope has non-finite values"; "cutoff" => params.cutoff);
        }

        let detector = params.detector();
        let initial = detector.detect(envelope.view(), &padded);
        let refined = spacing::refine(
            initial,
            params.cutoff,
            &padded,
            &params.retry_policy(),
            |cutoff| detector.detect(filter::envelope(&padded, cutoff).view(), &padded),
            || threshold::fallback_peaks(&padded, &extremes, params.threshold_ratio, &log),
            &log,
        );

        let envelope = if refined.retries > 0 {
            filter::envelope(&padded, refined.cutoff)
        } else {
            envelope
        };

        let metrics = Metrics::new(&refined.peaks, extremes, duration, &interval, &log);
        let detection = Detection {
            peaks: refined.peaks,
            method: if refined.used_fallback {
                DetectionMethod::Threshold
            } else {
                DetectionMethod::Envelope
            },
            cutoff: refined.cutoff,
            retries: refined.retries,
            envelope_finite,
        };

        self.plot(&padded, envelope.view(), &detection, label, &log);

        Outcome {
            metrics,
            padded,
            envelope,
            detection,
        }
    }

    fn plot(
        &self,
        padded: &PaddedRecording,
        envelope: ArrayView1<f64>,
        detection: &Detection,
        label: &str,
        log: &Logger,
    ) {
        if let Some(f) = &self.plotter {
            f(padded, envelope, detection, label).unwrap_or_else(|e| {
                warn!(log, "plotting failed"; "error" => e.to_string());
            });
        }
    }
}
