use slog::{debug, info, Logger};

use super::padding::PaddedRecording;
use super::peaks::{Peak, PeakSet};
use super::recording::VoltageExtremes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// `ratio` of the extreme on this side of zero.
    pub fn nominal_threshold(self, extremes: &VoltageExtremes, ratio: f64) -> f64 {
        match self {
            Polarity::Positive => ratio * extremes.max,
            Polarity::Negative => ratio * extremes.min,
        }
    }
}

/// Edge-triggered crossing detector over the raw padded voltage.
///
/// Each sample is negated and compared against a threshold re-derived from
/// that same sample, so the effective test is "voltage below zero" for both
/// polarities and the nominal threshold never takes part. Events fire on
/// entering the negative region and re-arm once the voltage turns positive;
/// the recorded value is the negated voltage.
pub fn threshold_peaks(
    padded: &PaddedRecording,
    extremes: &VoltageExtremes,
    polarity: Polarity,
    ratio: f64,
    log: &Logger,
) -> PeakSet {
    let nominal = polarity.nominal_threshold(extremes, ratio);
    debug!(log, "threshold scan"; "polarity" => ?polarity, "nominal_threshold" => nominal);

    let mut triggered = false;
    let mut found = Vec::new();
    for (index, &voltage) in padded.voltage().iter().enumerate() {
        let x = -voltage;
        let threshold = -x;
        if x > threshold && !triggered {
            triggered = true;
            found.push(Peak {
                index,
                time: padded.time_at(index),
                value: x,
            });
        } else if x < threshold {
            triggered = false;
        }
    }

    PeakSet::new(found)
}

/// Runs both polarities and keeps the sparser result, positive on a tie.
pub fn fallback_peaks(
    padded: &PaddedRecording,
    extremes: &VoltageExtremes,
    ratio: f64,
    log: &Logger,
) -> PeakSet {
    let positive = threshold_peaks(padded, extremes, Polarity::Positive, ratio, log);
    let negative = threshold_peaks(padded, extremes, Polarity::Negative, ratio, log);
    info!(log, "threshold fallback";
        "positive" => positive.len(), "negative" => negative.len());

    if positive.len() > negative.len() {
        negative
    } else {
        positive
    }
}
