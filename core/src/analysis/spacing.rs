use ndarray::Array1;
use ndarray_stats::QuantileExt;
use slog::{debug, info, Logger};

use super::padding::PaddedRecording;
use super::peaks::PeakSet;

/// How the retry loop relaxes the envelope filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub cutoff_step: f64,
    pub max_retries: usize,
    /// Allowed excess of the largest gap over the mean gap, in seconds.
    pub spacing_slack: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            cutoff_step: 0.002,
            max_retries: 4,
            spacing_slack: 1.0,
        }
    }
}

/// Result of the retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    pub peaks: PeakSet,
    /// Cutoff that produced `peaks`.
    pub cutoff: f64,
    pub retries: usize,
    pub used_fallback: bool,
}

/// Time between consecutive peaks, the first gap measured from the start of
/// the padded recording.
pub fn peak_gaps(peaks: &PeakSet, padded: &PaddedRecording) -> Array1<f64> {
    let mut previous = 0;
    peaks
        .iter()
        .map(|peak| {
            let gap = padded.time_at(peak.index) - padded.time_at(previous);
            previous = peak.index;
            gap
        })
        .collect()
}

/// True when the largest gap exceeds the mean gap by more than `slack`,
/// a sign of missed or spurious beats. An empty set is never uneven.
pub fn is_unevenly_spaced(peaks: &PeakSet, padded: &PaddedRecording, slack: f64) -> bool {
    let gaps = peak_gaps(peaks, padded);
    match (gaps.max(), gaps.mean()) {
        (Ok(&max), Some(mean)) => max - mean > slack,
        _ => false,
    }
}

/// Bounded closed-loop correction of a detection.
///
/// An empty `initial` set goes straight to `fallback`. Otherwise, while the
/// peaks are unevenly spaced and retries remain, the cutoff is raised by one
/// step and `detect` is asked for a fresh set. The last set is kept even if
/// still uneven.
pub fn refine<D, F>(
    initial: PeakSet,
    cutoff: f64,
    padded: &PaddedRecording,
    policy: &RetryPolicy,
    mut detect: D,
    fallback: F,
    log: &Logger,
) -> Refined
where
    D: FnMut(f64) -> PeakSet,
    F: FnOnce() -> PeakSet,
{
    if initial.is_empty() {
        info!(log, "envelope detector found no peaks, using threshold fallback");
        return Refined {
            peaks: fallback(),
            cutoff,
            retries: 0,
            used_fallback: true,
        };
    }

    let mut peaks = initial;
    let mut cutoff = cutoff;
    let mut retries = 0;
    let mut uneven = is_unevenly_spaced(&peaks, padded, policy.spacing_slack);

    while uneven && retries < policy.max_retries {
        cutoff += policy.cutoff_step;
        retries += 1;
        peaks = detect(cutoff);
        uneven = is_unevenly_spaced(&peaks, padded, policy.spacing_slack);
        debug!(log, "re-detected with relaxed cutoff";
            "attempt" => retries, "cutoff" => cutoff, "peaks" => peaks.len(), "uneven" => uneven);
    }

    if uneven {
        info!(log, "peaks still unevenly spaced after retries";
            "retries" => retries, "cutoff" => cutoff);
    }

    Refined {
        peaks,
        cutoff,
        retries,
        used_fallback: false,
    }
}
