use std::collections::BTreeMap;

use ndarray::ArrayView1;
use noisy_float::prelude::R64;

use super::padding::PaddedRecording;

/// A detected beat. `index` points into the padded recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub time: f64,
    pub value: f64,
}

/// Detected beats, ordered by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakSet(Vec<Peak>);

impl PeakSet {
    pub fn new(peaks: Vec<Peak>) -> Self {
        PeakSet(peaks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Peak] {
        &self.0
    }

    pub fn indices(&self) -> Vec<usize> {
        self.0.iter().map(|p| p.index).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.time).collect()
    }
}

impl FromIterator<Peak> for PeakSet {
    fn from_iter<I: IntoIterator<Item = Peak>>(iter: I) -> Self {
        PeakSet(iter.into_iter().collect())
    }
}

/// Noise floor used by the amplitude gate: the most frequent voltage after
/// rounding to one decimal. Ties go to the lowest value.
///
/// Named `median_voltage` by convention even though it is a mode.
pub fn median_voltage(voltages: ArrayView1<f64>) -> f64 {
    let mut counts: BTreeMap<R64, usize> = BTreeMap::new();
    for rounded in voltages
        .iter()
        .filter_map(|&v| R64::try_new((v * 10.0).round() / 10.0))
    {
        *counts.entry(rounded).or_insert(0) += 1;
    }

    let mut best: Option<(R64, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map_or(0.0, |(value, _)| value.raw())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No rise seen past time zero yet.
    Idle,
    /// Rising and eligible to accept the next peak.
    Rising,
    /// A peak was accepted; waiting for the envelope to rise again.
    Cooldown,
}

/// Single forward pass over an envelope, one sample at a time.
///
/// A peak is taken at the first non-increasing sample after a rise, provided
/// the scanner is [`ScanState::Rising`], the previous peak is more than
/// `min_separation` samples back, and the value clears `gate`.
#[derive(Debug, Clone)]
pub struct Scanner {
    state: ScanState,
    previous: f64,
    last_accepted: Option<usize>,
    min_separation: usize,
    gate: f64,
}

impl Scanner {
    pub fn new(first_value: f64, min_separation: usize, gate: f64) -> Self {
        Scanner {
            state: ScanState::Idle,
            previous: first_value,
            last_accepted: None,
            min_separation,
            gate,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Feeds one sample; returns true when it is accepted as a peak.
    pub fn step(&mut self, index: usize, value: f64, time: f64) -> bool {
        // NaN is neither rising nor settled, so it can never produce a peak.
        let rising = value - self.previous > 0.0;
        let settled = value - self.previous <= 0.0;
        let separated = self
            .last_accepted
            .map_or(true, |last| index.saturating_sub(last) > self.min_separation);

        let mut accepted = false;
        self.state = match self.state {
            ScanState::Idle if rising && time > 0.0 => ScanState::Rising,
            ScanState::Idle => ScanState::Idle,
            ScanState::Rising if settled && separated && value > self.gate => {
                self.last_accepted = Some(index);
                accepted = true;
                ScanState::Cooldown
            }
            ScanState::Rising => ScanState::Rising,
            ScanState::Cooldown if rising => ScanState::Rising,
            ScanState::Cooldown => ScanState::Cooldown,
        };
        self.previous = value;

        accepted
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDetector {
    pub min_separation: usize,
    pub amplitude_gain: f64,
}

impl Default for PeakDetector {
    fn default() -> Self {
        PeakDetector {
            min_separation: 5,
            amplitude_gain: 0.2,
        }
    }
}

impl PeakDetector {
    /// Gate the envelope must exceed for a peak to count.
    pub fn gate(&self, padded: &PaddedRecording) -> f64 {
        let median = median_voltage(padded.voltage());
        median + self.amplitude_gain * median
    }

    /// Scans `envelope` (same length as `padded`) for beats. An empty set is a
    /// valid outcome for flat, monotonic or non-finite envelopes.
    pub fn detect(&self, envelope: ArrayView1<f64>, padded: &PaddedRecording) -> PeakSet {
        let Some(&first) = envelope.first() else {
            return PeakSet::default();
        };

        let mut scanner = Scanner::new(first, self.min_separation, self.gate(padded));
        envelope
            .iter()
            .enumerate()
            .take(padded.len())
            .filter_map(|(index, &value)| {
                let time = padded.time_at(index);
                scanner
                    .step(index, value, time)
                    .then_some(Peak { index, time, value })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::padding::pad;
    use crate::analysis::recording::Recording;
    use ndarray::Array1;

    fn flat_padded(n: usize, voltage: f64) -> PaddedRecording {
        let recording = Recording::from_pairs((0..n).map(|i| ((i + 1) as f64 * 0.01, voltage)));
        pad(&recording, 0, voltage, 0.01)
    }

    fn triangle(n: usize, period: usize) -> Array1<f64> {
        let half = (period / 2) as f64;
        (0..n)
            .map(|i| half - ((i % period) as f64 - half).abs())
            .collect()
    }

    #[test]
    fn median_voltage_is_the_rounded_mode() {
        let voltages = Array1::from(vec![0.11, 0.12, 0.09, 0.5, 0.49, -0.2]);
        assert_eq!(median_voltage(voltages.view()), 0.1);

        let tie = Array1::from(vec![0.5, 0.5, 0.1, 0.1]);
        assert_eq!(median_voltage(tie.view()), 0.1);

        assert_eq!(median_voltage(Array1::<f64>::zeros(0).view()), 0.0);
    }

    #[test]
    fn peaks_taken_just_after_each_maximum() {
        let padded = flat_padded(40, 0.0);
        let envelope = triangle(40, 8);
        let peaks = PeakDetector::default().detect(envelope.view(), &padded);

        assert_eq!(peaks.indices(), vec![5, 13, 21, 29, 37]);
        assert!(peaks.iter().all(|p| p.value == 3.0));
        assert_eq!(peaks.as_slice()[0].time, padded.time_at(5));
    }

    #[test]
    fn close_wiggles_respect_min_separation() {
        let padded = flat_padded(60, 0.0);
        let envelope: Array1<f64> = (0..60)
            .map(|i| if i == 0 { 0.0 } else if i % 2 == 1 { 2.0 } else { 1.0 })
            .collect();
        let peaks = PeakDetector::default().detect(envelope.view(), &padded);
        let indices = peaks.indices();

        assert_eq!(indices[0], 2);
        assert_eq!(indices[1], 8);
        assert!(indices.windows(2).all(|w| w[1] > w[0] && w[1] - w[0] > 5));
    }

    #[test]
    fn leading_pad_is_ignored() {
        let recording = Recording::from_pairs((0..40).map(|i| (i as f64 * 0.1, 0.0)));
        let padded = pad(&recording, 16, 0.0, 0.1);
        // A bump entirely inside the pad, then a flat tail.
        let envelope: Array1<f64> = (0..padded.len())
            .map(|i| if (4..8).contains(&i) { 1.0 + i as f64 } else { 0.0 })
            .collect();

        assert!(PeakDetector::default().detect(envelope.view(), &padded).is_empty());
    }

    #[test]
    fn amplitude_gate_uses_the_noise_floor() {
        let padded = flat_padded(40, 1.0);
        let mut envelope = Array1::from_elem(40, 1.0);
        // Too small: the envelope stops rising at 1.12.
        envelope[10] = 1.1;
        envelope[11] = 1.15;
        envelope[12] = 1.12;
        // Stops rising at 1.3, above the 1.2 gate.
        envelope[25] = 1.4;
        envelope[26] = 1.5;
        envelope[27] = 1.3;

        let peaks = PeakDetector::default().detect(envelope.view(), &padded);
        assert_eq!(peaks.indices(), vec![27]);
    }

    #[test]
    fn flat_monotonic_or_nan_envelopes_find_nothing() {
        let padded = flat_padded(30, 0.0);
        let detector = PeakDetector::default();

        assert!(detector.detect(Array1::zeros(30).view(), &padded).is_empty());
        let ramp: Array1<f64> = (0..30).map(|i| i as f64).collect();
        assert!(detector.detect(ramp.view(), &padded).is_empty());
        assert!(detector
            .detect(Array1::from_elem(30, f64::NAN).view(), &padded)
            .is_empty());
    }

    #[test]
    fn scanner_walks_through_its_states() {
        let mut scanner = Scanner::new(0.0, 5, 0.0);
        assert_eq!(scanner.state(), ScanState::Idle);

        assert!(!scanner.step(1, 1.0, -0.5));
        assert_eq!(scanner.state(), ScanState::Idle);

        assert!(!scanner.step(2, 2.0, 0.1));
        assert_eq!(scanner.state(), ScanState::Rising);

        assert!(scanner.step(3, 1.5, 0.2));
        assert_eq!(scanner.state(), ScanState::Cooldown);

        assert!(!scanner.step(4, 1.0, 0.3));
        assert_eq!(scanner.state(), ScanState::Cooldown);

        assert!(!scanner.step(5, 3.0, 0.4));
        assert_eq!(scanner.state(), ScanState::Rising);

        // Too close to the peak at index 3.
        assert!(!scanner.step(6, 2.0, 0.5));
        assert_eq!(scanner.state(), ScanState::Rising);
    }
}
