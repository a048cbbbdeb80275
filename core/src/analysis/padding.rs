use ndarray::{Array1, ArrayView1};

use super::recording::Recording;

/// A recording with `amount` flat samples on either side.
///
/// Layout is `[prefix pad] + [original] + [suffix pad]`; the pad length is
/// kept so positions can be mapped back to the original recording.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedRecording {
    time: Array1<f64>,
    voltage: Array1<f64>,
    amount: usize,
    original_len: usize,
}

impl PaddedRecording {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn amount(&self) -> usize {
        self.amount
    }

    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn time(&self) -> ArrayView1<f64> {
        self.time.view()
    }

    pub fn voltage(&self) -> ArrayView1<f64> {
        self.voltage.view()
    }

    pub fn time_at(&self, index: usize) -> f64 {
        self.time[index]
    }

    pub fn voltage_at(&self, index: usize) -> f64 {
        self.voltage[index]
    }

    /// Original index for a padded position, `None` inside the pads.
    pub fn original_index(&self, padded: usize) -> Option<usize> {
        padded
            .checked_sub(self.amount)
            .filter(|&i| i < self.original_len)
    }

    pub fn padded_index(&self, original: usize) -> usize {
        original + self.amount
    }

    pub fn is_padding(&self, padded: usize) -> bool {
        self.original_index(padded).is_none()
    }
}

/// Local sample spacing taken from `probe` and the sample before it. Falls
/// back to the first two samples on short recordings.
pub fn estimate_dt(recording: &Recording, probe: usize) -> f64 {
    let samples = recording.samples();
    if samples.len() < 2 {
        return 0.0;
    }
    let probe = probe.clamp(1, samples.len() - 1);
    samples[probe].time - samples[probe - 1].time
}

/// Surrounds the recording with `amount` samples at voltage `level` on
/// each side, continuing the time axis with step `dt`.
pub fn pad(recording: &Recording, amount: usize, level: f64, dt: f64) -> PaddedRecording {
    let original_len = recording.len();
    let total = original_len + 2 * amount;
    let samples = recording.samples();

    let (first_time, last_time) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first.time, last.time),
        _ => (0.0, 0.0),
    };

    let mut time = Vec::with_capacity(total);
    let mut voltage = Vec::with_capacity(total);

    let lead = first_time - dt * amount as f64;
    for k in 0..amount {
        time.push(lead + dt * k as f64);
        voltage.push(level);
    }
    for sample in samples {
        time.push(sample.time);
        voltage.push(sample.voltage);
    }
    // The suffix restarts at the last timestamp, so its first sample shares it.
    for k in 0..amount {
        time.push(last_time + dt * k as f64);
        voltage.push(level);
    }

    PaddedRecording {
        time: Array1::from(time),
        voltage: Array1::from(voltage),
        amount,
        original_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize, dt: f64) -> Recording {
        Recording::from_pairs((0..n).map(|i| (i as f64 * dt, (i as f64 * 0.3).sin())))
    }

    #[test]
    fn length_and_flat_ends() {
        let recording = ramp(80, 0.01);
        let padded = pad(&recording, 200, -0.25, 0.01);

        assert_eq!(padded.len(), 80 + 2 * 200);
        assert!((0..200).all(|i| padded.voltage_at(i) == -0.25));
        assert!((padded.len() - 200..padded.len()).all(|i| padded.voltage_at(i) == -0.25));
        assert_eq!(padded.voltage_at(0), -0.25);
        assert_eq!(padded.voltage_at(padded.len() - 1), -0.25);
    }

    #[test]
    fn time_axis_is_extended_both_ways() {
        let recording = ramp(60, 0.5);
        let padded = pad(&recording, 4, 0.0, 0.5);

        assert_relative_eq!(padded.time_at(0), -2.0);
        assert_relative_eq!(padded.time_at(3), -0.5);
        assert_relative_eq!(padded.time_at(4), 0.0);
        let last = recording.samples()[59].time;
        assert_relative_eq!(padded.time_at(64), last);
        assert_relative_eq!(padded.time_at(67), last + 1.5);
    }

    #[test]
    fn index_mapping_round_trips() {
        let recording = ramp(10, 0.1);
        let padded = pad(&recording, 3, 0.0, 0.1);

        assert_eq!(padded.original_index(2), None);
        assert_eq!(padded.original_index(3), Some(0));
        assert_eq!(padded.original_index(12), Some(9));
        assert_eq!(padded.original_index(13), None);
        assert_eq!(padded.padded_index(9), 12);
        assert_eq!(
            padded.voltage_at(padded.padded_index(4)),
            recording.samples()[4].voltage
        );
    }

    #[test]
    fn dt_comes_from_the_probe_sample() {
        let mut pairs: Vec<(f64, f64)> = (0..60).map(|i| (i as f64 * 0.01, 0.0)).collect();
        pairs[50].0 = pairs[49].0 + 0.02;
        let recording = Recording::from_pairs(pairs);

        assert_relative_eq!(estimate_dt(&recording, 50), 0.02, epsilon = 1e-12);
        assert_relative_eq!(estimate_dt(&ramp(5, 0.25), 50), 0.25);
        assert_eq!(estimate_dt(&ramp(1, 0.25), 50), 0.0);
    }
}
