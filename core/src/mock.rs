//! Synthetic recordings for tests and demos.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::recording::{RawSample, Recording};

/// Gaussian R-waves on a flat baseline at a steady rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticEcg {
    pub bpm: f64,
    pub beats: usize,
    pub sample_rate: f64,
    pub amplitude: f64,
    /// Standard deviation of each R-wave, in seconds.
    pub width: f64,
    pub baseline: f64,
    /// Half-width of the uniform noise added to every sample.
    pub noise: f64,
}

impl Default for SyntheticEcg {
    fn default() -> Self {
        SyntheticEcg {
            bpm: 60.0,
            beats: 10,
            sample_rate: 250.0,
            amplitude: 1.0,
            width: 0.02,
            baseline: 0.0,
            noise: 0.0,
        }
    }
}

impl SyntheticEcg {
    pub fn period(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Recording length: one period per beat.
    pub fn seconds(&self) -> f64 {
        self.period() * self.beats as f64
    }

    /// Beats sit half a period into each cycle.
    pub fn beat_times(&self) -> Vec<f64> {
        let period = self.period();
        (0..self.beats)
            .map(|k| (k as f64 + 0.5) * period)
            .collect()
    }

    pub fn generate(&self, seed: u64) -> Recording {
        let mut rng = StdRng::seed_from_u64(seed);
        let beats = self.beat_times();
        let samples = (self.seconds() * self.sample_rate).round() as usize;

        Recording::from_pairs((0..samples).map(|i| {
            let t = i as f64 / self.sample_rate;
            let wave: f64 = beats
                .iter()
                .map(|&b| {
                    let z = (t - b) / self.width;
                    self.amplitude * (-0.5 * z * z).exp()
                })
                .sum();
            let noise = if self.noise > 0.0 {
                rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            };
            (t, self.baseline + wave + noise)
        }))
    }
}

/// Sine wave sampled every `dt` for `samples` samples.
pub fn sine(amplitude: f64, frequency: f64, dt: f64, samples: usize) -> Recording {
    Recording::from_pairs((0..samples).map(|i| {
        let t = i as f64 * dt;
        (t, amplitude * (2.0 * PI * frequency * t).sin())
    }))
}

/// Formats a recording back into loader rows.
pub fn to_raw(recording: &Recording) -> Vec<RawSample> {
    recording
        .samples()
        .iter()
        .map(|s| RawSample::new(s.time.to_string(), s.voltage.to_string()))
        .collect()
}
