use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type, Q_BUTTERWORTH_F64};
use ndarray::{s, Array1, ArrayView1};
use rustfft::{num_complex::Complex64, FftPlanner};

use super::padding::PaddedRecording;

/// Edge extension used before zero-phase filtering, three times the
/// coefficient count of a second order section.
const FILTFILT_PADLEN: usize = 9;

/// Smoothed amplitude envelope of the padded voltage: analytic-signal
/// magnitude followed by a zero-phase 2nd order Butterworth low-pass.
///
/// `cutoff` is normalized to Nyquist and must lie in (0, 1). Degenerate input
/// (bad cutoff, too few samples, non-finite voltages) yields non-finite
/// values instead of an error; callers check with [`is_finite`].
pub fn envelope(padded: &PaddedRecording, cutoff: f64) -> Array1<f64> {
    let amplitude = hilbert_envelope(padded.voltage());
    lowpass_filter(amplitude.view(), cutoff)
}

pub fn is_finite(envelope: &Array1<f64>) -> bool {
    envelope.iter().all(|v| v.is_finite())
}

/// Magnitude of the FFT-based analytic signal.
pub fn hilbert_envelope(data: ArrayView1<f64>) -> Array1<f64> {
    let n = data.len();
    if n == 0 {
        return Array1::zeros(0);
    }

    let mut buffer: Vec<Complex64> = data.iter().map(|&v| Complex64::new(v, 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    // Keep DC (and Nyquist for even n), double positive frequencies, drop negative ones.
    let half = n / 2;
    let positive_end = if n % 2 == 0 { half } else { (n + 1) / 2 };
    for (k, bin) in buffer.iter_mut().enumerate() {
        let weight = if k == 0 || (n % 2 == 0 && k == half) {
            1.0
        } else if k < positive_end {
            2.0
        } else {
            0.0
        };
        *bin *= weight;
    }

    planner.plan_fft_inverse(n).process(&mut buffer);

    let scale = 1.0 / n as f64;
    buffer.iter().map(|c| c.norm() * scale).collect()
}

/// Second order Butterworth low-pass with normalized cutoff, applied
/// forward and backward.
pub fn lowpass_filter(data: ArrayView1<f64>, cutoff: f64) -> Array1<f64> {
    let n = data.len();
    if !(cutoff > 0.0 && cutoff < 1.0) || n <= FILTFILT_PADLEN {
        return Array1::from_elem(n, f64::NAN);
    }

    // With fs = 2 Hz the cutoff in Hz equals the Nyquist-normalized value.
    let coeff = match Coefficients::<f64>::from_params(
        Type::LowPass,
        2.0_f64.hz(),
        cutoff.hz(),
        Q_BUTTERWORTH_F64,
    ) {
        Ok(coeff) => coeff,
        Err(_) => return Array1::from_elem(n, f64::NAN),
    };

    let extended = odd_extension(data, FILTFILT_PADLEN);
    let filtered = forward_backward_filter(extended.view(), &coeff);
    filtered
        .slice(s![FILTFILT_PADLEN..FILTFILT_PADLEN + n])
        .to_owned()
}

/// Reflects the signal about each endpoint, `2 * x[0] - x[k]` on the left
/// and `2 * x[n-1] - x[n-1-k]` on the right.
fn odd_extension(data: ArrayView1<f64>, padlen: usize) -> Array1<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];

    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((1..=padlen).rev().map(|k| 2.0 * first - data[k]));
    out.extend(data.iter().copied());
    out.extend((1..=padlen).map(|k| 2.0 * last - data[n - 1 - k]));
    Array1::from(out)
}

fn forward_filter(data: ArrayView1<f64>, coefficients: &Coefficients<f64>) -> Vec<f64> {
    let mut filter = DirectForm1::<f64>::new(*coefficients);

    // Start from the steady state of the first sample: the low-pass has unit
    // DC gain, so filtering the offset-removed signal and adding the offset
    // back is equivalent.
    let offset = data[0];
    data.iter()
        .map(|&sample| filter.run(sample - offset) + offset)
        .collect()
}

fn forward_backward_filter(data: ArrayView1<f64>, coefficients: &Coefficients<f64>) -> Array1<f64> {
    // Forward pass
    let mut processed_data = forward_filter(data, coefficients);

    // Reverse the data for the backward pass
    processed_data.reverse();

    // Backward pass with a fresh filter state
    let mut processed_data = forward_filter(ArrayView1::from(processed_data.as_slice()), coefficients);

    // Re-reverse the data to restore original order
    processed_data.reverse();

    Array1::from(processed_data)
}
