//! Frequency-to-time conversion of a channel estimate
//!
//! The channel estimate is windowed, zero-padded (or cropped) to the
//! transform length, and inverse transformed. The strongest sample is the
//! direct path; everything after it is a candidate reflection.

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::config::WindowMode;

/// Output of one frequency-to-time conversion
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDomain {
    /// |h[n]|, rolled and normalized together with `complex`
    pub magnitude: Vec<f64>,
    /// Complex impulse response h[n]
    pub complex: Vec<Complex64>,
    /// Direct-path index after any alignment (0 when aligned)
    pub direct_index: usize,
    /// Direct-path magnitude before normalization
    pub raw_direct_amplitude: f64,
}

/// Symmetric Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos()))
        .collect()
}

/// Window, pad or crop to `n_fft`, and inverse transform
///
/// The inverse transform is scaled by `1 / n_fft`.
pub fn inverse_transform(values: &[Complex64], n_fft: usize, window: WindowMode) -> Vec<Complex64> {
    let mut buffer: Vec<Complex64> = match window {
        WindowMode::Hann => values
            .iter()
            .zip(hann_window(values.len()))
            .map(|(&v, w)| v * w)
            .collect(),
        WindowMode::None => values.to_vec(),
    };
    buffer.resize(n_fft, Complex64::new(0.0, 0.0));

    let mut planner = FftPlanner::<f64>::new();
    let ifft = planner.plan_fft_inverse(n_fft);
    ifft.process(&mut buffer);

    let scale = 1.0 / n_fft as f64;
    for sample in buffer.iter_mut() {
        *sample *= scale;
    }
    buffer
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Copy `buffer` so that element `shift` lands at index 0
pub fn rotate_to_front<T: Copy>(buffer: &[T], shift: usize) -> Vec<T> {
    let n = buffer.len();
    if n == 0 {
        return Vec::new();
    }
    let shift = shift % n;
    (0..n).map(|i| buffer[(i + shift) % n]).collect()
}

/// Uniform time axis in seconds for `n` samples at `sample_rate_hz`
pub fn time_axis(n: usize, sample_rate_hz: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 / sample_rate_hz).collect()
}

/// Full time-response computation
pub fn compute(
    values: &[Complex64],
    n_fft: usize,
    window: WindowMode,
    direct_at_zero: bool,
    normalize_power: bool,
) -> TimeDomain {
    let mut complex = inverse_transform(values, n_fft, window);
    let mut magnitude: Vec<f64> = complex.iter().map(|c| c.norm()).collect();

    let peak = argmax(&magnitude);
    let direct_index = if direct_at_zero && peak != 0 {
        complex = rotate_to_front(&complex, peak);
        magnitude = rotate_to_front(&magnitude, peak);
        0
    } else if direct_at_zero {
        0
    } else {
        peak
    };

    let raw_direct_amplitude = magnitude[direct_index];
    if normalize_power {
        if raw_direct_amplitude > 0.0 {
            for m in magnitude.iter_mut() {
                *m /= raw_direct_amplitude;
            }
            for c in complex.iter_mut() {
                *c /= raw_direct_amplitude;
            }
        } else {
            log::warn!("Direct-path magnitude is zero, skipping power normalization");
        }
    }

    TimeDomain {
        magnitude,
        complex,
        direct_index,
        raw_direct_amplitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(5);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[2], 1.0);
        assert_relative_eq!(w[4], 0.0, epsilon = 1e-15);
        assert_relative_eq!(w[1], w[3], epsilon = 1e-12);
        assert_eq!(hann_window(1), vec![1.0]);
        assert!(hann_window(0).is_empty());
    }

    #[test]
    fn test_flat_spectrum_gives_impulse() {
        let values = vec![Complex64::new(1.0, 0.0); 64];
        let out = inverse_transform(&values, 64, WindowMode::None);
        assert_relative_eq!(out[0].re, 1.0, epsilon = 1e-12);
        for sample in &out[1..] {
            assert!(sample.norm() < 1e-12);
        }
    }

    #[test]
    fn test_zero_padding_scales_by_transform_length() {
        let values = vec![Complex64::new(1.0, 0.0); 64];
        let out = inverse_transform(&values, 256, WindowMode::None);
        assert_eq!(out.len(), 256);
        assert_relative_eq!(out[0].norm(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_crop_to_shorter_transform() {
        let values = vec![Complex64::new(1.0, 0.0); 64];
        let out = inverse_transform(&values, 32, WindowMode::None);
        assert_eq!(out.len(), 32);
        assert_relative_eq!(out[0].norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(&[0.1, 0.5, 0.2, 0.5]), 1);
        assert_eq!(argmax(&[0.0]), 0);
    }

    #[test]
    fn test_rotate_to_front_wraps() {
        assert_eq!(rotate_to_front(&[0, 1, 2, 3, 4], 3), vec![3, 4, 0, 1, 2]);
        assert_eq!(rotate_to_front(&[0, 1, 2], 0), vec![0, 1, 2]);
        assert_eq!(rotate_to_front(&[0, 1, 2], 4), vec![1, 2, 0]);
    }

    #[test]
    fn test_direct_alignment_and_normalization() {
        // Pure delay of 10 samples: H[k] = exp(-j 2 pi k 10 / n)
        let n = 128;
        let values: Vec<Complex64> = (0..n)
            .map(|k| Complex64::from_polar(0.5, -2.0 * PI * k as f64 * 10.0 / n as f64))
            .collect();

        let unaligned = compute(&values, n, WindowMode::None, false, false);
        assert_eq!(unaligned.direct_index, 10);
        assert_relative_eq!(unaligned.magnitude[10], 0.5, epsilon = 1e-12);

        let aligned = compute(&values, n, WindowMode::None, true, true);
        assert_eq!(aligned.direct_index, 0);
        assert_eq!(aligned.magnitude[0], 1.0);
        assert_relative_eq!(aligned.raw_direct_amplitude, 0.5, epsilon = 1e-12);
        assert_relative_eq!(aligned.complex[0].norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_input_skips_normalization() {
        let values = vec![Complex64::new(0.0, 0.0); 16];
        let out = compute(&values, 16, WindowMode::Hann, true, true);
        assert_eq!(out.direct_index, 0);
        assert!(out.magnitude.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_time_axis_spacing() {
        let axis = time_axis(4, 1000.0);
        assert_eq!(axis, vec![0.0, 0.001, 0.002, 0.003]);
    }
}
