use num_complex::Complex64;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use crate::error::{EchoError, Result};
use crate::spectrum::{ChannelEstimate, RawSpectrum};

/// A single reflection injected into a synthetic channel
///
/// The delay is expressed in time-response bins of the transform length
/// used for synthesis, so a detector built with the same transform length
/// sees the reflection peak at exactly `delay_bins`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Reflection {
    pub delay_bins: f64,
    /// Amplitude relative to the direct path
    pub amplitude: f64,
    #[serde(default)]
    pub phase_rad: f64,
}

impl Reflection {
    pub fn new(delay_bins: f64, amplitude: f64) -> Self {
        Self {
            delay_bins,
            amplitude,
            phase_rad: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AdditiveNoiseConfig {
    pub snr_db: f64,
}

/// Frequency response of a unit direct path plus reflections
///
/// `H[k] = 1 + Σ a·exp(j(φ − 2π·k·d / n_fft))` for `k` in `0..subcarriers`.
pub fn reflection_response(
    subcarriers: usize,
    n_fft: usize,
    reflections: &[Reflection],
) -> Vec<Complex64> {
    (0..subcarriers)
        .map(|k| {
            reflections
                .iter()
                .fold(Complex64::new(1.0, 0.0), |acc, r| {
                    let phase = r.phase_rad - 2.0 * PI * k as f64 * r.delay_bins / n_fft as f64;
                    acc + Complex64::from_polar(r.amplitude, phase)
                })
        })
        .collect()
}

pub fn signal_power(values: &[Complex64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v.norm_sqr()).sum::<f64>() / values.len() as f64
}

/// Add circular complex Gaussian noise at the given SNR
pub fn add_complex_noise(
    values: &mut [Complex64],
    config: &AdditiveNoiseConfig,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let sig_power = signal_power(values);
    if sig_power == 0.0 {
        return Ok(());
    }
    let noise_power = sig_power / 10f64.powf(config.snr_db / 10.0);
    let per_component_std = (noise_power / 2.0).sqrt();
    let normal = Normal::new(0.0, per_component_std)
        .map_err(|e| EchoError::InvalidConfig(format!("noise distribution: {}", e)))?;

    for value in values.iter_mut() {
        *value += Complex64::new(normal.sample(rng), normal.sample(rng));
    }
    Ok(())
}

/// Builder for synthetic channel estimates
///
/// ```
/// use echoscope::simulation::{Reflection, SyntheticChannel};
///
/// let estimate = SyntheticChannel::new(256, 50e3)
///     .with_transform_length(256)
///     .with_reflection(Reflection::new(40.0, 0.5))
///     .build()
///     .unwrap();
/// assert_eq!(estimate.subcarrier_count(), 256);
/// ```
#[derive(Clone, Debug)]
pub struct SyntheticChannel {
    subcarriers: usize,
    spacing_hz: f64,
    n_fft: Option<usize>,
    reflections: Vec<Reflection>,
    noise: Option<AdditiveNoiseConfig>,
    snapshots: usize,
    seed: u64,
}

impl SyntheticChannel {
    pub fn new(subcarriers: usize, spacing_hz: f64) -> Self {
        Self {
            subcarriers,
            spacing_hz,
            n_fft: None,
            reflections: Vec::new(),
            noise: None,
            snapshots: 1,
            seed: 0,
        }
    }

    /// Transform length the reflection delays are expressed in
    ///
    /// Defaults to the detector's default transform length for this N.
    pub fn with_transform_length(mut self, n_fft: usize) -> Self {
        self.n_fft = Some(n_fft);
        self
    }

    pub fn with_reflection(mut self, reflection: Reflection) -> Self {
        self.reflections.push(reflection);
        self
    }

    pub fn with_reflections(mut self, reflections: impl IntoIterator<Item = Reflection>) -> Self {
        self.reflections.extend(reflections);
        self
    }

    pub fn with_awgn(mut self, snr_db: f64) -> Self {
        self.noise = Some(AdditiveNoiseConfig { snr_db });
        self
    }

    /// Number of independently noisy snapshots
    pub fn with_snapshots(mut self, snapshots: usize) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn transform_length(&self) -> usize {
        self.n_fft
            .unwrap_or_else(|| crate::detector::default_transform_length(self.subcarriers))
    }

    /// Generate the raw input, one row per snapshot when more than one
    pub fn raw_spectrum(&self) -> Result<RawSpectrum> {
        let clean = reflection_response(self.subcarriers, self.transform_length(), &self.reflections);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut rows = Vec::with_capacity(self.snapshots);
        for _ in 0..self.snapshots {
            let mut row = clean.clone();
            if let Some(ref noise) = self.noise {
                add_complex_noise(&mut row, noise, &mut rng)?;
            }
            rows.push(row);
        }

        if rows.len() == 1 {
            Ok(RawSpectrum::Complex(rows.remove(0)))
        } else {
            Ok(RawSpectrum::Snapshots(rows))
        }
    }

    pub fn build(&self) -> Result<ChannelEstimate> {
        ChannelEstimate::new(self.raw_spectrum()?, self.spacing_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_reflections_is_flat() {
        let h = reflection_response(16, 64, &[]);
        assert!(h.iter().all(|&v| v == Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_reflection_phase_ramp() {
        let h = reflection_response(4, 8, &[Reflection::new(2.0, 0.5)]);
        // k = 1: exp(-j*pi/2) = -j
        assert_relative_eq!(h[1].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(h[1].im, -0.5, epsilon = 1e-12);
        // k = 2: exp(-j*pi) = -1
        assert_relative_eq!(h[2].re, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let a = SyntheticChannel::new(64, 50e3).with_awgn(20.0).with_seed(7);
        let first = a.build().unwrap();
        let second = a.build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_noise_power_matches_snr() {
        let mut values = vec![Complex64::new(1.0, 0.0); 20000];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        add_complex_noise(&mut values, &AdditiveNoiseConfig { snr_db: 10.0 }, &mut rng).unwrap();
        let noise_power = values
            .iter()
            .map(|v| (v - Complex64::new(1.0, 0.0)).norm_sqr())
            .sum::<f64>()
            / values.len() as f64;
        assert_relative_eq!(noise_power, 0.1, max_relative = 0.05);
    }

    #[test]
    fn test_multiple_snapshots_are_averaged() {
        let estimate = SyntheticChannel::new(32, 25e3)
            .with_awgn(30.0)
            .with_snapshots(4)
            .build()
            .unwrap();
        assert_eq!(estimate.snapshot_count(), 4);
        assert_eq!(estimate.subcarrier_count(), 32);
    }
}
