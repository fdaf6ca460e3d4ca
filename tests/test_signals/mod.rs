#![allow(dead_code)]

use echoscope::simulation::{Reflection, SyntheticChannel};
use echoscope::{DetectorConfig, EchoDetector};

pub const SPACING_HZ: f64 = 50_000.0;

fn reflections(pairs: &[(f64, f64)]) -> impl Iterator<Item = Reflection> + '_ {
    pairs.iter().map(|&(delay, amp)| Reflection::new(delay, amp))
}

/// Detector over a noiseless channel with reflections on the transform grid
pub fn detector_with_reflections(n: usize, n_fft: usize, pairs: &[(f64, f64)]) -> EchoDetector {
    let estimate = SyntheticChannel::new(n, SPACING_HZ)
        .with_transform_length(n_fft)
        .with_reflections(reflections(pairs))
        .build()
        .expect("synthetic channel");
    let config = DetectorConfig {
        n_fft: Some(n_fft),
        channel_id: 42,
        ..Default::default()
    };
    EchoDetector::new(estimate, &config).expect("detector")
}

/// Same channel with seeded AWGN, optionally over several snapshots
pub fn noisy_detector(
    n: usize,
    n_fft: usize,
    pairs: &[(f64, f64)],
    snr_db: f64,
    snapshots: usize,
    seed: u64,
) -> EchoDetector {
    let estimate = SyntheticChannel::new(n, SPACING_HZ)
        .with_transform_length(n_fft)
        .with_reflections(reflections(pairs))
        .with_awgn(snr_db)
        .with_snapshots(snapshots)
        .with_seed(seed)
        .build()
        .expect("synthetic channel");
    let config = DetectorConfig {
        n_fft: Some(n_fft),
        ..Default::default()
    };
    EchoDetector::new(estimate, &config).expect("detector")
}
