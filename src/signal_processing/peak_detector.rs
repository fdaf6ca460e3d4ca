use crate::config::{EchoSearchConfig, ThresholdMode};
use crate::constants::FEET_PER_METER;
use crate::error::{EchoError, Result};

/// Echo peak detector over a time-response magnitude array
///
/// Candidates are all samples in the search window at or above the
/// threshold. Peaks are then picked greedily by descending magnitude,
/// rejecting any candidate closer than the minimum separation to a peak
/// already accepted. The accepted peaks are returned in bin order.
///
/// All bin arithmetic uses the detection sample rate (n_fft × subcarrier
/// spacing), never a reporting override.
#[derive(Debug, Clone)]
pub struct EchoPeakDetector {
    threshold_frac: f64,
    guard_bins: usize,
    edge_guard_bins: usize,
    min_separation_bins: usize,
    max_delay_s: Option<f64>,
    max_peaks: usize,
    sample_rate_hz: f64,
}

/// Result of one peak search
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSelection {
    /// Accepted peak bins, ascending
    pub bins: Vec<usize>,
    /// Threshold fraction actually applied
    pub threshold_frac: f64,
    /// Effective guard after combining explicit and distance guards
    pub guard_bins: usize,
    /// First bin searched
    pub search_start: usize,
    /// One past the last bin searched
    pub search_stop: usize,
}

impl EchoPeakDetector {
    /// Create a new echo peak detector
    ///
    /// # Arguments
    /// * `config` - Search parameters for this call
    /// * `sample_rate_hz` - Detection sample rate (n_fft × subcarrier spacing)
    /// * `propagation_speed_mps` - Signal speed in the cable, used for the distance guard
    pub fn new(
        config: &EchoSearchConfig,
        sample_rate_hz: f64,
        propagation_speed_mps: f64,
    ) -> Result<Self> {
        let threshold_frac = resolve_threshold_frac(
            config.threshold_mode,
            config.threshold_frac,
            config.threshold_db_down,
        )?;

        let distance_guard = config
            .min_detect_distance_ft
            .map_or(0, |ft| distance_guard_bins(ft, propagation_speed_mps, sample_rate_hz));

        Ok(Self {
            threshold_frac,
            guard_bins: config.guard_bins.max(distance_guard),
            edge_guard_bins: config.edge_guard_bins,
            min_separation_bins: min_separation_bins(config.min_separation_s, sample_rate_hz),
            max_delay_s: config.max_delay_s,
            max_peaks: config.max_peaks,
            sample_rate_hz,
        })
    }

    pub fn threshold_frac(&self) -> f64 {
        self.threshold_frac
    }

    pub fn guard_bins(&self) -> usize {
        self.guard_bins
    }

    pub fn min_separation_bins(&self) -> usize {
        self.min_separation_bins
    }

    /// Find echo peaks after the direct path
    ///
    /// # Arguments
    /// * `magnitude` - Time-response magnitude
    /// * `direct_index` - Direct-path bin in `magnitude`
    pub fn detect(&self, magnitude: &[f64], direct_index: usize) -> PeakSelection {
        let (search_start, search_stop) = search_window(
            direct_index,
            self.guard_bins,
            magnitude.len(),
            self.max_delay_s,
            self.sample_rate_hz,
        );
        let threshold = self.threshold_frac * magnitude.get(direct_index).copied().unwrap_or(0.0);

        let candidates = collect_candidates(
            magnitude,
            search_start,
            search_stop,
            threshold,
            self.edge_guard_bins,
            direct_index,
        );
        let bins = select_spaced_peaks(
            magnitude,
            &candidates,
            self.min_separation_bins,
            self.max_peaks,
        );

        log::debug!(
            "Echo search bins [{}, {}): threshold {:.4} (frac {:.4}), {} candidates, {} accepted",
            search_start,
            search_stop,
            threshold,
            self.threshold_frac,
            candidates.len(),
            bins.len()
        );

        PeakSelection {
            bins,
            threshold_frac: self.threshold_frac,
            guard_bins: self.guard_bins,
            search_start,
            search_stop,
        }
    }
}

/// Threshold as a fraction of the direct-path amplitude
///
/// db_down converts via `10^(-dB/20)`, so 20 dB gives 0.1.
pub fn resolve_threshold_frac(mode: ThresholdMode, frac: f64, db_down: f64) -> Result<f64> {
    match mode {
        ThresholdMode::Fractional => {
            if frac.is_finite() && frac > 0.0 && frac <= 1.0 {
                Ok(frac)
            } else {
                Err(EchoError::InvalidThreshold(format!(
                    "threshold_frac must lie in (0, 1], got {}",
                    frac
                )))
            }
        }
        ThresholdMode::DbDown => {
            if db_down.is_finite() && db_down >= 0.0 {
                Ok(10f64.powf(-db_down / 20.0))
            } else {
                Err(EchoError::InvalidThreshold(format!(
                    "threshold_db_down must be a non-negative number of dB, got {}",
                    db_down
                )))
            }
        }
    }
}

/// Guard bins implied by a minimum detection distance
///
/// Uses the round-trip time `2·d / v` at the detection sample rate.
pub fn distance_guard_bins(distance_ft: f64, propagation_speed_mps: f64, sample_rate_hz: f64) -> usize {
    if distance_ft <= 0.0 {
        return 0;
    }
    let distance_m = distance_ft / FEET_PER_METER;
    let round_trip_s = 2.0 * distance_m / propagation_speed_mps;
    (round_trip_s * sample_rate_hz).ceil() as usize
}

/// Half-open search window `[start, stop)`
///
/// `stop <= start` means there is nothing to search.
pub fn search_window(
    direct_index: usize,
    guard_bins: usize,
    n: usize,
    max_delay_s: Option<f64>,
    sample_rate_hz: f64,
) -> (usize, usize) {
    let start = direct_index.saturating_add(guard_bins);
    let stop = match max_delay_s {
        Some(max_delay) => n.min((max_delay * sample_rate_hz).ceil() as usize),
        None => n,
    };
    (start, stop)
}

/// Minimum peak spacing in bins, never below 1
pub fn min_separation_bins(min_separation_s: f64, sample_rate_hz: f64) -> usize {
    ((min_separation_s * sample_rate_hz).round() as usize).max(1)
}

/// Indices in `[start, stop)` at or above `threshold`
///
/// Bins within `edge_guard_bins` of `stop` and the direct-path bin itself
/// are never candidates.
pub fn collect_candidates(
    magnitude: &[f64],
    start: usize,
    stop: usize,
    threshold: f64,
    edge_guard_bins: usize,
    direct_index: usize,
) -> Vec<usize> {
    let stop = stop.min(magnitude.len());
    if stop <= start {
        return Vec::new();
    }
    let edge = stop.saturating_sub(edge_guard_bins);
    (start..stop.min(edge))
        .filter(|&i| i != direct_index && magnitude[i] >= threshold)
        .collect()
}

/// Greedy non-maximum suppression by descending magnitude
///
/// Returns at most `max_peaks` bins, sorted ascending.
pub fn select_spaced_peaks(
    magnitude: &[f64],
    candidates: &[usize],
    min_separation_bins: usize,
    max_peaks: usize,
) -> Vec<usize> {
    let mut ordered = candidates.to_vec();
    ordered.sort_by(|&a, &b| magnitude[b].total_cmp(&magnitude[a]));

    let mut accepted: Vec<usize> = Vec::with_capacity(max_peaks.min(ordered.len()));
    for idx in ordered {
        if accepted.len() >= max_peaks {
            break;
        }
        if accepted
            .iter()
            .all(|&peak| peak.abs_diff(idx) >= min_separation_bins)
        {
            accepted.push(idx);
        }
    }

    accepted.sort_unstable();
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn impulse_train(n: usize, peaks: &[(usize, f64)]) -> Vec<f64> {
        let mut signal = vec![0.0; n];
        for &(i, amp) in peaks {
            signal[i] = amp;
        }
        signal
    }

    #[test]
    fn test_threshold_resolution() {
        assert_eq!(
            resolve_threshold_frac(ThresholdMode::Fractional, 0.25, 0.0).unwrap(),
            0.25
        );
        assert_relative_eq!(
            resolve_threshold_frac(ThresholdMode::DbDown, 0.0, 20.0).unwrap(),
            0.1,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            resolve_threshold_frac(ThresholdMode::DbDown, 0.0, 6.0).unwrap(),
            0.501187,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_fractional_threshold_range() {
        for frac in [0.0, -0.1, 1.01, f64::NAN] {
            assert!(matches!(
                resolve_threshold_frac(ThresholdMode::Fractional, frac, 20.0),
                Err(EchoError::InvalidThreshold(_))
            ));
        }
        assert!(resolve_threshold_frac(ThresholdMode::Fractional, 1.0, 20.0).is_ok());
    }

    #[test]
    fn test_distance_guard() {
        // 100 ft of RG6 at 102.4 MHz: t = 2 * 30.48 / (0.87 c) = 233.7 ns -> 23.93 bins
        let v = 0.87 * crate::constants::SPEED_OF_LIGHT_MPS;
        assert_eq!(distance_guard_bins(100.0, v, 102.4e6), 24);
        assert_eq!(distance_guard_bins(0.0, v, 102.4e6), 0);
    }

    #[test]
    fn test_search_window() {
        assert_eq!(search_window(0, 5, 1024, None, 1e6), (5, 1024));
        assert_eq!(search_window(3, 5, 1024, Some(100e-6), 1e6), (8, 100));
        assert_eq!(search_window(0, 5, 1024, Some(1.0), 1e6), (5, 1024));
        let (start, stop) = search_window(0, 10, 1024, Some(4e-6), 1e6);
        assert!(stop <= start);
    }

    #[test]
    fn test_min_separation_floor() {
        assert_eq!(min_separation_bins(0.0, 1e6), 1);
        assert_eq!(min_separation_bins(2.4e-6, 1e6), 2);
        assert_eq!(min_separation_bins(2.6e-6, 1e6), 3);
    }

    #[test]
    fn test_candidates_respect_edges_and_direct() {
        let signal = impulse_train(32, &[(0, 1.0), (4, 0.5), (28, 0.5), (30, 0.5)]);
        // Guard of zero: the direct bin itself is still excluded
        assert_eq!(collect_candidates(&signal, 0, 32, 0.2, 0, 0), vec![4, 28, 30]);
        // Edge guard removes bins within 3 of the stop
        assert_eq!(collect_candidates(&signal, 0, 32, 0.2, 3, 0), vec![4, 28]);
        assert!(collect_candidates(&signal, 10, 10, 0.2, 0, 0).is_empty());
    }

    #[test]
    fn test_greedy_selection_suppresses_neighbors() {
        let signal = impulse_train(64, &[(10, 0.4), (12, 0.9), (30, 0.6), (50, 0.3)]);
        let candidates = vec![10, 12, 30, 50];

        assert_eq!(select_spaced_peaks(&signal, &candidates, 5, 10), vec![12, 30, 50]);
        assert_eq!(select_spaced_peaks(&signal, &candidates, 1, 2), vec![12, 30]);
        assert!(select_spaced_peaks(&signal, &candidates, 1, 0).is_empty());
    }

    #[test]
    fn test_detector_end_to_end() {
        let signal = impulse_train(256, &[(0, 1.0), (3, 0.9), (40, 0.5), (120, 0.3), (200, 0.05)]);
        let config = EchoSearchConfig {
            threshold_frac: 0.1,
            guard_bins: 5,
            max_peaks: 3,
            ..Default::default()
        };
        let detector = EchoPeakDetector::new(&config, 1e6, 2.6e8).unwrap();
        let selection = detector.detect(&signal, 0);

        assert_eq!(selection.bins, vec![40, 120]);
        assert_eq!(selection.guard_bins, 5);
        assert_eq!(selection.search_start, 5);
        assert_eq!(selection.search_stop, 256);
    }

    #[test]
    fn test_distance_guard_overrides_smaller_explicit_guard() {
        let config = EchoSearchConfig {
            guard_bins: 2,
            min_detect_distance_ft: Some(100.0),
            ..Default::default()
        };
        let v = 0.87 * crate::constants::SPEED_OF_LIGHT_MPS;
        let detector = EchoPeakDetector::new(&config, 102.4e6, v).unwrap();
        assert_eq!(detector.guard_bins(), 24);
    }
}
