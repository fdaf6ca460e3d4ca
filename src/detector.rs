use crate::config::{CableType, DetectorConfig, EchoSearchConfig};
use crate::constants::MIN_TRANSFORM_LENGTH;
use crate::error::{EchoError, Result};
use crate::report::{
    DatasetInfo, DetectionReport, EchoPath, PathEstimate, TimeResponseBlock, TimeSeriesBlock,
};
use crate::signal_processing::{EchoPeakDetector, TimeDomain, time_axis, time_response};
use crate::spectrum::ChannelEstimate;

/// Multi-echo detector for one channel estimate
///
/// Holds the channel estimate and the per-channel configuration. Every
/// operation is a pure function of those and its search parameters, so one
/// detector can be shared read-only across threads.
#[derive(Debug, Clone)]
pub struct EchoDetector {
    estimate: ChannelEstimate,
    n_fft: usize,
    sample_rate_hz: f64,
    cable_type: CableType,
    channel_id: i32,
}

/// Time response as used for detection and reporting
#[derive(Debug, Clone, PartialEq)]
pub struct TimeResponse {
    pub n_fft: usize,
    /// Seconds, spaced by 1 / reporting sample rate
    pub time_axis_s: Vec<f64>,
    pub magnitude: Vec<f64>,
    pub direct_index: usize,
}

/// Default transform length: next power of two >= N, floored at the minimum
pub fn default_transform_length(subcarriers: usize) -> usize {
    subcarriers.next_power_of_two().max(MIN_TRANSFORM_LENGTH)
}

impl EchoDetector {
    pub fn new(estimate: ChannelEstimate, config: &DetectorConfig) -> Result<Self> {
        let n_fft = match config.n_fft {
            Some(0) => {
                return Err(EchoError::InvalidConfig(
                    "transform length must be > 0".into(),
                ));
            }
            Some(n) => n,
            None => default_transform_length(estimate.subcarrier_count()),
        };
        let sample_rate_hz = n_fft as f64 * estimate.subcarrier_spacing_hz();

        log::debug!(
            "Echo detector for channel {}: N={}, M={}, n_fft={}, fs={:.3} MHz, cable {}",
            config.channel_id,
            estimate.subcarrier_count(),
            estimate.snapshot_count(),
            n_fft,
            sample_rate_hz / 1e6,
            config.cable_type
        );

        Ok(Self {
            estimate,
            n_fft,
            sample_rate_hz,
            cable_type: config.cable_type,
            channel_id: config.channel_id,
        })
    }

    pub fn estimate(&self) -> &ChannelEstimate {
        &self.estimate
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Detection sample rate, n_fft × subcarrier spacing
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn cable_type(&self) -> CableType {
        self.cable_type
    }

    pub fn propagation_speed_mps(&self) -> f64 {
        self.cable_type.propagation_speed_mps()
    }

    pub fn channel_id(&self) -> i32 {
        self.channel_id
    }

    fn reporting_sample_rate(&self, search: &EchoSearchConfig) -> f64 {
        search.sample_rate_override_hz.unwrap_or(self.sample_rate_hz)
    }

    fn transform(&self, search: &EchoSearchConfig) -> Result<TimeDomain> {
        search.validate()?;
        Ok(time_response::compute(
            self.estimate.values(),
            self.n_fft,
            search.window,
            search.direct_at_zero,
            search.normalize_power,
        ))
    }

    /// Magnitude time response with its time axis
    pub fn time_response(&self, search: &EchoSearchConfig) -> Result<TimeResponse> {
        let domain = self.transform(search)?;
        Ok(TimeResponse {
            n_fft: self.n_fft,
            time_axis_s: time_axis(self.n_fft, self.reporting_sample_rate(search)),
            magnitude: domain.magnitude,
            direct_index: domain.direct_index,
        })
    }

    /// Complex time series, rolled and normalized like the magnitude
    pub fn time_series(&self, search: &EchoSearchConfig) -> Result<TimeSeriesBlock> {
        let domain = self.transform(search)?;
        Ok(TimeSeriesBlock {
            n_fft: self.n_fft,
            time_axis_s: time_axis(self.n_fft, self.reporting_sample_rate(search)),
            real: domain.complex.iter().map(|c| c.re).collect(),
            imag: domain.complex.iter().map(|c| c.im).collect(),
            direct_index: domain.direct_index,
        })
    }

    /// Detect up to `max_peaks` echoes and assemble the full report
    ///
    /// Finding no echo is not an error; the report then has an empty list.
    pub fn multi_echo(&self, search: &EchoSearchConfig) -> Result<DetectionReport> {
        let domain = self.transform(search)?;
        let prop_speed = self.propagation_speed_mps();
        let detector = EchoPeakDetector::new(search, self.sample_rate_hz, prop_speed)?;
        let selection = detector.detect(&domain.magnitude, domain.direct_index);

        let axis = time_axis(self.n_fft, self.reporting_sample_rate(search));
        let direct_time = axis[domain.direct_index];
        let path_at = |bin: usize| {
            PathEstimate::new(bin, axis[bin], domain.magnitude[bin], direct_time, prop_speed)
        };

        let direct_path = path_at(domain.direct_index);
        let echoes: Vec<EchoPath> = selection.bins.iter().map(|&bin| path_at(bin)).collect();

        log::info!(
            "Channel {}: {} echo(es), direct at bin {}, threshold {:.3}, guard {} bins",
            self.channel_id,
            echoes.len(),
            domain.direct_index,
            selection.threshold_frac,
            selection.guard_bins
        );
        for echo in &echoes {
            log::debug!(
                "Echo at bin {}: amplitude {:.4}, {:.1} m ({:.1} ft)",
                echo.bin_index,
                echo.amplitude,
                echo.distance_m,
                echo.distance_ft
            );
        }

        let time_response = search.include_time_response.then(|| TimeResponseBlock {
            n_fft: self.n_fft,
            time_axis_s: axis.clone(),
            time_response: domain.magnitude.clone(),
        });

        Ok(DetectionReport {
            channel_id: self.channel_id,
            dataset: DatasetInfo {
                subcarriers: self.estimate.subcarrier_count(),
                snapshots: self.estimate.snapshot_count(),
                subcarrier_spacing_hz: self.estimate.subcarrier_spacing_hz(),
                sample_rate_hz: self.sample_rate_hz,
            },
            cable_type: self.cable_type,
            velocity_factor: self.cable_type.velocity_factor(),
            prop_speed_mps: prop_speed,
            direct_path,
            echoes,
            threshold_frac: selection.threshold_frac,
            guard_bins: selection.guard_bins,
            min_separation_s: search.min_separation_s,
            max_delay_s: search.max_delay_s,
            max_peaks: search.max_peaks,
            time_response,
        })
    }

    /// Strongest echo only
    ///
    /// Runs the full pipeline with `max_peaks = 1` and fails with
    /// [`EchoError::NoEchoFound`] when nothing crosses the threshold.
    pub fn first_echo(&self, search: &EchoSearchConfig) -> Result<EchoPath> {
        let single = EchoSearchConfig {
            max_peaks: 1,
            include_time_response: false,
            ..search.clone()
        };
        let report = self.multi_echo(&single)?;
        report.echoes.first().copied().ok_or(EchoError::NoEchoFound)
    }
}
