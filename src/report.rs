//! Detection report types
//!
//! Field names here are consumed by report generators and API handlers and
//! must stay stable.

use serde::{Deserialize, Serialize};

use crate::config::CableType;
use crate::constants::FEET_PER_METER;

/// Dataset description carried in every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Subcarrier count N
    pub subcarriers: usize,
    /// Snapshot count M averaged into the estimate
    pub snapshots: usize,
    pub subcarrier_spacing_hz: f64,
    /// n_fft × subcarrier spacing
    pub sample_rate_hz: f64,
}

/// One detected signal path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathEstimate {
    /// Index into the time-response array
    pub bin_index: usize,
    /// Arrival time relative to index 0
    pub time_s: f64,
    /// Linear amplitude from the time response
    pub amplitude: f64,
    /// One-way distance from the direct path
    pub distance_m: f64,
    pub distance_ft: f64,
}

pub type DirectPath = PathEstimate;
pub type EchoPath = PathEstimate;

impl PathEstimate {
    /// Build a path from its bin and arrival time
    ///
    /// Distance is one-way: half the round-trip delay after `reference_time_s`.
    pub fn new(
        bin_index: usize,
        time_s: f64,
        amplitude: f64,
        reference_time_s: f64,
        propagation_speed_mps: f64,
    ) -> Self {
        let distance_m = 0.5 * propagation_speed_mps * (time_s - reference_time_s);
        Self {
            bin_index,
            time_s,
            amplitude,
            distance_m,
            distance_ft: distance_m * FEET_PER_METER,
        }
    }
}

/// Time response embedded for visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeResponseBlock {
    pub n_fft: usize,
    pub time_axis_s: Vec<f64>,
    pub time_response: Vec<f64>,
}

/// Complex time series (raw impulse response)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesBlock {
    pub n_fft: usize,
    pub time_axis_s: Vec<f64>,
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    /// Direct-path bin after any alignment
    pub direct_index: usize,
}

/// Full result of one multi-echo detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub channel_id: i32,
    pub dataset: DatasetInfo,
    pub cable_type: CableType,
    pub velocity_factor: f64,
    pub prop_speed_mps: f64,
    pub direct_path: DirectPath,
    /// Ascending by `bin_index`
    pub echoes: Vec<EchoPath>,
    /// Resolved fraction actually applied
    pub threshold_frac: f64,
    /// Effective guard after combining explicit and distance guards
    pub guard_bins: usize,
    pub min_separation_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_s: Option<f64>,
    pub max_peaks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_response: Option<TimeResponseBlock>,
}

impl DetectionReport {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Strongest echo, if any
    pub fn strongest_echo(&self) -> Option<&EchoPath> {
        self.echoes
            .iter()
            .max_by(|a, b| a.amplitude.total_cmp(&b.amplitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_report(max_delay_s: Option<f64>) -> DetectionReport {
        let v = CableType::Rg6.propagation_speed_mps();
        DetectionReport {
            channel_id: 193,
            dataset: DatasetInfo {
                subcarriers: 256,
                snapshots: 4,
                subcarrier_spacing_hz: 50e3,
                sample_rate_hz: 51.2e6,
            },
            cable_type: CableType::Rg6,
            velocity_factor: 0.87,
            prop_speed_mps: v,
            direct_path: PathEstimate::new(0, 0.0, 1.0, 0.0, v),
            echoes: vec![
                PathEstimate::new(40, 40.0 / 51.2e6, 0.5, 0.0, v),
                PathEstimate::new(120, 120.0 / 51.2e6, 0.3, 0.0, v),
            ],
            threshold_frac: 0.1,
            guard_bins: 5,
            min_separation_s: 0.0,
            max_delay_s,
            max_peaks: 3,
            time_response: None,
        }
    }

    #[test]
    fn test_path_distance_is_one_way() {
        let v = 2.0e8;
        let path = PathEstimate::new(10, 1e-6, 0.4, 0.0, v);
        assert_relative_eq!(path.distance_m, 100.0, epsilon = 1e-9);
        assert_relative_eq!(path.distance_ft, 328.0839895, epsilon = 1e-6);
    }

    #[test]
    fn test_path_distance_relative_to_reference() {
        let path = PathEstimate::new(30, 3e-6, 0.4, 1e-6, 2.0e8);
        assert_relative_eq!(path.distance_m, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_serialized_field_names() {
        let json: serde_json::Value = serde_json::to_value(sample_report(None)).unwrap();
        assert_eq!(json["channel_id"], 193);
        assert_eq!(json["dataset"]["subcarriers"], 256);
        assert_eq!(json["dataset"]["snapshots"], 4);
        assert_eq!(json["cable_type"], "RG6");
        assert_eq!(json["echoes"][1]["bin_index"], 120);
        assert!(json["direct_path"]["distance_ft"].is_number());
        assert!(json.get("max_delay_s").is_none());
        assert!(json.get("time_response").is_none());

        let json = serde_json::to_value(sample_report(Some(5e-6))).unwrap();
        assert_eq!(json["max_delay_s"], 5e-6);
    }

    #[test]
    fn test_report_deserializes() {
        let text = sample_report(Some(5e-6)).to_json_pretty().unwrap();
        let parsed: DetectionReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.echoes.len(), 2);
        assert_eq!(parsed.cable_type, CableType::Rg6);
    }

    #[test]
    fn test_strongest_echo() {
        let report = sample_report(None);
        assert_eq!(report.strongest_echo().unwrap().bin_index, 40);
    }
}
