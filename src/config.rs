//! Configuration for the echo detection engine.
//!
//! Configuration is split in two:
//!
//! - [`DetectorConfig`] is fixed per channel and captured when an
//!   [`EchoDetector`](crate::detector::EchoDetector) is built.
//! - [`EchoSearchConfig`] holds the per-call search parameters. Every field
//!   has a default, and the whole struct is validated once at call time.
//!
//! Both can be loaded together from TOML:
//!
//! ```
//! use echoscope::config::{CableType, EchoscopeConfig, ThresholdMode};
//!
//! let config = EchoscopeConfig::from_toml_str(
//!     r#"
//!     [detector]
//!     cable_type = "RG59"
//!     channel_id = 33
//!
//!     [search]
//!     threshold_mode = "db_down"
//!     threshold_db_down = 25.0
//!     max_peaks = 3
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.detector.cable_type, CableType::Rg59);
//! assert_eq!(config.search.threshold_mode, ThresholdMode::DbDown);
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{INVALID_CHANNEL_ID, SPEED_OF_LIGHT_MPS};
use crate::error::{EchoError, Result};

/// Coaxial cable type used for the propagation model
///
/// Each label maps to a fixed velocity factor (fraction of the speed of light).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum CableType {
    #[default]
    #[value(name = "RG6", alias = "rg6")]
    Rg6,
    #[value(name = "RG59", alias = "rg59")]
    Rg59,
    #[value(name = "RG11", alias = "rg11")]
    Rg11,
}

impl CableType {
    pub const ALL: [CableType; 3] = [CableType::Rg6, CableType::Rg59, CableType::Rg11];

    pub fn label(&self) -> &'static str {
        match self {
            CableType::Rg6 => "RG6",
            CableType::Rg59 => "RG59",
            CableType::Rg11 => "RG11",
        }
    }

    /// Velocity factor as a fraction of the speed of light
    pub fn velocity_factor(&self) -> f64 {
        match self {
            CableType::Rg6 => 0.87,
            CableType::Rg59 => 0.82,
            CableType::Rg11 => 0.87,
        }
    }

    /// Signal propagation speed in this cable, meters per second
    pub fn propagation_speed_mps(&self) -> f64 {
        SPEED_OF_LIGHT_MPS * self.velocity_factor()
    }
}

impl fmt::Display for CableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CableType {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        CableType::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| EchoError::UnknownCableType(s.to_string()))
    }
}

impl Serialize for CableType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for CableType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Spectral window applied to the channel estimate before the inverse transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Hann taper, lowers sidelobes at the cost of a wider mainlobe
    #[default]
    Hann,
    /// Rectangular (identity)
    None,
}

impl FromStr for WindowMode {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" => Ok(WindowMode::Hann),
            "none" => Ok(WindowMode::None),
            other => Err(EchoError::InvalidWindow(format!(
                "unknown window '{}', expected 'hann' or 'none'",
                other
            ))),
        }
    }
}

/// How the echo threshold is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Fraction of the direct-path amplitude, in (0, 1]
    #[default]
    Fractional,
    /// Decibels below the direct path
    DbDown,
}

impl FromStr for ThresholdMode {
    type Err = EchoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fractional" => Ok(ThresholdMode::Fractional),
            "db_down" | "db-down" => Ok(ThresholdMode::DbDown),
            other => Err(EchoError::InvalidThreshold(format!(
                "unknown threshold mode '{}', expected 'fractional' or 'db_down'",
                other
            ))),
        }
    }
}

/// Per-channel configuration captured when a detector is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Transform length. When unset, the smallest power of two >= N, floored at 1024
    pub n_fft: Option<usize>,
    /// Cable type used for the propagation model
    pub cable_type: CableType,
    /// Caller-supplied channel identifier
    pub channel_id: i32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            n_fft: None,
            cable_type: CableType::default(),
            channel_id: INVALID_CHANNEL_ID,
        }
    }
}

/// Echo search parameters, validated once per detection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoSearchConfig {
    /// Spectral window applied before the inverse transform
    pub window: WindowMode,
    /// Threshold interpretation
    pub threshold_mode: ThresholdMode,
    /// Fraction of direct amplitude (fractional mode), must lie in (0, 1]
    pub threshold_frac: f64,
    /// dB below the direct path (db_down mode)
    pub threshold_db_down: f64,
    /// Explicit guard after the direct path, in bins
    pub guard_bins: usize,
    /// Minimum echo distance; converted to a guard via round-trip time
    pub min_detect_distance_ft: Option<f64>,
    /// Bins excluded just below the search stop
    pub edge_guard_bins: usize,
    /// Minimum spacing between accepted peaks in seconds
    pub min_separation_s: f64,
    /// Latest delay searched; unbounded when absent
    pub max_delay_s: Option<f64>,
    /// Maximum number of echoes reported
    pub max_peaks: usize,
    /// Circularly align the direct path to bin 0
    pub direct_at_zero: bool,
    /// Scale so the direct path has unit amplitude
    pub normalize_power: bool,
    /// Sample rate used for the time axis and distance math only
    pub sample_rate_override_hz: Option<f64>,
    /// Embed the time response in the report
    pub include_time_response: bool,
}

impl Default for EchoSearchConfig {
    fn default() -> Self {
        Self {
            window: WindowMode::Hann,
            threshold_mode: ThresholdMode::Fractional,
            threshold_frac: 0.2,
            threshold_db_down: 20.0,
            guard_bins: 8,
            min_detect_distance_ft: None,
            edge_guard_bins: 8,
            min_separation_s: 0.0,
            max_delay_s: None,
            max_peaks: 5,
            direct_at_zero: true,
            normalize_power: true,
            sample_rate_override_hz: None,
            include_time_response: false,
        }
    }
}

impl EchoSearchConfig {
    /// Check the non-threshold parameters
    ///
    /// Threshold parameters are checked when the threshold is resolved, so
    /// that db_down mode does not reject an unused `threshold_frac`.
    pub fn validate(&self) -> Result<()> {
        if !self.min_separation_s.is_finite() || self.min_separation_s < 0.0 {
            return Err(EchoError::InvalidConfig(format!(
                "min_separation_s must be >= 0, got {}",
                self.min_separation_s
            )));
        }
        if let Some(max_delay) = self.max_delay_s
            && !(max_delay.is_finite() && max_delay > 0.0)
        {
            return Err(EchoError::InvalidConfig(format!(
                "max_delay_s must be > 0, got {}",
                max_delay
            )));
        }
        if let Some(distance) = self.min_detect_distance_ft
            && !(distance.is_finite() && distance >= 0.0)
        {
            return Err(EchoError::InvalidConfig(format!(
                "min_detect_distance_ft must be >= 0, got {}",
                distance
            )));
        }
        if let Some(rate) = self.sample_rate_override_hz
            && !(rate.is_finite() && rate > 0.0)
        {
            return Err(EchoError::InvalidConfig(format!(
                "sample rate override must be > 0, got {}",
                rate
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoscopeConfig {
    pub detector: DetectorConfig,
    pub search: EchoSearchConfig,
}

impl EchoscopeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EchoError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EchoError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}
