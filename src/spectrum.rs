//! Frequency-domain input handling
//!
//! Channel estimates arrive in several shapes. [`RawSpectrum`] names each
//! shape explicitly and [`normalize`] collapses it into one complex vector,
//! coherently averaging snapshot matrices.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EchoError, Result};

/// Frequency-domain input before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawSpectrum {
    /// One complex value per subcarrier
    Complex(Vec<Complex64>),
    /// One (real, imaginary) pair per subcarrier, single snapshot
    Pairs(Vec<(f64, f64)>),
    /// M snapshots of N complex values each
    Snapshots(Vec<Vec<Complex64>>),
    /// Real-only values; always rejected as ambiguous
    Real(Vec<f64>),
}

impl RawSpectrum {
    /// Resolve a JSON document into a spectrum shape
    ///
    /// Accepted layouts:
    /// - `[{"re": .., "im": ..}, ...]` complex vector
    /// - `[[re, im], ...]` N×2 pairs
    /// - `[[[re, im], ...], ...]` M×N snapshot matrix
    /// - `[x, ...]` real vector (later rejected by [`normalize`])
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| EchoError::InvalidInputShape("expected a JSON array".into()))?;

        let Some(first) = items.first() else {
            return Err(EchoError::InvalidInputShape("empty spectrum".into()));
        };

        match first {
            Value::Number(_) => {
                let values = items
                    .iter()
                    .map(|v| {
                        v.as_f64().ok_or_else(|| {
                            EchoError::InvalidInputShape("mixed element types in real vector".into())
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(RawSpectrum::Real(values))
            }
            Value::Object(_) => items
                .iter()
                .map(complex_from_object)
                .collect::<Result<Vec<_>>>()
                .map(RawSpectrum::Complex),
            Value::Array(inner) => match inner.first() {
                Some(Value::Array(_)) => items
                    .iter()
                    .map(|row| {
                        row.as_array()
                            .ok_or_else(|| {
                                EchoError::InvalidInputShape("snapshot rows must be arrays".into())
                            })?
                            .iter()
                            .map(|pair| pair_from_value(pair).map(|(re, im)| Complex64::new(re, im)))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(RawSpectrum::Snapshots),
                _ => items
                    .iter()
                    .map(pair_from_value)
                    .collect::<Result<Vec<_>>>()
                    .map(RawSpectrum::Pairs),
            },
            _ => Err(EchoError::InvalidInputShape(
                "unsupported element type in spectrum".into(),
            )),
        }
    }
}

fn complex_from_object(value: &Value) -> Result<Complex64> {
    let re = value.get("re").and_then(Value::as_f64);
    let im = value.get("im").and_then(Value::as_f64);
    match (re, im) {
        (Some(re), Some(im)) => Ok(Complex64::new(re, im)),
        _ => Err(EchoError::InvalidInputShape(
            "complex elements need numeric 're' and 'im' fields".into(),
        )),
    }
}

fn pair_from_value(value: &Value) -> Result<(f64, f64)> {
    match value.as_array().map(Vec::as_slice) {
        Some([re, im]) => match (re.as_f64(), im.as_f64()) {
            (Some(re), Some(im)) => Ok((re, im)),
            _ => Err(EchoError::InvalidInputShape("pair elements must be numeric".into())),
        },
        Some(row) => Err(EchoError::InvalidInputShape(format!(
            "expected [re, im] pairs, found a row of width {}",
            row.len()
        ))),
        None => Err(EchoError::InvalidInputShape("expected [re, im] pairs".into())),
    }
}

/// Collapse any accepted input shape into one complex vector
///
/// Returns the vector and the number of snapshots it was averaged from.
pub fn normalize(raw: RawSpectrum) -> Result<(Vec<Complex64>, usize)> {
    let (values, snapshots) = match raw {
        RawSpectrum::Complex(values) => (values, 1),
        RawSpectrum::Pairs(pairs) => (
            pairs
                .into_iter()
                .map(|(re, im)| Complex64::new(re, im))
                .collect(),
            1,
        ),
        RawSpectrum::Snapshots(rows) => {
            let m = rows.len();
            (coherent_average(&rows)?, m)
        }
        RawSpectrum::Real(values) => {
            return Err(EchoError::AmbiguousRealInput(format!(
                "{} real values without an imaginary channel; use [re, im] pairs",
                values.len()
            )));
        }
    };

    if values.is_empty() {
        return Err(EchoError::InvalidInputShape("no subcarriers".into()));
    }
    Ok((values, snapshots))
}

/// Element-wise mean across snapshots
fn coherent_average(rows: &[Vec<Complex64>]) -> Result<Vec<Complex64>> {
    let Some(first) = rows.first() else {
        return Err(EchoError::InvalidInputShape("snapshot dimension is empty".into()));
    };
    let n = first.len();
    if let Some(bad) = rows.iter().position(|row| row.len() != n) {
        return Err(EchoError::InvalidInputShape(format!(
            "snapshot {} has {} subcarriers, expected {}",
            bad,
            rows[bad].len(),
            n
        )));
    }

    let scale = 1.0 / rows.len() as f64;
    let mut mean = vec![Complex64::new(0.0, 0.0); n];
    for row in rows {
        for (acc, &value) in mean.iter_mut().zip(row) {
            *acc += value;
        }
    }
    for value in mean.iter_mut() {
        *value *= scale;
    }
    Ok(mean)
}

/// Normalized channel estimate for one OFDM channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEstimate {
    values: Vec<Complex64>,
    snapshot_count: usize,
    subcarrier_spacing_hz: f64,
}

impl ChannelEstimate {
    pub fn new(raw: RawSpectrum, subcarrier_spacing_hz: f64) -> Result<Self> {
        if !(subcarrier_spacing_hz.is_finite() && subcarrier_spacing_hz > 0.0) {
            return Err(EchoError::InvalidConfig(format!(
                "subcarrier spacing must be > 0, got {}",
                subcarrier_spacing_hz
            )));
        }
        let (values, snapshot_count) = normalize(raw)?;
        Ok(Self {
            values,
            snapshot_count,
            subcarrier_spacing_hz,
        })
    }

    pub fn from_complex(values: Vec<Complex64>, subcarrier_spacing_hz: f64) -> Result<Self> {
        Self::new(RawSpectrum::Complex(values), subcarrier_spacing_hz)
    }

    pub fn subcarrier_count(&self) -> usize {
        self.values.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshot_count
    }

    pub fn subcarrier_spacing_hz(&self) -> f64 {
        self.subcarrier_spacing_hz
    }

    pub fn values(&self) -> &[Complex64] {
        &self.values
    }
}

/// On-disk channel estimate document read by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEstimateFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<i32>,
    pub subcarrier_spacing_hz: f64,
    pub values: Value,
}

impl ChannelEstimateFile {
    pub fn into_estimate(self) -> Result<ChannelEstimate> {
        let raw = RawSpectrum::from_json(&self.values)?;
        ChannelEstimate::new(raw, self.subcarrier_spacing_hz)
    }
}
