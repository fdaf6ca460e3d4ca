pub mod config;
pub mod constants;
pub mod detector;
pub mod error;
pub mod output;
pub mod report;
pub mod signal_processing;
pub mod spectrum;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::{CableType, DetectorConfig, EchoSearchConfig, EchoscopeConfig};
pub use detector::EchoDetector;
pub use error::{EchoError, Result};
pub use report::{DetectionReport, DirectPath, EchoPath};
pub use spectrum::{ChannelEstimate, RawSpectrum};
