pub mod peak_detector;
pub mod time_response;

pub use peak_detector::{EchoPeakDetector, PeakSelection};
pub use time_response::{TimeDomain, hann_window, time_axis};
