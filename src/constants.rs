//! Physical and numeric constants for echo detection
//!
//! Values here feed the distance model and must stay stable across releases
//! so that distance estimates remain comparable with earlier reports.

/// Speed of light in vacuum, meters per second.
pub const SPEED_OF_LIGHT_MPS: f64 = 299_792_458.0;

/// International foot conversion factor.
pub const FEET_PER_METER: f64 = 3.280_839_895;

/// Floor applied to the automatically chosen transform length.
pub const MIN_TRANSFORM_LENGTH: usize = 1024;

/// Channel identifier used when the caller does not supply one.
pub const INVALID_CHANNEL_ID: i32 = -1;
