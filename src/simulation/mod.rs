mod channel;

pub use channel::{
    AdditiveNoiseConfig, Reflection, SyntheticChannel, add_complex_noise, reflection_response,
    signal_power,
};
