//! Compile-time tuning for the speaker DSP chain

/// Sample rates the A2DP sink negotiates
pub const SAMPLE_RATE_44100: u32 = 44_100;
pub const SAMPLE_RATE_48000: u32 = 48_000;
/// Lowest accepted rate; every compiled-in corner sits below its Nyquist
pub const MIN_SAMPLE_RATE: u32 = 22_050;

/// Number of preset EQ bands
pub const NUM_EQ_BANDS: usize = 4;
/// Number of loudness overlay bands
pub const NUM_LOUDNESS_BANDS: usize = 2;

/// Parameter smoothing time for gains and filter coefficients (ms)
pub const SMOOTHING_MS: f32 = 30.0;

/// Global headroom ahead of the EQ boosts (dB)
pub const PRE_GAIN_DB: f32 = -6.0;

/// Protection high-pass corner (Hz) and Butterworth Q
pub const HPF_FREQ_HZ: f32 = 95.0;
pub const HPF_Q: f32 = 0.707;

/// Peak limiter
pub const LIMITER_THRESHOLD_DB: f32 = -1.0;
pub const LIMITER_ATTACK_MS: f32 = 3.0;
pub const LIMITER_RELEASE_MS: f32 = 120.0;

/// Audio duck ("panic") attenuation (dB)
pub const AUDIO_DUCK_GAIN_DB: f32 = -12.0;

/// Normalizer / DRC
pub const NORMALIZER_THRESHOLD_DB: f32 = -20.0;
pub const NORMALIZER_RATIO: f32 = 4.0;
pub const NORMALIZER_ATTACK_MS: f32 = 7.0;
pub const NORMALIZER_RELEASE_MS: f32 = 150.0;
pub const NORMALIZER_MAKEUP_DB: f32 = 6.0;

/// Volume trim range (percent)
pub const VOLUME_MAX: u8 = 100;
/// Volume ceiling while the NIGHT preset is active
pub const NIGHT_VOLUME_CAP: u8 = 60;
/// Volume ceiling while the normalizer is engaged (offsets part of the makeup gain)
pub const NORMALIZER_VOLUME_CAP: u8 = 80;

/// Loudness blend below which the overlay filters are skipped
pub const LOUDNESS_SKIP_THRESHOLD: f32 = 0.001;
