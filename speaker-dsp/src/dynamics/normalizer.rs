//! Normalizer / DRC
//!
//! Downward compressor above the threshold followed by a fixed makeup gain,
//! evening out quiet and loud program material.

use super::{stereo_peak, EnvelopeFollower};
use crate::coeffs::{db_to_linear, linear_to_db};
use crate::consts::{
    NORMALIZER_ATTACK_MS, NORMALIZER_MAKEUP_DB, NORMALIZER_RATIO, NORMALIZER_RELEASE_MS,
    NORMALIZER_THRESHOLD_DB,
};

#[derive(Debug, Clone)]
pub struct Normalizer {
    follower: EnvelopeFollower,
    threshold: f32,
    ratio: f32,
    makeup: f32,
    gain: f32,
}

impl Normalizer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::new(
                NORMALIZER_ATTACK_MS,
                NORMALIZER_RELEASE_MS,
                sample_rate,
            ),
            threshold: db_to_linear(NORMALIZER_THRESHOLD_DB),
            ratio: NORMALIZER_RATIO,
            makeup: db_to_linear(NORMALIZER_MAKEUP_DB),
            gain: 1.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.follower.set_sample_rate(sample_rate);
    }

    /// Linear makeup gain
    pub fn makeup(&self) -> f32 {
        self.makeup
    }

    /// Compression gain reduction in dB, excluding makeup
    pub fn gain_reduction_db(&self) -> f32 {
        linear_to_db(self.gain)
    }

    /// Update the detector with one frame and return the total gain
    /// (compression times makeup) to apply to it
    #[inline]
    pub fn process_gain(&mut self, left: f32, right: f32) -> f32 {
        let envelope = self.follower.process(stereo_peak(left, right));

        self.gain = if envelope > self.threshold {
            // 1 / (env/thr)^(1 - 1/ratio)
            (self.threshold / envelope).powf(1.0 - 1.0 / self.ratio)
        } else {
            1.0
        };

        self.gain * self.makeup
    }

    /// Process one stereo frame
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let gain = self.process_gain(left, right);
        (left * gain, right * gain)
    }

    pub fn reset(&mut self) {
        self.follower.reset();
        self.gain = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_applies_makeup_only() {
        let mut norm = Normalizer::new(48_000.0);
        // -30 dBFS stays under the -20 dB threshold
        let level = db_to_linear(-30.0);
        let mut gain = 0.0;
        for _ in 0..4800 {
            gain = norm.process_gain(level, level);
        }
        assert!((gain - norm.makeup()).abs() < 1e-6);
        assert_eq!(norm.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_four_to_one_above_threshold() {
        let mut norm = Normalizer::new(48_000.0);
        // 0 dBFS is 20 dB over threshold; 4:1 leaves 5 dB, i.e. 15 dB of reduction
        for _ in 0..48_000 {
            norm.process(1.0, 1.0);
        }
        let reduction = norm.gain_reduction_db();
        assert!((reduction + 15.0).abs() < 0.1, "reduction: {}", reduction);
    }

    #[test]
    fn test_makeup_is_six_db() {
        let norm = Normalizer::new(44_100.0);
        assert!((linear_to_db(norm.makeup()) - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_evens_out_levels() {
        let loud_in = 1.0;
        let quiet_in = db_to_linear(-12.0);

        let mut loud = Normalizer::new(48_000.0);
        let mut quiet = Normalizer::new(48_000.0);
        let (mut loud_out, mut quiet_out) = (0.0, 0.0);
        for _ in 0..48_000 {
            loud_out = loud.process(loud_in, loud_in).0;
            quiet_out = quiet.process(quiet_in, quiet_in).0;
        }

        let spread_in = linear_to_db(loud_in / quiet_in);
        let spread_out = linear_to_db(loud_out / quiet_out);
        assert!(spread_out < spread_in / 2.0);
    }

    #[test]
    fn test_reset() {
        let mut norm = Normalizer::new(48_000.0);
        for _ in 0..4800 {
            norm.process(1.0, 1.0);
        }
        assert!(norm.gain_reduction_db() < 0.0);
        norm.reset();
        assert_eq!(norm.gain_reduction_db(), 0.0);
    }
}
