//! Peak limiter
//!
//! Always in the signal path. Gain is `threshold / envelope` whenever the
//! envelope sits above the threshold, otherwise unity.

use super::{stereo_peak, EnvelopeFollower};
use crate::coeffs::{db_to_linear, linear_to_db};
use crate::consts::{LIMITER_ATTACK_MS, LIMITER_RELEASE_MS, LIMITER_THRESHOLD_DB};

/// Stereo-linked peak limiter
#[derive(Debug, Clone)]
pub struct Limiter {
    follower: EnvelopeFollower,
    threshold: f32,
    gain: f32,
    active: bool,
}

impl Limiter {
    /// Create a limiter at the default -1 dBFS threshold
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::new(LIMITER_ATTACK_MS, LIMITER_RELEASE_MS, sample_rate),
            threshold: db_to_linear(LIMITER_THRESHOLD_DB),
            gain: 1.0,
            active: false,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.follower.set_sample_rate(sample_rate);
    }

    /// Linear threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether the last frame was gain-reduced
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current gain reduction in dB (0 or negative)
    pub fn gain_reduction_db(&self) -> f32 {
        linear_to_db(self.gain)
    }

    /// Process one stereo frame
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let envelope = self.follower.process(stereo_peak(left, right));

        if envelope > self.threshold {
            self.gain = (self.threshold / envelope).min(1.0);
            self.active = true;
        } else {
            self.gain = 1.0;
            self.active = false;
        }

        (left * self.gain, right * self.gain)
    }

    pub fn reset(&mut self) {
        self.follower.reset();
        self.gain = 1.0;
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_creation() {
        let limiter = Limiter::new(48_000.0);
        // -1.0 dBFS = ~0.891
        assert!(limiter.threshold() > 0.88 && limiter.threshold() < 0.90);
        assert!(!limiter.is_active());
    }

    #[test]
    fn test_soft_signal_passes_through() {
        let mut limiter = Limiter::new(48_000.0);
        for i in 0..4800 {
            let x = (i as f32 * 0.05).sin() * 0.5;
            let (l, r) = limiter.process(x, -x);
            assert_eq!(l, x);
            assert_eq!(r, -x);
        }
        assert!(!limiter.is_active());
        assert_eq!(limiter.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_loud_signal_settles_at_threshold() {
        let mut limiter = Limiter::new(48_000.0);
        let threshold = limiter.threshold();

        // 20 ms of a constant 2.0 level
        let mut out = 0.0;
        for _ in 0..960 {
            out = limiter.process(2.0, 2.0).0;
        }
        assert!(limiter.is_active());
        assert!((out - threshold).abs() < 0.01, "settled at {}", out);
        assert!(limiter.gain_reduction_db() < -6.0);
    }

    #[test]
    fn test_release_recovers_unity() {
        let mut limiter = Limiter::new(44_100.0);
        for _ in 0..2000 {
            limiter.process(1.5, 1.5);
        }
        assert!(limiter.is_active());

        // ~1s of quiet material lets the envelope fall below threshold
        for _ in 0..44_100 {
            limiter.process(0.1, 0.1);
        }
        assert!(!limiter.is_active());
        assert_eq!(limiter.process(0.1, 0.1), (0.1, 0.1));
    }

    #[test]
    fn test_stereo_linked_gain() {
        let mut limiter = Limiter::new(48_000.0);
        let mut frame = (0.0, 0.0);
        for _ in 0..960 {
            frame = limiter.process(2.0, 1.0);
        }
        // Right is reduced by the same gain as left
        assert!((frame.0 / frame.1 - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_reset() {
        let mut limiter = Limiter::new(48_000.0);
        for _ in 0..960 {
            limiter.process(2.0, 2.0);
        }
        limiter.reset();
        assert!(!limiter.is_active());
        assert_eq!(limiter.process(0.5, 0.5), (0.5, 0.5));
    }
}
