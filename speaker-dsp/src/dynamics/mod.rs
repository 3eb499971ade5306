//! Dynamics processing - peak limiter and normalizer/DRC
//!
//! Both processors share the same detector: a stereo-linked peak envelope
//! follower that rises with the attack coefficient and falls with the
//! release coefficient.

mod limiter;
mod normalizer;

pub use limiter::Limiter;
pub use normalizer::Normalizer;

use crate::smoother::smoothing_coeff;

/// Peak envelope follower with separate attack and release
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self {
            attack_ms,
            release_ms,
            attack_coeff: smoothing_coeff(attack_ms, sample_rate),
            release_coeff: smoothing_coeff(release_ms, sample_rate),
            envelope: 0.0,
        }
    }

    /// Recompute time constants for a new sample rate
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.attack_coeff = smoothing_coeff(self.attack_ms, sample_rate);
        self.release_coeff = smoothing_coeff(self.release_ms, sample_rate);
    }

    /// Feed one detector sample and return the updated envelope
    #[inline]
    pub fn process(&mut self, peak: f32) -> f32 {
        let coeff = if peak > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope += coeff * (peak - self.envelope);
        self.envelope
    }

    #[inline]
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

/// Stereo-linked peak detector input
#[inline]
pub fn stereo_peak(left: f32, right: f32) -> f32 {
    left.abs().max(right.abs())
}

/// Clamp a frame to [-1, 1]; the flag reports whether anything was clipped
#[inline]
pub fn hard_clip(left: f32, right: f32) -> (f32, f32, bool) {
    if left.abs() > 1.0 || right.abs() > 1.0 {
        (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0), true)
    } else {
        (left, right, false)
    }
}
