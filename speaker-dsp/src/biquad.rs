//! Biquad filter stage (Direct Form II Transposed)

use crate::coeffs::BiquadCoeffs;

/// Delay registers for one biquad on one channel
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BiquadState {
    pub z1: f32,
    pub z2: f32,
}

impl BiquadState {
    /// Run one sample through the filter
    #[inline]
    pub fn process(&mut self, c: &BiquadCoeffs, input: f32) -> f32 {
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    /// Drop stored energy
    #[inline]
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    #[inline]
    pub fn is_silent(&self) -> bool {
        self.z1 == 0.0 && self.z2 == 0.0
    }
}

/// Independent left/right states sharing one coefficient set
#[derive(Debug, Default, Clone, Copy)]
pub struct StereoBiquad {
    left: BiquadState,
    right: BiquadState,
}

impl StereoBiquad {
    #[inline]
    pub fn process(&mut self, c: &BiquadCoeffs, left: f32, right: f32) -> (f32, f32) {
        (self.left.process(c, left), self.right.process(c, right))
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    pub fn is_silent(&self) -> bool {
        self.left.is_silent() && self.right.is_silent()
    }
}
