//! One-pole parameter smoothing
//!
//! Every gain and every filter coefficient set the control path can change
//! glides toward its target once per frame:
//! `current += coeff * (target - current)`.
//! Coefficient sets are interpolated component-wise, not re-designed from
//! frequency/gain, which keeps the per-frame cost at five multiply-adds.

use crate::coeffs::BiquadCoeffs;

/// Distance below which a value snaps onto its target
const SNAP_EPSILON: f32 = 1e-6;

/// Smoothing factor for a time constant in milliseconds
///
/// `1 - exp(-1 / max(1, time * fs))`
pub fn smoothing_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let time_samples = ((time_ms / 1000.0) * sample_rate).max(1.0);
    1.0 - (-1.0 / time_samples).exp()
}

#[inline]
fn approach(current: f32, target: f32, coeff: f32) -> f32 {
    let next = current + coeff * (target - current);
    // f32 stalls short of the target once `coeff * delta` drops under half
    // an ulp, so a step that makes no progress also snaps.
    if next == current || (target - next).abs() < SNAP_EPSILON {
        target
    } else {
        next
    }
}

/// Smoothed scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
}

impl SmoothedValue {
    /// Start settled at `value`
    pub const fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Advance one frame and return the new current value
    #[inline]
    pub fn step(&mut self, coeff: f32) -> f32 {
        if self.current != self.target {
            self.current = approach(self.current, self.target, coeff);
        }
        self.current
    }

    /// Jump straight to the target
    pub fn snap(&mut self) {
        self.current = self.target;
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }
}

/// Smoothed biquad coefficient set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedCoeffs {
    current: BiquadCoeffs,
    target: BiquadCoeffs,
}

impl SmoothedCoeffs {
    pub const fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            current: coeffs,
            target: coeffs,
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: BiquadCoeffs) {
        self.target = target;
    }

    /// Advance one frame and return the coefficients to filter with
    #[inline]
    pub fn step(&mut self, coeff: f32) -> &BiquadCoeffs {
        if self.current != self.target {
            let c = &mut self.current;
            let t = &self.target;
            c.b0 = approach(c.b0, t.b0, coeff);
            c.b1 = approach(c.b1, t.b1, coeff);
            c.b2 = approach(c.b2, t.b2, coeff);
            c.a1 = approach(c.a1, t.a1, coeff);
            c.a2 = approach(c.a2, t.a2, coeff);
        }
        &self.current
    }

    pub fn snap(&mut self) {
        self.current = self.target;
    }

    #[inline]
    pub fn current(&self) -> &BiquadCoeffs {
        &self.current
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coeffs;

    #[test]
    fn test_coeff_formula() {
        let c = smoothing_coeff(30.0, 44_100.0);
        let expected = 1.0 - (-1.0f32 / 1323.0).exp();
        assert!((c - expected).abs() < 1e-7);

        // Time constants shorter than a sample clamp to one sample
        let fast = smoothing_coeff(0.001, 44_100.0);
        assert!((fast - (1.0 - (-1.0f32).exp())).abs() < 1e-6);
    }

    #[test]
    fn test_value_converges_without_overshoot() {
        let coeff = smoothing_coeff(30.0, 48_000.0);
        let mut v = SmoothedValue::new(1.0);
        v.set_target(0.0);

        // Ramps rather than jumps
        let first = v.step(coeff);
        assert!(first < 1.0 && first > 0.99);

        let mut prev = first;
        for _ in 0..(5 * 1440) {
            let now = v.step(coeff);
            assert!(now <= prev && now >= 0.0);
            prev = now;
        }
        assert!(v.current() < 0.01, "not converged after 5 tau: {}", v.current());
    }

    #[test]
    fn test_settled_value_never_moves() {
        let coeff = smoothing_coeff(30.0, 44_100.0);
        let mut v = SmoothedValue::new(0.0);
        v.set_target(0.5);
        for _ in 0..200_000 {
            v.step(coeff);
        }
        assert!(v.is_settled());
        assert_eq!(v.current(), 0.5);
        for _ in 0..100 {
            assert_eq!(v.step(coeff), 0.5);
        }
    }

    #[test]
    fn test_coeffs_interpolate_linearly() {
        let fs = 44_100.0;
        let from = coeffs::peaking(320.0, -1.0, 1.0, fs);
        let to = coeffs::peaking(420.0, -1.5, 1.0, fs);
        let mut s = SmoothedCoeffs::new(from);
        s.set_target(to);

        let coeff = 0.25;
        let c = *s.step(coeff);
        assert!((c.b0 - (from.b0 + 0.25 * (to.b0 - from.b0))).abs() < 1e-7);
        assert!((c.a2 - (from.a2 + 0.25 * (to.a2 - from.a2))).abs() < 1e-7);

        for _ in 0..1000 {
            s.step(coeff);
        }
        assert!(s.is_settled());
        assert_eq!(*s.current(), to);
    }

    #[test]
    fn test_snap() {
        let mut s = SmoothedCoeffs::new(BiquadCoeffs::BYPASS);
        s.set_target(coeffs::low_shelf(100.0, 8.0, 0.7, 48_000.0));
        s.snap();
        assert!(s.is_settled());
    }
}
