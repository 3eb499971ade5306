//! Biquad coefficient design
//!
//! Pure functions turning (frequency, gain, Q/slope, sample rate) into
//! normalized biquad coefficients using the RBJ Audio EQ Cookbook formulas.
//! Inputs are compile-time constants, so there is no error path: callers
//! guarantee `0 < freq < fs / 2` and `Q`/`S > 0`.

use std::f32::consts::PI;

/// Response shape of an EQ band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandType {
    LowShelf,
    Peaking,
    HighShelf,
}

/// One EQ band as compiled into the preset tables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBandSpec {
    /// Center/corner frequency (Hz)
    pub freq: f32,
    /// Gain (dB)
    pub gain_db: f32,
    /// Q for peaking, shelf slope S for shelves
    pub q_or_slope: f32,
    pub band_type: BandType,
}

impl EqBandSpec {
    pub const fn new(freq: f32, gain_db: f32, q_or_slope: f32, band_type: BandType) -> Self {
        Self {
            freq,
            gain_db,
            q_or_slope,
            band_type,
        }
    }
}

/// Normalized biquad coefficients (a0 = 1)
///
/// H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Unity pass-through
    pub const BYPASS: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Coefficients as an array in (b0, b1, b2, a1, a2) order
    #[inline]
    pub fn to_array(self) -> [f32; 5] {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
    }

    #[inline]
    pub fn from_array(c: [f32; 5]) -> Self {
        Self {
            b0: c[0],
            b1: c[1],
            b2: c[2],
            a1: c[3],
            a2: c[4],
        }
    }

    /// Magnitude response at `freq` (linear)
    pub fn magnitude_at(&self, freq: f32, fs: f32) -> f32 {
        let w = 2.0 * PI * freq / fs;
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::BYPASS
    }
}

/// Convert dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear > 1e-10 {
        20.0 * linear.log10()
    } else {
        -200.0
    }
}

/// Shelf alpha from slope S (cookbook)
#[inline]
fn shelf_alpha(sin_w0: f32, a: f32, slope: f32) -> f32 {
    sin_w0 / 2.0 * ((a + 1.0 / a) * (1.0 / slope - 1.0) + 2.0).sqrt()
}

/// Low shelf (RBJ cookbook)
pub fn low_shelf(freq: f32, gain_db: f32, slope: f32, fs: f32) -> BiquadCoeffs {
    let a = 10.0f32.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * freq / fs;
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = shelf_alpha(sin_w0, a, slope);
    let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

    let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;

    BiquadCoeffs {
        b0: (a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha)) / a0,
        b1: (2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
        b2: (a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha)) / a0,
        a1: (-2.0 * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
        a2: ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
    }
}

/// High shelf (RBJ cookbook)
pub fn high_shelf(freq: f32, gain_db: f32, slope: f32, fs: f32) -> BiquadCoeffs {
    let a = 10.0f32.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * freq / fs;
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = shelf_alpha(sin_w0, a, slope);
    let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

    let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;

    BiquadCoeffs {
        b0: (a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha)) / a0,
        b1: (-2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
        b2: (a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha)) / a0,
        a1: (2.0 * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
        a2: ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
    }
}

/// Peaking (bell) EQ (RBJ cookbook)
pub fn peaking(freq: f32, gain_db: f32, q: f32, fs: f32) -> BiquadCoeffs {
    let a = 10.0f32.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * freq / fs;
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = sin_w0 / (2.0 * q);

    let a0 = 1.0 + alpha / a;

    BiquadCoeffs {
        b0: (1.0 + alpha * a) / a0,
        b1: (-2.0 * cos_w0) / a0,
        b2: (1.0 - alpha * a) / a0,
        a1: (-2.0 * cos_w0) / a0,
        a2: (1.0 - alpha / a) / a0,
    }
}

/// 2nd-order high-pass (Butterworth at Q = 0.707)
pub fn high_pass(freq: f32, q: f32, fs: f32) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq / fs;
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = sin_w0 / (2.0 * q);

    let a0 = 1.0 + alpha;

    BiquadCoeffs {
        b0: ((1.0 + cos_w0) / 2.0) / a0,
        b1: (-(1.0 + cos_w0)) / a0,
        b2: ((1.0 + cos_w0) / 2.0) / a0,
        a1: (-2.0 * cos_w0) / a0,
        a2: (1.0 - alpha) / a0,
    }
}

/// Unity (pass-through) coefficients
#[inline]
pub fn bypass() -> BiquadCoeffs {
    BiquadCoeffs::BYPASS
}

/// Design one EQ band at sample rate `fs`
pub fn design(band: &EqBandSpec, fs: f32) -> BiquadCoeffs {
    match band.band_type {
        BandType::LowShelf => low_shelf(band.freq, band.gain_db, band.q_or_slope, fs),
        BandType::Peaking => peaking(band.freq, band.gain_db, band.q_or_slope, fs),
        BandType::HighShelf => high_shelf(band.freq, band.gain_db, band.q_or_slope, fs),
    }
}
