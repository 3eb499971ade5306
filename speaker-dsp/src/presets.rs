//! EQ preset tables, loudness overlay and bass boost shelf
//!
//! Bands are (freq Hz, gain dB, Q or slope, type). Selecting a preset only
//! designs new *target* coefficients; the chain glides into them.

use crate::coeffs::BandType::{HighShelf, LowShelf, Peaking};
use crate::coeffs::{self, BiquadCoeffs, EqBandSpec};
use crate::consts::{NIGHT_VOLUME_CAP, NUM_EQ_BANDS, NUM_LOUDNESS_BANDS, VOLUME_MAX};

/// Listening presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Preset {
    /// Office/background - mild EQ
    #[default]
    Office = 0,
    /// Full/rich - enhanced bass and treble
    Full = 1,
    /// Night/evening - balanced for low volume, capped output
    Night = 2,
    /// Speech/podcast - voice clarity
    Speech = 3,
}

const OFFICE_BANDS: [EqBandSpec; NUM_EQ_BANDS] = [
    EqBandSpec::new(160.0, 1.5, 0.7, LowShelf),
    EqBandSpec::new(320.0, -1.0, 1.0, Peaking),
    EqBandSpec::new(2800.0, -1.5, 1.0, Peaking),
    EqBandSpec::new(9000.0, 0.5, 0.7, HighShelf),
];

const FULL_BANDS: [EqBandSpec; NUM_EQ_BANDS] = [
    EqBandSpec::new(140.0, 4.0, 0.8, LowShelf),
    EqBandSpec::new(420.0, -1.5, 1.0, Peaking),
    EqBandSpec::new(3200.0, 0.7, 1.0, Peaking),
    EqBandSpec::new(9500.0, 1.5, 0.7, HighShelf),
];

const NIGHT_BANDS: [EqBandSpec; NUM_EQ_BANDS] = [
    EqBandSpec::new(160.0, 2.5, 0.8, LowShelf),
    EqBandSpec::new(350.0, -1.0, 1.0, Peaking),
    EqBandSpec::new(2500.0, 1.0, 1.0, Peaking),
    EqBandSpec::new(9000.0, 1.0, 0.7, HighShelf),
];

// Top band is a narrow peaking cut (de-ess region), not a shelf.
const SPEECH_BANDS: [EqBandSpec; NUM_EQ_BANDS] = [
    EqBandSpec::new(170.0, -2.0, 0.8, LowShelf),
    EqBandSpec::new(300.0, -1.0, 1.0, Peaking),
    EqBandSpec::new(3200.0, 3.0, 1.0, Peaking),
    EqBandSpec::new(7500.0, -1.0, 2.0, Peaking),
];

/// Loudness overlay (low-volume contour)
pub const LOUDNESS_BANDS: [EqBandSpec; NUM_LOUDNESS_BANDS] = [
    EqBandSpec::new(140.0, 2.5, 0.8, LowShelf),
    EqBandSpec::new(8500.0, 1.0, 0.7, HighShelf),
];

/// Bass boost shelf
pub const BASS_BOOST_BAND: EqBandSpec = EqBandSpec::new(100.0, 8.0, 0.7, LowShelf);

impl Preset {
    /// All presets in id order
    pub const ALL: [Preset; 4] = [Preset::Office, Preset::Full, Preset::Night, Preset::Speech];

    /// Look up a preset by wire id; `None` outside 0..=3
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Display name for the preset
    pub fn name(self) -> &'static str {
        match self {
            Preset::Office => "OFFICE",
            Preset::Full => "FULL",
            Preset::Night => "NIGHT",
            Preset::Speech => "SPEECH",
        }
    }

    /// Band table for the preset
    pub fn bands(self) -> &'static [EqBandSpec; NUM_EQ_BANDS] {
        match self {
            Preset::Office => &OFFICE_BANDS,
            Preset::Full => &FULL_BANDS,
            Preset::Night => &NIGHT_BANDS,
            Preset::Speech => &SPEECH_BANDS,
        }
    }

    /// Highest volume trim this preset lets through (percent)
    pub fn volume_cap(self) -> u8 {
        match self {
            Preset::Night => NIGHT_VOLUME_CAP,
            _ => VOLUME_MAX,
        }
    }

    /// Cycle to the next preset
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }
}

/// Name for a raw preset id ("UNKNOWN" when out of range)
pub fn preset_name(id: u8) -> &'static str {
    Preset::from_id(id).map(Preset::name).unwrap_or("UNKNOWN")
}

/// Target coefficients for the four preset EQ bands
pub fn eq_targets(preset: Preset, fs: f32) -> [BiquadCoeffs; NUM_EQ_BANDS] {
    preset.bands().map(|band| coeffs::design(&band, fs))
}

/// Target coefficients for the loudness overlay
pub fn loudness_targets(fs: f32) -> [BiquadCoeffs; NUM_LOUDNESS_BANDS] {
    LOUDNESS_BANDS.map(|band| coeffs::design(&band, fs))
}

/// Target coefficients for the bass boost band (unity when off)
pub fn bass_boost_target(enabled: bool, fs: f32) -> BiquadCoeffs {
    if enabled {
        coeffs::design(&BASS_BOOST_BAND, fs)
    } else {
        coeffs::bypass()
    }
}
