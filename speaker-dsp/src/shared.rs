//! State shared between the control path and the audio path
//!
//! The control path writes targets and flags; the audio path reads them once
//! per block and smooths toward them. Nothing here is ever locked by the
//! audio path. Scalars are plain atomics (a racing write is at worst one block
//! late); coefficient sets go through [`CoeffCell`] so a block never sees a
//! mix of old and new words.

use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU8, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::coeffs::BiquadCoeffs;
use crate::consts::{NUM_EQ_BANDS, NUM_LOUDNESS_BANDS, VOLUME_MAX};
use crate::presets::{self, Preset};

/// `f32` stored as its bit pattern in an `AtomicU32`
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Version-guarded (seqlock) cell holding one biquad coefficient set
///
/// Writers must be serialized externally. Readers never block: a read that
/// overlaps a write returns `None` and the caller keeps what it had.
#[derive(Debug)]
pub struct CoeffCell {
    version: AtomicU32,
    words: [AtomicU32; 5],
}

impl CoeffCell {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            version: AtomicU32::new(0),
            words: coeffs.to_array().map(|c| AtomicU32::new(c.to_bits())),
        }
    }

    /// Store a complete coefficient set
    pub fn publish(&self, coeffs: &BiquadCoeffs) {
        let v = self.version.load(Ordering::Relaxed);
        self.version.store(v.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        for (word, value) in self.words.iter().zip(coeffs.to_array()) {
            word.store(value.to_bits(), Ordering::Relaxed);
        }

        self.version.store(v.wrapping_add(2), Ordering::Release);
    }

    /// Read a consistent snapshot, or `None` if a write was in progress
    #[inline]
    pub fn read(&self) -> Option<BiquadCoeffs> {
        let before = self.version.load(Ordering::Acquire);
        if before & 1 != 0 {
            return None;
        }

        let words = [
            self.words[0].load(Ordering::Relaxed),
            self.words[1].load(Ordering::Relaxed),
            self.words[2].load(Ordering::Relaxed),
            self.words[3].load(Ordering::Relaxed),
            self.words[4].load(Ordering::Relaxed),
        ];

        fence(Ordering::Acquire);
        if self.version.load(Ordering::Relaxed) != before {
            return None;
        }

        Some(BiquadCoeffs::from_array(words.map(f32::from_bits)))
    }

    /// Number of completed writes times two (odd while a write is in flight)
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }
}

/// Targets, toggles and telemetry shared by [`crate::DspEngine`] and its
/// controllers
#[derive(Debug)]
pub struct SharedParams {
    pub(crate) initialized: AtomicBool,
    pub(crate) sample_rate: AtomicU32,
    /// Bumped after a sample-rate change has published its targets
    pub(crate) reset_epoch: AtomicU32,

    pub(crate) preset: AtomicU8,
    pub(crate) loudness: AtomicBool,
    pub(crate) mute: AtomicBool,
    pub(crate) audio_duck: AtomicBool,
    pub(crate) normalizer: AtomicBool,
    pub(crate) bypass: AtomicBool,
    pub(crate) bass_boost: AtomicBool,
    pub(crate) volume_trim: AtomicU8,
    pub(crate) effective_volume: AtomicU8,

    pub(crate) eq: [CoeffCell; NUM_EQ_BANDS],
    pub(crate) loudness_bands: [CoeffCell; NUM_LOUDNESS_BANDS],
    pub(crate) bass: CoeffCell,

    // Written by the audio path
    pub(crate) limiter_active: AtomicBool,
    pub(crate) clipping: AtomicBool,
    pub(crate) limiter_reduction_db: AtomicF32,
    pub(crate) normalizer_reduction_db: AtomicF32,

    writer: Mutex<()>,
}

impl SharedParams {
    /// Boot defaults: OFFICE, every toggle off, full volume, not initialized
    pub(crate) fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            sample_rate: AtomicU32::new(0),
            reset_epoch: AtomicU32::new(0),
            preset: AtomicU8::new(Preset::default().id()),
            loudness: AtomicBool::new(false),
            mute: AtomicBool::new(false),
            audio_duck: AtomicBool::new(false),
            normalizer: AtomicBool::new(false),
            bypass: AtomicBool::new(false),
            bass_boost: AtomicBool::new(false),
            volume_trim: AtomicU8::new(VOLUME_MAX),
            effective_volume: AtomicU8::new(VOLUME_MAX),
            eq: std::array::from_fn(|_| CoeffCell::new(BiquadCoeffs::BYPASS)),
            loudness_bands: std::array::from_fn(|_| CoeffCell::new(BiquadCoeffs::BYPASS)),
            bass: CoeffCell::new(BiquadCoeffs::BYPASS),
            limiter_active: AtomicBool::new(false),
            clipping: AtomicBool::new(false),
            limiter_reduction_db: AtomicF32::new(0.0),
            normalizer_reduction_db: AtomicF32::new(0.0),
            writer: Mutex::new(()),
        }
    }

    /// Serialize control-path writers. Never taken by the audio path.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock()
    }

    #[inline]
    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn reset_epoch(&self) -> u32 {
        self.reset_epoch.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn preset(&self) -> Preset {
        Preset::from_id(self.preset.load(Ordering::Relaxed)).unwrap_or_default()
    }

    #[inline]
    pub(crate) fn flag(flag: &AtomicBool) -> bool {
        flag.load(Ordering::Relaxed)
    }

    /// Publish EQ targets for `preset` at `fs`
    pub(crate) fn publish_eq(&self, preset: Preset, fs: f32) {
        for (cell, coeffs) in self.eq.iter().zip(presets::eq_targets(preset, fs)) {
            cell.publish(&coeffs);
        }
    }

    pub(crate) fn publish_bass(&self, enabled: bool, fs: f32) {
        self.bass.publish(&presets::bass_boost_target(enabled, fs));
    }

    /// Re-design every coefficient target for a new sample rate, then bump
    /// the reset epoch so the audio path resets at its next block
    pub(crate) fn reconfigure(&self, rate: u32) {
        let fs = rate as f32;
        self.sample_rate.store(rate, Ordering::Release);

        self.publish_eq(self.preset(), fs);
        for (cell, coeffs) in self.loudness_bands.iter().zip(presets::loudness_targets(fs)) {
            cell.publish(&coeffs);
        }
        self.publish_bass(Self::flag(&self.bass_boost), fs);

        self.reset_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Audio-path telemetry for the block just processed
    #[inline]
    pub(crate) fn report_block(
        &self,
        limiter_active: bool,
        clipped: bool,
        limiter_reduction_db: f32,
        normalizer_reduction_db: f32,
    ) {
        self.limiter_active.store(limiter_active, Ordering::Relaxed);
        if clipped {
            self.clipping.store(true, Ordering::Relaxed);
        }
        self.limiter_reduction_db.store(limiter_reduction_db);
        self.normalizer_reduction_db.store(normalizer_reduction_db);
    }

    /// Read and clear the sticky clipping flag
    pub(crate) fn take_clipping(&self) -> bool {
        self.clipping.swap(false, Ordering::Relaxed)
    }
}
