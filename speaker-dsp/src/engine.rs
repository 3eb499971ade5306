//! DSP engine - audio-side owner and control-side handle
//!
//! [`DspEngine`] owns the per-frame state and is driven by the audio callback
//! through `&mut self`. [`DspController`] is a cheap, cloneable handle for the
//! control path; it only writes targets and flags into the shared state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chain::GainStageChain;
use crate::command::PersistedSettings;
use crate::consts::{MIN_SAMPLE_RATE, NORMALIZER_VOLUME_CAP, SAMPLE_RATE_48000, VOLUME_MAX};
use crate::error::{DspError, Result};
use crate::presets::{self, Preset};
use crate::shared::SharedParams;
use crate::status::{DspStatus, StatusFlags};

/// Volume actually applied: the trim limited by the preset cap and, while the
/// normalizer is engaged, the normalizer cap
pub fn effective_volume(preset: Preset, normalizer: bool, trim: u8) -> u8 {
    let normalizer_cap = if normalizer {
        NORMALIZER_VOLUME_CAP
    } else {
        VOLUME_MAX
    };
    trim.min(VOLUME_MAX)
        .min(preset.volume_cap())
        .min(normalizer_cap)
}

/// Audio-side engine
///
/// Exactly one exists per stream. `process` must not be called from more than
/// one thread at a time, which `&mut self` enforces.
#[derive(Debug)]
pub struct DspEngine {
    control: DspController,
    chain: GainStageChain,
}

impl Default for DspEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DspEngine {
    /// Create an uninitialized engine. `process` is a no-op and every command
    /// fails with [`DspError::InvalidState`] until [`DspEngine::init`].
    pub fn new() -> Self {
        Self {
            control: DspController {
                shared: Arc::new(SharedParams::new()),
            },
            chain: GainStageChain::new(SAMPLE_RATE_48000 as f32),
        }
    }

    /// Create and initialize in one step
    pub fn with_sample_rate(sample_rate: u32) -> Result<Self> {
        let mut engine = Self::new();
        engine.init(sample_rate)?;
        Ok(engine)
    }

    /// Initialize at `sample_rate`. Targets keep their boot defaults (OFFICE,
    /// toggles off, full volume) or whatever was set before a re-init.
    pub fn init(&mut self, sample_rate: u32) -> Result<()> {
        check_sample_rate(sample_rate)?;

        {
            let shared = &self.control.shared;
            let _writer = shared.lock_writer();
            shared.reconfigure(sample_rate);
            shared.initialized.store(true, Ordering::Release);
        }
        self.chain.sync_targets(&self.control.shared);

        info!(sample_rate, "DSP initialized");
        Ok(())
    }

    /// Change the sample rate and reset all filter state before returning
    ///
    /// No-op when the rate is unchanged.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        self.control.set_sample_rate(sample_rate)?;
        self.chain.sync_targets(&self.control.shared);
        Ok(())
    }

    /// Owned handle for a control thread
    pub fn controller(&self) -> DspController {
        self.control.clone()
    }

    /// Borrow the control handle
    pub fn control(&self) -> &DspController {
        &self.control
    }

    pub fn is_initialized(&self) -> bool {
        self.control.is_initialized()
    }

    /// Process an interleaved int16 stereo buffer in place
    ///
    /// Before `init`, on an empty buffer, and for a trailing odd sample the
    /// samples are left untouched.
    pub fn process(&mut self, samples: &mut [i16]) {
        if samples.len() < 2 || !self.is_initialized() {
            return;
        }

        self.chain.sync_targets(&self.control.shared);
        for frame in samples.chunks_exact_mut(2) {
            let left = f32::from(frame[0]) / 32768.0;
            let right = f32::from(frame[1]) / 32768.0;

            let (left, right) = self.chain.process_frame(left, right);

            frame[0] = to_i16(left);
            frame[1] = to_i16(right);
        }
        self.report_block();
    }

    /// Process separate left/right float buffers in place
    ///
    /// Processes `min(left.len(), right.len())` frames.
    pub fn process_float(&mut self, left: &mut [f32], right: &mut [f32]) {
        if left.is_empty() || right.is_empty() || !self.is_initialized() {
            return;
        }

        self.chain.sync_targets(&self.control.shared);
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.chain.process_frame(*l, *r);
        }
        self.report_block();
    }

    #[inline]
    fn report_block(&mut self) {
        let clipped = self.chain.take_clipped();
        self.control.shared.report_block(
            self.chain.limiter().is_active(),
            clipped,
            self.chain.limiter().gain_reduction_db(),
            self.chain.normalizer().gain_reduction_db(),
        );
    }
}

/// Reject rates at which a compiled-in filter corner would reach Nyquist
fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if sample_rate < MIN_SAMPLE_RATE {
        warn!(sample_rate, "Rejected unsupported sample rate");
        return Err(DspError::InvalidArgument {
            name: "sample rate",
            value: sample_rate,
        });
    }
    Ok(())
}

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).clamp(-32768.0, 32767.0) as i16
}

/// Control-path handle
///
/// Setters only write targets and flags, so they never disturb the audio
/// path mid-block. Writers are serialized among themselves.
#[derive(Debug, Clone)]
pub struct DspController {
    shared: Arc<SharedParams>,
}

impl DspController {
    fn ensure_initialized(&self) -> Result<()> {
        if self.shared.is_initialized() {
            Ok(())
        } else {
            warn!("Command rejected: DSP not initialized");
            Err(DspError::InvalidState)
        }
    }

    fn set_toggle(&self, flag: &AtomicBool, value: bool, name: &'static str) -> Result<()> {
        self.ensure_initialized()?;
        let _writer = self.shared.lock_writer();
        swap_flag(flag, value, name);
        Ok(())
    }

    /// Recompute the applied volume after the trim or one of the caps
    /// changed. Caller holds the writer lock.
    fn refresh_volume(&self) {
        let shared = &self.shared;
        let volume = effective_volume(
            shared.preset(),
            SharedParams::flag(&shared.normalizer),
            shared.volume_trim.load(Ordering::Relaxed),
        );
        let previous = shared.effective_volume.swap(volume, Ordering::Relaxed);
        if previous != volume {
            debug!(from = previous, to = volume, "Effective volume changed");
        }
    }

    /// Change the sample rate. The audio path resets at its next block.
    pub fn set_sample_rate(&self, sample_rate: u32) -> Result<()> {
        self.ensure_initialized()?;
        check_sample_rate(sample_rate)?;

        let _writer = self.shared.lock_writer();
        if self.shared.sample_rate() == sample_rate {
            debug!(sample_rate, "Sample rate unchanged");
            return Ok(());
        }
        self.shared.reconfigure(sample_rate);
        info!(sample_rate, "Sample rate changed");
        Ok(())
    }

    /// Select a preset by id (0..=3)
    ///
    /// Only the EQ targets change; the audio path glides into them.
    pub fn set_preset(&self, id: u8) -> Result<()> {
        self.ensure_initialized()?;
        let Some(preset) = Preset::from_id(id) else {
            warn!(id, "Rejected unknown preset");
            return Err(DspError::InvalidArgument {
                name: "preset",
                value: u32::from(id),
            });
        };

        let _writer = self.shared.lock_writer();
        if self.shared.preset() == preset {
            debug!(preset = preset.name(), "Preset unchanged");
            return Ok(());
        }

        self.shared.preset.store(preset.id(), Ordering::Relaxed);
        self.shared
            .publish_eq(preset, self.shared.sample_rate() as f32);
        self.refresh_volume();
        info!(preset = preset.name(), "Preset selected");
        Ok(())
    }

    pub fn set_loudness(&self, enabled: bool) -> Result<()> {
        self.set_toggle(&self.shared.loudness, enabled, "loudness")
    }

    pub fn set_mute(&self, enabled: bool) -> Result<()> {
        self.set_toggle(&self.shared.mute, enabled, "mute")
    }

    pub fn set_audio_duck(&self, enabled: bool) -> Result<()> {
        self.set_toggle(&self.shared.audio_duck, enabled, "audio duck")
    }

    /// Toggle the normalizer; also refreshes the effective volume since the
    /// normalizer carries its own cap
    pub fn set_normalizer(&self, enabled: bool) -> Result<()> {
        self.ensure_initialized()?;
        let _writer = self.shared.lock_writer();
        if swap_flag(&self.shared.normalizer, enabled, "normalizer") {
            self.refresh_volume();
        }
        Ok(())
    }

    /// Safety bypass of the coloration stages (protection stays on)
    pub fn set_bypass(&self, enabled: bool) -> Result<()> {
        self.set_toggle(&self.shared.bypass, enabled, "bypass")
    }

    pub fn set_bass_boost(&self, enabled: bool) -> Result<()> {
        self.ensure_initialized()?;
        let _writer = self.shared.lock_writer();
        if swap_flag(&self.shared.bass_boost, enabled, "bass boost") {
            self.shared
                .publish_bass(enabled, self.shared.sample_rate() as f32);
        }
        Ok(())
    }

    /// Set the volume trim in percent; values above 100 are clamped
    pub fn set_volume_trim(&self, trim: u8) -> Result<()> {
        self.ensure_initialized()?;
        let trim = trim.min(VOLUME_MAX);

        let _writer = self.shared.lock_writer();
        if self.shared.volume_trim.swap(trim, Ordering::Relaxed) == trim {
            debug!(trim, "Volume trim unchanged");
            return Ok(());
        }
        self.refresh_volume();
        info!(trim, "Volume trim set");
        Ok(())
    }

    pub fn preset(&self) -> Preset {
        self.shared.preset()
    }

    pub fn loudness(&self) -> bool {
        SharedParams::flag(&self.shared.loudness)
    }

    pub fn muted(&self) -> bool {
        SharedParams::flag(&self.shared.mute)
    }

    pub fn audio_duck(&self) -> bool {
        SharedParams::flag(&self.shared.audio_duck)
    }

    pub fn normalizer(&self) -> bool {
        SharedParams::flag(&self.shared.normalizer)
    }

    pub fn bypass(&self) -> bool {
        SharedParams::flag(&self.shared.bypass)
    }

    pub fn bass_boost(&self) -> bool {
        SharedParams::flag(&self.shared.bass_boost)
    }

    pub fn volume_trim(&self) -> u8 {
        self.shared.volume_trim.load(Ordering::Relaxed)
    }

    pub fn effective_volume(&self) -> u8 {
        self.shared.effective_volume.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate()
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.is_initialized()
    }

    /// Limiter gain reduction of the last processed block (dB, 0 or below)
    pub fn limiter_gain_reduction_db(&self) -> f32 {
        self.shared.limiter_reduction_db.load()
    }

    /// Normalizer gain reduction of the last processed block (dB, 0 or below)
    pub fn normalizer_gain_reduction_db(&self) -> f32 {
        self.shared.normalizer_reduction_db.load()
    }

    /// Display name for a raw preset id
    pub fn preset_name(&self, id: u8) -> &'static str {
        presets::preset_name(id)
    }

    /// Status snapshot. Reading it clears the sticky clipping flag.
    pub fn status(&self) -> DspStatus {
        let shared = &self.shared;
        DspStatus {
            preset: shared.preset(),
            loudness: SharedParams::flag(&shared.loudness),
            flags: StatusFlags {
                limiter_active: SharedParams::flag(&shared.limiter_active),
                clipping_detected: shared.take_clipping(),
                muted: SharedParams::flag(&shared.mute),
                duck_active: SharedParams::flag(&shared.audio_duck),
                normalizer_active: SharedParams::flag(&shared.normalizer),
                bypass_active: SharedParams::flag(&shared.bypass),
                bass_boost_active: SharedParams::flag(&shared.bass_boost),
            },
        }
    }

    /// The subset of state that survives a reboot
    pub fn settings(&self) -> PersistedSettings {
        PersistedSettings {
            preset_id: self.preset().id(),
            loudness: self.loudness(),
            bass_boost: self.bass_boost(),
            normalizer: self.normalizer(),
            volume_trim: self.volume_trim(),
        }
    }

    /// Restore persisted state at boot
    pub fn apply_settings(&self, settings: &PersistedSettings) -> Result<()> {
        self.set_preset(settings.preset_id)?;
        self.set_loudness(settings.loudness)?;
        self.set_bass_boost(settings.bass_boost)?;
        self.set_normalizer(settings.normalizer)?;
        self.set_volume_trim(settings.volume_trim)?;
        info!(
            preset = presets::preset_name(settings.preset_id),
            loudness = settings.loudness,
            bass_boost = settings.bass_boost,
            normalizer = settings.normalizer,
            volume = settings.volume_trim,
            "Settings applied"
        );
        Ok(())
    }
}

/// Store `value` in `flag`; returns whether it changed
fn swap_flag(flag: &AtomicBool, value: bool, name: &'static str) -> bool {
    if flag.swap(value, Ordering::Relaxed) == value {
        debug!(setting = name, value, "Unchanged");
        false
    } else {
        info!(setting = name, value, "Toggled");
        true
    }
}
