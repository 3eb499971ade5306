//! Per-frame signal flow
//!
//! Pre-gain → [HPF → EQ → Loudness → Bass boost → Normalizer] → Limiter →
//! Volume → Duck → Mute
//!
//! The bracketed coloration stages are crossfaded against the dry
//! (pre-gained) signal by the bypass mix. The protection and gain stages after
//! them always run.

use crate::biquad::StereoBiquad;
use crate::coeffs::{self, db_to_linear, BiquadCoeffs};
use crate::consts::{
    AUDIO_DUCK_GAIN_DB, HPF_FREQ_HZ, HPF_Q, LOUDNESS_SKIP_THRESHOLD, NUM_EQ_BANDS,
    NUM_LOUDNESS_BANDS, PRE_GAIN_DB, SMOOTHING_MS, VOLUME_MAX,
};
use crate::dynamics::{hard_clip, Limiter, Normalizer};
use crate::shared::SharedParams;
use crate::smoother::{smoothing_coeff, SmoothedCoeffs, SmoothedValue};

#[inline]
fn on_off(flag: bool) -> f32 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Audio-path state: every "current" value, filter state and envelope
#[derive(Debug, Clone)]
pub struct GainStageChain {
    sample_rate: f32,
    smooth_coeff: f32,
    seen_epoch: u32,

    pre_gain: SmoothedValue,
    bypass_mix: SmoothedValue,
    loudness_blend: SmoothedValue,
    normalizer_mix: SmoothedValue,
    volume_gain: SmoothedValue,
    duck_gain: SmoothedValue,
    mute_gain: SmoothedValue,

    hpf: BiquadCoeffs,
    eq: [SmoothedCoeffs; NUM_EQ_BANDS],
    loudness: [SmoothedCoeffs; NUM_LOUDNESS_BANDS],
    bass: SmoothedCoeffs,

    hpf_state: StereoBiquad,
    eq_state: [StereoBiquad; NUM_EQ_BANDS],
    loudness_state: [StereoBiquad; NUM_LOUDNESS_BANDS],
    bass_state: StereoBiquad,

    limiter: Limiter,
    normalizer: Normalizer,

    coloration_live: bool,
    loudness_live: bool,
    bass_live: bool,
    normalizer_live: bool,
    clipped: bool,
}

impl GainStageChain {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            smooth_coeff: smoothing_coeff(SMOOTHING_MS, sample_rate),
            seen_epoch: 0,

            pre_gain: SmoothedValue::new(db_to_linear(PRE_GAIN_DB)),
            bypass_mix: SmoothedValue::new(0.0),
            loudness_blend: SmoothedValue::new(0.0),
            normalizer_mix: SmoothedValue::new(0.0),
            volume_gain: SmoothedValue::new(1.0),
            duck_gain: SmoothedValue::new(1.0),
            mute_gain: SmoothedValue::new(1.0),

            hpf: coeffs::high_pass(HPF_FREQ_HZ, HPF_Q, sample_rate),
            eq: [SmoothedCoeffs::new(BiquadCoeffs::BYPASS); NUM_EQ_BANDS],
            loudness: [SmoothedCoeffs::new(BiquadCoeffs::BYPASS); NUM_LOUDNESS_BANDS],
            bass: SmoothedCoeffs::new(BiquadCoeffs::BYPASS),

            hpf_state: StereoBiquad::default(),
            eq_state: [StereoBiquad::default(); NUM_EQ_BANDS],
            loudness_state: [StereoBiquad::default(); NUM_LOUDNESS_BANDS],
            bass_state: StereoBiquad::default(),

            limiter: Limiter::new(sample_rate),
            normalizer: Normalizer::new(sample_rate),

            coloration_live: true,
            loudness_live: false,
            bass_live: false,
            normalizer_live: false,
            clipped: false,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Whether any sample was hard-clipped since the last [`Self::take_clipped`]
    pub fn take_clipped(&mut self) -> bool {
        std::mem::take(&mut self.clipped)
    }

    /// Reconfigure for a new sample rate and drop every piece of stored
    /// energy (filter states and envelopes)
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.smooth_coeff = smoothing_coeff(SMOOTHING_MS, sample_rate);
        self.hpf = coeffs::high_pass(HPF_FREQ_HZ, HPF_Q, sample_rate);
        self.limiter.set_sample_rate(sample_rate);
        self.normalizer.set_sample_rate(sample_rate);

        self.hpf_state.reset();
        self.eq_state.iter_mut().for_each(StereoBiquad::reset);
        self.loudness_state.iter_mut().for_each(StereoBiquad::reset);
        self.bass_state.reset();
        self.limiter.reset();
        self.normalizer.reset();
    }

    /// Pull targets from the control path. Called once per block.
    ///
    /// Applies a pending sample-rate reset first; coefficient sets then snap
    /// to their new targets instead of gliding across rates.
    pub fn sync_targets(&mut self, shared: &SharedParams) {
        let epoch = shared.reset_epoch();
        let reset = epoch != self.seen_epoch;
        if reset {
            self.seen_epoch = epoch;
            self.reset(shared.sample_rate() as f32);
        }

        let duck = if SharedParams::flag(&shared.audio_duck) {
            db_to_linear(AUDIO_DUCK_GAIN_DB)
        } else {
            1.0
        };
        let volume = shared
            .effective_volume
            .load(std::sync::atomic::Ordering::Relaxed)
            .min(VOLUME_MAX);

        self.bypass_mix.set_target(on_off(SharedParams::flag(&shared.bypass)));
        self.loudness_blend.set_target(on_off(SharedParams::flag(&shared.loudness)));
        self.normalizer_mix.set_target(on_off(SharedParams::flag(&shared.normalizer)));
        self.mute_gain.set_target(on_off(!SharedParams::flag(&shared.mute)));
        self.duck_gain.set_target(duck);
        self.volume_gain.set_target(f32::from(volume) / f32::from(VOLUME_MAX));

        for (band, cell) in self.eq.iter_mut().zip(shared.eq.iter()) {
            if let Some(c) = cell.read() {
                band.set_target(c);
            }
        }
        for (band, cell) in self.loudness.iter_mut().zip(shared.loudness_bands.iter()) {
            if let Some(c) = cell.read() {
                band.set_target(c);
            }
        }
        if let Some(c) = shared.bass.read() {
            self.bass.set_target(c);
        }

        if reset {
            self.eq.iter_mut().for_each(SmoothedCoeffs::snap);
            self.loudness.iter_mut().for_each(SmoothedCoeffs::snap);
            self.bass.snap();
        }
    }

    /// Process one stereo frame
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let k = self.smooth_coeff;

        // 1. Pre-gain (headroom for the EQ boosts)
        let pre = self.pre_gain.step(k);
        let (dry_l, dry_r) = (left * pre, right * pre);

        // 2. Coloration, crossfaded against dry by the bypass mix
        let bypass = self.bypass_mix.step(k);
        let (l, r) = if bypass == 1.0 && self.bypass_mix.is_settled() {
            if self.coloration_live {
                self.silence_coloration();
            }
            (dry_l, dry_r)
        } else {
            self.coloration_live = true;
            let (wet_l, wet_r) = self.coloration(dry_l, dry_r);
            (
                wet_l + bypass * (dry_l - wet_l),
                wet_r + bypass * (dry_r - wet_r),
            )
        };

        // 3. Limiter, then the hard-clip safety net
        let (l, r) = self.limiter.process(l, r);
        let (l, r, clipped) = hard_clip(l, r);
        self.clipped |= clipped;

        // 4. Volume trim → duck → mute
        let gain = self.volume_gain.step(k) * self.duck_gain.step(k) * self.mute_gain.step(k);
        (l * gain, r * gain)
    }

    #[inline]
    fn coloration(&mut self, left: f32, right: f32) -> (f32, f32) {
        let k = self.smooth_coeff;

        // Protection high-pass
        let (mut l, mut r) = self.hpf_state.process(&self.hpf, left, right);

        // Preset EQ
        for (band, state) in self.eq.iter_mut().zip(self.eq_state.iter_mut()) {
            (l, r) = state.process(band.step(k), l, r);
        }

        // Loudness overlay
        let blend = self.loudness_blend.step(k);
        if blend > LOUDNESS_SKIP_THRESHOLD {
            self.loudness_live = true;
            let (mut wet_l, mut wet_r) = (l, r);
            for (band, state) in self.loudness.iter_mut().zip(self.loudness_state.iter_mut()) {
                (wet_l, wet_r) = state.process(band.step(k), wet_l, wet_r);
            }
            l += blend * (wet_l - l);
            r += blend * (wet_r - r);
        } else if self.loudness_live {
            self.loudness_live = false;
            self.loudness_state.iter_mut().for_each(StereoBiquad::reset);
        }

        // Bass boost; skipped once fully glided back to unity
        let bass = *self.bass.step(k);
        if bass != BiquadCoeffs::BYPASS || !self.bass.is_settled() {
            self.bass_live = true;
            (l, r) = self.bass_state.process(&bass, l, r);
        } else if self.bass_live {
            self.bass_live = false;
            self.bass_state.reset();
        }

        // Normalizer; gain crossfaded by its mix, idle once settled off
        let mix = self.normalizer_mix.step(k);
        if mix > 0.0 || !self.normalizer_mix.is_settled() {
            self.normalizer_live = true;
            let gain = self.normalizer.process_gain(l, r);
            let applied = 1.0 + mix * (gain - 1.0);
            l *= applied;
            r *= applied;
        } else if self.normalizer_live {
            self.normalizer_live = false;
            self.normalizer.reset();
        }

        (l, r)
    }

    fn silence_coloration(&mut self) {
        self.coloration_live = false;
        self.hpf_state.reset();
        self.eq_state.iter_mut().for_each(StereoBiquad::reset);
        self.loudness_state.iter_mut().for_each(StereoBiquad::reset);
        self.bass_state.reset();
        self.normalizer.reset();
        self.loudness_live = false;
        self.bass_live = false;
        self.normalizer_live = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::Preset;
    use std::sync::atomic::Ordering;

    fn shared_at(rate: u32) -> SharedParams {
        let shared = SharedParams::new();
        shared.reconfigure(rate);
        shared.initialized.store(true, Ordering::Release);
        shared
    }

    fn sine(i: usize, freq: f32, fs: f32, amp: f32) -> f32 {
        (2.0 * std::f32::consts::PI * freq * i as f32 / fs).sin() * amp
    }

    fn run(chain: &mut GainStageChain, frames: usize, amp: f32) -> f32 {
        let fs = chain.sample_rate();
        let mut peak = 0.0f32;
        for i in 0..frames {
            let x = sine(i, 1000.0, fs, amp);
            let (l, r) = chain.process_frame(x, x);
            peak = peak.max(l.abs()).max(r.abs());
        }
        peak
    }

    #[test]
    fn test_sync_applies_reset_epoch() {
        let shared = shared_at(44_100);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        assert_eq!(chain.sample_rate(), 44_100.0);
        // Coefficients snapped to the published preset
        assert_eq!(*chain.eq[0].current(), shared.eq[0].read().unwrap());
        assert!(chain.eq.iter().all(SmoothedCoeffs::is_settled));
    }

    #[test]
    fn test_silence_in_silence_out() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        for _ in 0..1024 {
            assert_eq!(chain.process_frame(0.0, 0.0), (0.0, 0.0));
        }
    }

    #[test]
    fn test_pre_gain_headroom_at_midband() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        // OFFICE at 1 kHz is close to flat; -6 dB pre-gain dominates
        let peak = run(&mut chain, 9600, 0.5);
        assert!((peak - 0.25).abs() < 0.04, "peak {}", peak);
    }

    #[test]
    fn test_preset_change_glides() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);

        shared.publish_eq(Preset::Full, 48_000.0);
        chain.sync_targets(&shared);
        assert!(!chain.eq[0].is_settled());

        chain.process_frame(0.1, 0.1);
        let target = shared.eq[0].read().unwrap();
        assert_ne!(*chain.eq[0].current(), target);

        for _ in 0..48_000 {
            chain.process_frame(0.0, 0.0);
        }
        assert_eq!(*chain.eq[0].current(), target);
    }

    #[test]
    fn test_full_bypass_skips_and_clears_coloration() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        run(&mut chain, 4800, 0.5);
        assert!(!chain.hpf_state.is_silent());

        shared.bypass.store(true, Ordering::Relaxed);
        chain.sync_targets(&shared);
        run(&mut chain, 48_000, 0.5);
        assert!(!chain.coloration_live);
        assert!(chain.hpf_state.is_silent());
        assert!(chain.eq_state.iter().all(StereoBiquad::is_silent));

        // Fully bypassed: pre-gained dry signal, untouched by filters
        let (l, _) = chain.process_frame(0.5, 0.5);
        assert!((l - 0.5 * db_to_linear(PRE_GAIN_DB)).abs() < 1e-6);
    }

    #[test]
    fn test_loudness_states_reset_after_fade_out() {
        let shared = shared_at(44_100);
        let mut chain = GainStageChain::new(44_100.0);
        shared.loudness.store(true, Ordering::Relaxed);
        chain.sync_targets(&shared);
        run(&mut chain, 4410, 0.5);
        assert!(chain.loudness_live);

        shared.loudness.store(false, Ordering::Relaxed);
        chain.sync_targets(&shared);
        run(&mut chain, 44_100, 0.5);
        assert!(!chain.loudness_live);
        assert!(chain.loudness_state.iter().all(StereoBiquad::is_silent));
    }

    #[test]
    fn test_normalizer_idle_when_off() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        run(&mut chain, 4800, 0.5);
        assert!(!chain.normalizer_live);
        assert_eq!(chain.normalizer().gain_reduction_db(), 0.0);

        shared.normalizer.store(true, Ordering::Relaxed);
        chain.sync_targets(&shared);
        run(&mut chain, 4800, 0.5);
        assert!(chain.normalizer_live);
        assert!(chain.normalizer().gain_reduction_db() < 0.0);
    }

    #[test]
    fn test_duck_attenuates_twelve_db() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        run(&mut chain, 9600, 0.5);
        let open = run(&mut chain, 9600, 0.5);

        shared.audio_duck.store(true, Ordering::Relaxed);
        chain.sync_targets(&shared);
        run(&mut chain, 48_000, 0.5);
        let ducked = run(&mut chain, 9600, 0.5);

        let ratio = ducked / open;
        assert!((ratio - db_to_linear(-12.0)).abs() < 0.01, "ratio {}", ratio);
    }

    #[test]
    fn test_volume_scales_output_linearly() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        run(&mut chain, 9600, 0.5);
        let full = run(&mut chain, 9600, 0.5);

        shared.effective_volume.store(50, Ordering::Relaxed);
        chain.sync_targets(&shared);
        run(&mut chain, 48_000, 0.5);
        let half = run(&mut chain, 9600, 0.5);

        let ratio = half / full;
        assert!((ratio - 0.5).abs() < 0.01, "ratio {}", ratio);
    }

    #[test]
    fn test_hard_clip_reports() {
        let shared = shared_at(48_000);
        let mut chain = GainStageChain::new(48_000.0);
        chain.sync_targets(&shared);
        // A single full-scale step overshoots before the limiter attacks
        chain.process_frame(10.0, 10.0);
        assert!(chain.take_clipped());
        assert!(!chain.take_clipped());
    }
}
