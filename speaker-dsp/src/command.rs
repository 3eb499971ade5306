//! Discrete control commands and settings-change events
//!
//! The dispatcher is what a BLE/console front end talks to. The engine itself
//! never knows about storage: persisted fields that actually changed are
//! announced as [`SettingsEvent`]s on an optional channel.

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

use crate::consts::VOLUME_MAX;
use crate::engine::DspController;
use crate::error::Result;
use crate::presets::Preset;
use crate::status::DspStatus;

/// State that survives a reboot
///
/// Audio duck and bypass are deliberately absent: they always come back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedSettings {
    pub preset_id: u8,
    pub loudness: bool,
    pub bass_boost: bool,
    pub normalizer: bool,
    pub volume_trim: u8,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            preset_id: Preset::default().id(),
            loudness: false,
            bass_boost: false,
            normalizer: false,
            volume_trim: VOLUME_MAX,
        }
    }
}

/// Commands from the control collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspCommand {
    SetPreset(u8),
    SetLoudness(bool),
    SetMute(bool),
    SetAudioDuck(bool),
    SetNormalizer(bool),
    SetVolumeTrim(u8),
    SetBypass(bool),
    SetBassBoost(bool),
    /// Codec renegotiation from the transport
    SetSampleRate(u32),
    GetStatus,
}

/// Events for the persistence collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEvent {
    Changed(PersistedSettings),
}

/// Applies commands to a controller and reports persisted changes
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    controller: DspController,
    settings_tx: Option<Sender<SettingsEvent>>,
}

impl CommandDispatcher {
    pub fn new(controller: DspController) -> Self {
        Self {
            controller,
            settings_tx: None,
        }
    }

    /// Announce persisted-field changes on `tx`
    pub fn with_settings_sender(mut self, tx: Sender<SettingsEvent>) -> Self {
        self.settings_tx = Some(tx);
        self
    }

    pub fn controller(&self) -> &DspController {
        &self.controller
    }

    /// Apply one command and return a fresh status snapshot
    pub fn dispatch(&self, cmd: DspCommand) -> Result<DspStatus> {
        let before = self.controller.settings();
        let ctl = &self.controller;

        match cmd {
            DspCommand::SetPreset(id) => ctl.set_preset(id)?,
            DspCommand::SetLoudness(on) => ctl.set_loudness(on)?,
            DspCommand::SetMute(on) => ctl.set_mute(on)?,
            DspCommand::SetAudioDuck(on) => ctl.set_audio_duck(on)?,
            DspCommand::SetNormalizer(on) => ctl.set_normalizer(on)?,
            DspCommand::SetVolumeTrim(trim) => ctl.set_volume_trim(trim)?,
            DspCommand::SetBypass(on) => ctl.set_bypass(on)?,
            DspCommand::SetBassBoost(on) => ctl.set_bass_boost(on)?,
            DspCommand::SetSampleRate(rate) => ctl.set_sample_rate(rate)?,
            DspCommand::GetStatus => {}
        }

        let after = self.controller.settings();
        if after != before {
            self.notify(after);
        }

        Ok(self.controller.status())
    }

    fn notify(&self, settings: PersistedSettings) {
        let Some(tx) = &self.settings_tx else {
            return;
        };
        match tx.try_send(SettingsEvent::Changed(settings)) {
            Ok(()) => debug!(?settings, "Settings change queued"),
            Err(TrySendError::Full(_)) => warn!("Settings queue full, change dropped"),
            Err(TrySendError::Disconnected(_)) => warn!("Settings receiver gone"),
        }
    }
}
