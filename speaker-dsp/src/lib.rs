//! Real-time DSP engine for the speaker
//!
//! This crate provides the per-sample processing pipeline:
//! - Coeffs: RBJ cookbook biquad design (shelves, peaking, high-pass)
//! - Biquad: Direct Form II Transposed filter stage
//! - Smoother: click-free gain and coefficient ramps
//! - Presets: EQ tables, loudness overlay, bass boost
//! - Dynamics: peak limiter and normalizer/DRC
//! - Chain: per-frame gain staging with the safety bypass
//! - Engine: audio-side owner plus a cloneable control handle
//! - Command: discrete control commands and settings-change events

pub mod biquad;
pub mod chain;
pub mod coeffs;
pub mod command;
pub mod consts;
pub mod dynamics;
mod engine;
mod error;
pub mod presets;
pub mod shared;
pub mod smoother;
mod status;

pub use coeffs::{BandType, BiquadCoeffs, EqBandSpec};
pub use command::{CommandDispatcher, DspCommand, PersistedSettings, SettingsEvent};
pub use engine::{effective_volume, DspController, DspEngine};
pub use error::{DspError, Result};
pub use presets::{preset_name, Preset};
pub use status::{DspStatus, StatusFlags};
