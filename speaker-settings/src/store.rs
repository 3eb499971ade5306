//! Settings file persistence
//!
//! Stores the DSP state that survives a reboot in a small `key=value` file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use speaker_dsp::consts::VOLUME_MAX;
use speaker_dsp::{PersistedSettings, Preset};
use thiserror::Error;
use tracing::{debug, warn};

/// Layout version written to and expected in the file
pub const CONFIG_VERSION: u32 = 1;

/// Errors that can occur while loading or saving settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Settings file at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`SettingsStore::default_path`]
    pub fn at_default_path() -> Self {
        Self::new(Self::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("speaker")
            .join("settings.txt")
    }

    /// Load settings, falling back to defaults on any error
    pub fn load(&self) -> PersistedSettings {
        match Self::load_from(&self.path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Using default settings");
                PersistedSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &PersistedSettings) -> Result<(), SettingsError> {
        Self::save_to(&self.path, settings)
    }

    /// Load settings from a specific path
    ///
    /// A missing file or a file written by another layout version yields the
    /// defaults.
    pub fn load_from(path: &Path) -> Result<PersistedSettings, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(PersistedSettings::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content)
    }

    /// Save settings to a specific path
    pub fn save_to(path: &Path, settings: &PersistedSettings) -> Result<(), SettingsError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, Self::serialize(settings))?;
        Ok(())
    }

    /// Parse settings from simple key=value format
    fn parse(content: &str) -> Result<PersistedSettings, SettingsError> {
        let mut settings = PersistedSettings::default();
        let mut version = None;

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let lineno = index + 1;
            let Some((key, value)) = line.split_once('=') else {
                return Err(SettingsError::Parse {
                    line: lineno,
                    message: format!("expected key=value, got '{}'", line),
                });
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "config_version" => version = Some(parse_number(value, lineno)?),
                "preset" => {
                    let id = parse_number(value, lineno)?;
                    match u8::try_from(id).ok().and_then(Preset::from_id) {
                        Some(preset) => settings.preset_id = preset.id(),
                        None => warn!(id, "Stored preset out of range, using default"),
                    }
                }
                "loudness" => settings.loudness = parse_bool(value, lineno)?,
                "bass_boost" => settings.bass_boost = parse_bool(value, lineno)?,
                "normalizer" => settings.normalizer = parse_bool(value, lineno)?,
                "volume" => {
                    let volume = parse_number(value, lineno)?;
                    settings.volume_trim = volume.min(u32::from(VOLUME_MAX)) as u8;
                }
                _ => {} // Ignore unknown keys
            }
        }

        if version != Some(CONFIG_VERSION) {
            warn!(
                found = ?version,
                expected = CONFIG_VERSION,
                "Settings layout version mismatch, using defaults"
            );
            return Ok(PersistedSettings::default());
        }

        Ok(settings)
    }

    /// Serialize settings to simple key=value format
    fn serialize(settings: &PersistedSettings) -> String {
        let lines = [
            "# Speaker settings".to_string(),
            format!("config_version={}", CONFIG_VERSION),
            format!("preset={}", settings.preset_id),
            format!("loudness={}", u8::from(settings.loudness)),
            format!("bass_boost={}", u8::from(settings.bass_boost)),
            format!("normalizer={}", u8::from(settings.normalizer)),
            format!("volume={}", settings.volume_trim),
        ];
        let mut content = lines.join("\n");
        content.push('\n');
        content
    }
}

fn parse_number(value: &str, line: usize) -> Result<u32, SettingsError> {
    value.parse().map_err(|_| SettingsError::Parse {
        line,
        message: format!("invalid number '{}'", value),
    })
}

fn parse_bool(value: &str, line: usize) -> Result<bool, SettingsError> {
    match value {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(SettingsError::Parse {
            line,
            message: format!("invalid flag '{}'", value),
        }),
    }
}
