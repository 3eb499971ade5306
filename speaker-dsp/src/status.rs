//! Status snapshot reported to the control collaborator

use crate::presets::Preset;

/// Engine flags, named semantically
///
/// The byte layout used on the wire lives only in [`StatusFlags::bits`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub limiter_active: bool,
    /// Sticky: set by the audio path, cleared when a status is read
    pub clipping_detected: bool,
    pub muted: bool,
    pub duck_active: bool,
    pub normalizer_active: bool,
    pub bypass_active: bool,
    pub bass_boost_active: bool,
}

impl StatusFlags {
    const LIMITER: u8 = 1 << 0;
    const CLIPPING: u8 = 1 << 1;
    // bit 2 reserved for thermal protection
    const MUTED: u8 = 1 << 3;
    const DUCK: u8 = 1 << 4;
    const NORMALIZER: u8 = 1 << 5;
    const BYPASS: u8 = 1 << 6;
    const BASS_BOOST: u8 = 1 << 7;

    /// Status byte as sent by the firmware
    pub fn bits(&self) -> u8 {
        [
            (self.limiter_active, Self::LIMITER),
            (self.clipping_detected, Self::CLIPPING),
            (self.muted, Self::MUTED),
            (self.duck_active, Self::DUCK),
            (self.normalizer_active, Self::NORMALIZER),
            (self.bypass_active, Self::BYPASS),
            (self.bass_boost_active, Self::BASS_BOOST),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, bit)| acc | bit)
    }
}

/// Snapshot returned by `GetStatus` and after every dispatched command
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DspStatus {
    pub preset: Preset,
    pub loudness: bool,
    pub flags: StatusFlags,
}

impl std::fmt::Display for DspStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "preset={} loudness={} flags=0x{:02x}",
            self.preset.name(),
            if self.loudness { "on" } else { "off" },
            self.flags.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_flags() {
        assert_eq!(StatusFlags::default().bits(), 0);
    }

    #[test]
    fn test_bit_positions() {
        let only = |f: fn(&mut StatusFlags)| {
            let mut flags = StatusFlags::default();
            f(&mut flags);
            flags.bits()
        };
        assert_eq!(only(|f| f.limiter_active = true), 0x01);
        assert_eq!(only(|f| f.clipping_detected = true), 0x02);
        assert_eq!(only(|f| f.muted = true), 0x08);
        assert_eq!(only(|f| f.duck_active = true), 0x10);
        assert_eq!(only(|f| f.normalizer_active = true), 0x20);
        assert_eq!(only(|f| f.bypass_active = true), 0x40);
        assert_eq!(only(|f| f.bass_boost_active = true), 0x80);
    }

    #[test]
    fn test_thermal_bit_stays_clear() {
        let all = StatusFlags {
            limiter_active: true,
            clipping_detected: true,
            muted: true,
            duck_active: true,
            normalizer_active: true,
            bypass_active: true,
            bass_boost_active: true,
        };
        assert_eq!(all.bits(), 0xfb);
    }

    #[test]
    fn test_display() {
        let status = DspStatus {
            preset: Preset::Night,
            loudness: true,
            flags: StatusFlags {
                muted: true,
                ..Default::default()
            },
        };
        assert_eq!(status.to_string(), "preset=NIGHT loudness=on flags=0x08");
    }
}
