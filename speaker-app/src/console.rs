//! Line-based control console
//!
//! Stands in for the BLE control characteristic: each stdin line becomes one
//! DSP command.

use speaker_dsp::{DspCommand, Preset};

/// Commands the console understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Dsp(DspCommand),
    /// Cycle to the next preset
    NextPreset,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  preset <office|full|night|speech|0-3>   select EQ preset
  next                                    cycle to the next preset
  loudness|mute|duck|normalizer|bypass|bass <on|off>
  volume <0-100>                          volume trim in percent
  rate <hz>                               simulate codec renegotiation
  status                                  print engine status
  help | quit";

fn parse_switch(value: &str) -> Option<bool> {
    match value {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_preset(value: &str) -> Option<u8> {
    if let Ok(id) = value.parse::<u8>() {
        // Range is checked by the engine so a bad id is reported, not dropped
        return Some(id);
    }
    Preset::ALL
        .iter()
        .find(|p| p.name().eq_ignore_ascii_case(value))
        .map(|p| p.id())
}

/// Parse one console line
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next()?.to_ascii_lowercase();
    let arg = words.next().map(str::to_ascii_lowercase);
    if words.next().is_some() {
        return None;
    }

    let cmd = match (verb.as_str(), arg.as_deref()) {
        ("q" | "quit" | "exit", None) => return Some(ConsoleCommand::Quit),
        ("help" | "?", None) => return Some(ConsoleCommand::Help),
        ("next", None) => return Some(ConsoleCommand::NextPreset),
        ("status", None) => DspCommand::GetStatus,
        ("preset", Some(v)) => DspCommand::SetPreset(parse_preset(v)?),
        ("loudness", Some(v)) => DspCommand::SetLoudness(parse_switch(v)?),
        ("mute", Some(v)) => DspCommand::SetMute(parse_switch(v)?),
        ("duck", Some(v)) => DspCommand::SetAudioDuck(parse_switch(v)?),
        ("normalizer" | "drc", Some(v)) => DspCommand::SetNormalizer(parse_switch(v)?),
        ("bypass", Some(v)) => DspCommand::SetBypass(parse_switch(v)?),
        ("bass", Some(v)) => DspCommand::SetBassBoost(parse_switch(v)?),
        ("volume" | "vol", Some(v)) => DspCommand::SetVolumeTrim(v.parse::<u8>().ok()?),
        ("rate", Some(v)) => DspCommand::SetSampleRate(v.parse().ok()?),
        _ => return None,
    };
    Some(ConsoleCommand::Dsp(cmd))
}
