//! PCM source standing in for the A2DP sink
//!
//! Produces interleaved stereo int16, either from a raw little-endian file
//! (looped) or from a generated test tone.

use std::f32::consts::TAU;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Test tone level (-6 dBFS)
const TONE_AMPLITUDE: f32 = 0.5;

pub enum PcmSource {
    /// Raw s16le interleaved stereo, restarted at EOF
    File {
        reader: BufReader<File>,
        bytes: Vec<u8>,
    },
    Tone {
        freq: f32,
        phase: f32,
    },
}

impl PcmSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() < 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "file holds less than one stereo frame",
            ));
        }
        Ok(Self::File {
            reader: BufReader::new(file),
            bytes: Vec::new(),
        })
    }

    pub fn tone(freq: f32) -> Self {
        Self::Tone { freq, phase: 0.0 }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File { .. } => "raw s16le file".to_string(),
            Self::Tone { freq, .. } => format!("{} Hz test tone", freq),
        }
    }

    /// Fill `block` (interleaved stereo) with the next samples
    pub fn fill(&mut self, block: &mut [i16], sample_rate: u32) -> io::Result<()> {
        match self {
            Self::File { reader, bytes } => {
                bytes.resize(block.len() * 2, 0);
                read_looping(reader, bytes)?;
                for (sample, le) in block.iter_mut().zip(bytes.chunks_exact(2)) {
                    *sample = i16::from_le_bytes([le[0], le[1]]);
                }
            }
            Self::Tone { freq, phase } => {
                let step = TAU * *freq / sample_rate.max(1) as f32;
                for frame in block.chunks_exact_mut(2) {
                    let s = (phase.sin() * TONE_AMPLITUDE * 32767.0) as i16;
                    frame[0] = s;
                    frame[1] = s;
                    *phase = (*phase + step) % TAU;
                }
            }
        }
        Ok(())
    }
}

/// Fill `buf` completely, rewinding at end of file
fn read_looping(reader: &mut BufReader<File>, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    let mut rewound = false;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 if rewound => {
                // Empty after a rewind; nothing left to loop
                buf[filled..].fill(0);
                return Ok(());
            }
            0 => {
                reader.seek(SeekFrom::Start(0))?;
                rewound = true;
            }
            n => {
                filled += n;
                rewound = false;
            }
        }
    }
    Ok(())
}
