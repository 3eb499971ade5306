//! Speaker - host harness for the DSP engine
//!
//! Wires a PCM source (standing in for the A2DP sink) through the DSP engine
//! to the default output device, with a stdin console standing in for the
//! BLE control service and debounced settings persistence.

mod console;
mod source;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use speaker_dsp::{CommandDispatcher, DspCommand, DspController, DspEngine};
use speaker_settings::{SaveWorker, SettingsStore};

use console::ConsoleCommand;
use source::PcmSource;

/// Frames the transport hands to the engine per block
const BLOCK_FRAMES: usize = 256;

/// Transport → output ring capacity in frames (~85 ms at 48 kHz)
const RING_FRAMES: usize = 4096;

/// Default test tone frequency
const DEFAULT_TONE_HZ: f32 = 440.0;

struct Args {
    input: Option<PathBuf>,
    tone_hz: f32,
    settings: Option<PathBuf>,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = Args {
            input: None,
            tone_hz: DEFAULT_TONE_HZ,
            settings: None,
        };

        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--tone" => {
                    let value = iter.next().context("--tone needs a frequency")?;
                    args.tone_hz = value
                        .parse()
                        .with_context(|| format!("invalid tone frequency '{}'", value))?;
                }
                "--settings" => {
                    let value = iter.next().context("--settings needs a path")?;
                    args.settings = Some(PathBuf::from(value));
                }
                "-h" | "--help" => {
                    println!("usage: speaker [--tone HZ] [--settings PATH] [INPUT.raw]");
                    println!("INPUT.raw is interleaved stereo s16le at the device rate");
                    std::process::exit(0);
                }
                _ if arg.starts_with('-') => bail!("unknown option '{}'", arg),
                _ => args.input = Some(PathBuf::from(arg)),
            }
        }

        Ok(args)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse()?;

    // Settings
    let store = match args.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::at_default_path(),
    };
    let settings = store.load();
    info!(path = %store.path().display(), ?settings, "Settings loaded");

    // Audio device
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No audio output device found")?;
    let config = device
        .default_output_config()
        .context("Failed to get audio config")?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    info!(sample_rate, channels, "Output device ready");

    // Engine
    let engine = DspEngine::with_sample_rate(sample_rate)?;
    let controller = engine.controller();
    if let Err(e) = controller.apply_settings(&settings) {
        warn!("Stored settings rejected: {}", e);
    }

    // Persistence
    let (settings_tx, settings_rx) = bounded(64);
    let save_worker = SaveWorker::spawn(store, settings_rx);
    let dispatcher = CommandDispatcher::new(controller.clone()).with_settings_sender(settings_tx);

    // Source
    let source = match &args.input {
        Some(path) => PcmSource::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?,
        None => PcmSource::tone(args.tone_hz),
    };
    info!(source = %source.describe(), "Input ready");

    let shutdown = Arc::new(AtomicBool::new(false));

    // Transport thread: source → engine → ring
    let ring = HeapRb::<i16>::new(RING_FRAMES * 2);
    let (producer, mut consumer) = ring.split();
    let transport = spawn_named("transport", {
        let shutdown = shutdown.clone();
        move || run_transport(engine, source, producer, shutdown)
    })?;

    // Output stream: ring → device
    let mut scratch = vec![0i16; RING_FRAMES * 2];
    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                write_output(data, channels, &mut consumer, &mut scratch);
            },
            |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .context("Failed to create audio stream")?;
    stream.play().context("Failed to start audio")?;

    // Control thread: console commands → dispatcher
    let (cmd_tx, cmd_rx) = bounded(64);
    let control = spawn_named("control", {
        let shutdown = shutdown.clone();
        move || run_control(dispatcher, cmd_rx, shutdown)
    })?;

    println!("{}", console::HELP);
    let result = run_console(&cmd_tx, &controller);

    // Cleanup
    shutdown.store(true, Ordering::SeqCst);
    drop(cmd_tx);
    let _ = control.join();
    let _ = transport.join();
    drop(stream);
    save_worker.shutdown();

    result
}

fn spawn_named<F>(name: &str, f: F) -> anyhow::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .with_context(|| format!("Failed to spawn {} thread", name))
}

fn run_transport(
    mut engine: DspEngine,
    mut source: PcmSource,
    mut producer: HeapProd<i16>,
    shutdown: Arc<AtomicBool>,
) {
    let mut block = vec![0i16; BLOCK_FRAMES * 2];

    while !shutdown.load(Ordering::Relaxed) {
        if producer.vacant_len() < block.len() {
            thread::sleep(Duration::from_millis(2));
            continue;
        }

        let sample_rate = engine.control().sample_rate();
        if let Err(e) = source.fill(&mut block, sample_rate) {
            error!("Input read failed: {}", e);
            break;
        }
        engine.process(&mut block);
        producer.push_slice(&block);
    }
}

/// Output callback body: never blocks, never allocates
fn write_output(
    data: &mut [f32],
    channels: usize,
    consumer: &mut HeapCons<i16>,
    scratch: &mut [i16],
) {
    let channels = channels.max(1);
    let frames = data.len() / channels;
    let wanted = (frames * 2).min(scratch.len());
    let got = consumer.pop_slice(&mut scratch[..wanted]) / 2;

    for (i, frame) in data.chunks_exact_mut(channels).enumerate() {
        let (left, right) = if i < got {
            (
                f32::from(scratch[2 * i]) / 32768.0,
                f32::from(scratch[2 * i + 1]) / 32768.0,
            )
        } else {
            // Underrun
            (0.0, 0.0)
        };

        match frame {
            [mono] => *mono = (left + right) * 0.5,
            [l, r, rest @ ..] => {
                *l = left;
                *r = right;
                rest.fill(0.0);
            }
            [] => {}
        }
    }
}

fn run_control(
    dispatcher: CommandDispatcher,
    commands: Receiver<DspCommand>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match commands.recv_timeout(Duration::from_millis(50)) {
            Ok(cmd) => match dispatcher.dispatch(cmd) {
                Ok(status) => info!(?cmd, %status, "Command applied"),
                Err(e) => warn!(?cmd, "Command failed: {}", e),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_console(commands: &Sender<DspCommand>, controller: &DspController) -> anyhow::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read console input")?;
        if line.trim().is_empty() {
            continue;
        }

        let cmd = match console::parse_line(&line) {
            Some(ConsoleCommand::Quit) => break,
            Some(ConsoleCommand::Help) => {
                println!("{}", console::HELP);
                continue;
            }
            Some(ConsoleCommand::NextPreset) => {
                DspCommand::SetPreset(controller.preset().next().id())
            }
            Some(ConsoleCommand::Dsp(DspCommand::GetStatus)) => {
                print_status(controller);
                continue;
            }
            Some(ConsoleCommand::Dsp(cmd)) => cmd,
            None => {
                println!("unrecognized command, type 'help'");
                continue;
            }
        };

        if commands.send(cmd).is_err() {
            warn!("Control thread stopped");
            break;
        }
    }
    Ok(())
}

fn print_status(controller: &DspController) {
    let status = controller.status();
    println!("{}", status);
    println!(
        "  rate={} Hz volume={}% (trim {}%) limiter={:.1} dB normalizer={:.1} dB{}",
        controller.sample_rate(),
        controller.effective_volume(),
        controller.volume_trim(),
        controller.limiter_gain_reduction_db(),
        controller.normalizer_gain_reduction_db(),
        if status.flags.clipping_detected {
            " CLIPPED"
        } else {
            ""
        },
    );
}
