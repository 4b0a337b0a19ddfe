// transcriber-cli/src/main.rs

//! Command-line front end for the transcriber core.
//!
//! Two modes: live transcription from the default microphone, and
//! offline analysis of a WAV file. Either way the core produces the
//! note events; this crate only decodes input, drives the loop, and
//! prints or exports the result.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;

use transcriber_core::FrameSnapshot;
use transcriber_core::analysis::{self, AnalysisConfig};
use transcriber_core::audio::{self, CaptureConfig};
use transcriber_core::pitch::PitchConfig;
use transcriber_core::segment::{NoteEvent, NoteSegmenter, SegmenterConfig};
use transcriber_core::tab::{self, STANDARD_TUNING, TabPosition};
use transcriber_core::{pitch, tuning};

/// Cadence of the live loop; balances CPU load against onset latency.
const POLL_INTERVAL: Duration = Duration::from_millis(70);

/// Gap below which re-detections of the same note are merged.
const MERGE_GAP_SECS: f32 = 0.1;

#[derive(Parser)]
#[command(
    name = "transcriber",
    about = "Monophonic audio to note events and tablature",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe live input from the default microphone.
    Live {
        /// Stop after this many seconds.
        #[arg(long, default_value_t = 15.0)]
        seconds: f32,
        /// Print the events as JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Also print a tablature layout.
        #[arg(long)]
        tab: bool,
    },
    /// Transcribe a WAV file.
    File {
        /// Path to the WAV file.
        path: PathBuf,
        /// Print the events as JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Also print a tablature layout.
        #[arg(long)]
        tab: bool,
        /// Snap durations to rhythmic values.
        #[arg(long)]
        quantize: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Live { seconds, json, tab } => run_live(seconds, json, tab),
        Command::File {
            path,
            json,
            tab,
            quantize,
        } => run_file(&path, json, tab, quantize),
    }
}

/// Live mode: frames arrive over the capture channel and the loop
/// timestamps them against a wall clock, exactly one segmenter pass
/// per frame.
fn run_live(seconds: f32, as_json: bool, with_tab: bool) -> Result<()> {
    let (sender, receiver) = crossbeam_channel::bounded::<Vec<f32>>(8);
    let (stream, sample_rate) = audio::start_capture(sender, &CaptureConfig::default())?;

    let pitch_config = PitchConfig::default();
    let mut segmenter = NoteSegmenter::new(SegmenterConfig::default());
    let started = Instant::now();
    let mut shown: Option<String> = None;

    eprintln!("[LIVE] recording for {seconds:.0} s, play something...");

    loop {
        if started.elapsed().as_secs_f32() >= seconds {
            break;
        }

        let frame = match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let elapsed = started.elapsed().as_secs_f32();
        let frequency = pitch::detect_pitch(&frame, sample_rate, &pitch_config);
        segmenter.process_frame(frequency, elapsed);

        let snapshot = FrameSnapshot::from_estimate(frequency, elapsed);
        if snapshot.note_name != shown {
            if let (Some(name), Some(cents)) = (&snapshot.note_name, snapshot.cents_deviation) {
                eprintln!("[LIVE] {elapsed:5.1}s  {name}  ({cents:+.0} cents)");
            }
            shown = snapshot.note_name;
        }
    }

    drop(stream);
    segmenter.close_last_note(started.elapsed().as_secs_f32());

    let events = analysis::merge_repeated_notes(segmenter.events(), MERGE_GAP_SECS);
    report(&events, as_json, with_tab)
}

/// File mode: decode the whole WAV, then scan it in fixed windows.
fn run_file(path: &Path, as_json: bool, with_tab: bool, quantize: bool) -> Result<()> {
    let (samples, sample_rate) = read_wav_mono(path)?;
    eprintln!(
        "[FILE] {}: {:.2} s at {} Hz",
        path.display(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );

    let events = analysis::analyze_buffer(&samples, sample_rate, &AnalysisConfig::default());
    let mut events = analysis::merge_repeated_notes(&events, MERGE_GAP_SECS);
    if quantize {
        analysis::quantize_durations(&mut events);
    }

    report(&events, as_json, with_tab)
}

/// Decodes a WAV file to a mono f32 buffer in [-1, 1].
fn read_wav_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("{} declares no channels", path.display());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("failed to read float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("failed to read integer samples")?
        }
    };

    Ok((downmix(&interleaved, channels), spec.sample_rate))
}

/// Averages interleaved channels into a mono buffer.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn report(events: &[NoteEvent], as_json: bool, with_tab: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(events)?);
    } else if events.is_empty() {
        println!("No notes detected.");
    } else {
        println!("{} notes:", events.len());
        for event in events {
            println!(
                "  {:<4} midi {:3}  onset {:7.2}s  duration {:5.2}s  {:7.1} Hz",
                event.name, event.midi, event.onset, event.duration, event.frequency
            );
        }
    }

    if with_tab {
        print_tablature(&tab::generate_tablature(events, &STANDARD_TUNING));
    }

    Ok(())
}

fn print_tablature(positions: &[TabPosition]) {
    for position in positions {
        println!(
            "Position {} (from fret {}):",
            position.position, position.start_fret
        );
        for note in &position.notes {
            println!(
                "  string {}  fret {:2}  {}  ({} Hz nominal)",
                note.string,
                note.fret,
                note.name,
                tuning::midi_to_frequency(note.midi).round()
            );
        }
    }
}
