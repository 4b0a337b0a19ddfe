//! # Audio Capture Module
//!
//! Real-time microphone capture via CPAL. Sets up a mono f32 input
//! stream and regroups the device's callback buffers into fixed-size
//! analysis frames, which stream to the caller over a channel.
//!
//! The capture layer owns no analysis state: frames leave through the
//! channel and the receiving side drives the estimator and segmenter
//! at its own cadence.

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, SupportedStreamConfigRange};
use crossbeam_channel::Sender;

/// Samples per analysis frame (~93 ms at 44.1 kHz).
///
/// Larger frames resolve lower fundamentals at the cost of onset
/// latency; this size comfortably covers the low E string.
pub const FRAME_SIZE: usize = 4096;

/// Capture parameters.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// Preferred sample rate; the nearest supported rate is used.
    pub target_sample_rate: u32,
    /// Samples per frame sent over the channel.
    pub frame_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            target_sample_rate: 44100,
            frame_size: FRAME_SIZE,
        }
    }
}

/// Starts capture from the default input device.
///
/// Device callback buffers are accumulated and re-chunked into
/// `frame_size` frames. Frames are sent with `try_send`: if the
/// receiver falls behind, frames are dropped rather than blocking the
/// audio callback.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - keep the stream alive while recording
/// * `Err(e)` - no usable input device or stream setup failure
pub fn start_capture(
    sender: Sender<Vec<f32>>,
    config: &CaptureConfig,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device available"))?;

    eprintln!("[AUDIO] input device: {}", device.name()?);

    let supported = device.supported_input_configs()?.collect::<Vec<_>>();
    let range = best_input_config(supported, config.target_sample_rate)
        .ok_or_else(|| anyhow!("no mono f32 input format available"))?;

    // Stay inside the device's supported range rather than insisting on
    // the exact target.
    let sample_rate = config
        .target_sample_rate
        .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    let stream_config: cpal::StreamConfig = range.with_sample_rate(SampleRate(sample_rate)).into();

    eprintln!("[AUDIO] sample rate: {} Hz", sample_rate);

    let frame_size = config.frame_size;
    let mut pending: Vec<f32> = Vec::with_capacity(frame_size * 2);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= frame_size {
                let frame = pending[..frame_size].to_vec();
                let _ = sender.try_send(frame);
                pending.drain(..frame_size);
            }
        },
        |err| eprintln!("[AUDIO] stream error: {err}"),
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the supported input range closest to the target rate among
/// mono f32 formats.
fn best_input_config(
    ranges: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    ranges
        .into_iter()
        .filter(|r| r.channels() == 1 && r.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|r| {
            let min_diff = (r.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (r.max_sample_rate().0 as i64 - target_rate as i64).abs();
            min_diff.min(max_diff)
        })
}
