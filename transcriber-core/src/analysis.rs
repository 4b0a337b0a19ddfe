//! # Offline Analysis Module
//!
//! Runs the estimator/segmenter pipeline over a fully decoded audio
//! buffer: the buffer is sliced into fixed-size windows at a fixed hop,
//! each window is pitch-estimated, and the segmenter consumes the
//! resulting frame stream exactly as it would a live one.
//!
//! Also hosts the post-processing passes applied to a finished event
//! list: merging re-detections of the same note across small gaps, and
//! snapping durations to rhythmic values for downstream layout.

use crate::audio::FRAME_SIZE;
use crate::pitch::{self, PitchConfig};
use crate::segment::{NoteEvent, NoteSegmenter, SegmenterConfig};

/// Analysis hop in samples. Half a window, so adjacent windows overlap.
pub const HOP_SIZE: usize = 2048;

/// Window/hop geometry plus the estimator and segmenter thresholds for
/// one offline pass.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    pub pitch: PitchConfig,
    pub segmenter: SegmenterConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            frame_size: FRAME_SIZE,
            hop_size: HOP_SIZE,
            pitch: PitchConfig::default(),
            segmenter: SegmenterConfig::default(),
        }
    }
}

/// Transcribes a decoded mono buffer into note events.
///
/// Windows that do not fill a whole frame at the end of the buffer are
/// skipped; the segmenter is closed at the buffer's true end time so a
/// note sustained to the end is still emitted.
pub fn analyze_buffer(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Vec<NoteEvent> {
    if sample_rate == 0 || config.frame_size == 0 || config.hop_size == 0 {
        return Vec::new();
    }

    let mut segmenter = NoteSegmenter::new(config.segmenter);
    let mut windows = 0usize;
    let mut index = 0usize;

    while index + config.frame_size <= samples.len() {
        let elapsed = index as f32 / sample_rate as f32;
        let frame = &samples[index..index + config.frame_size];
        let frequency = pitch::detect_pitch(frame, sample_rate, &config.pitch);
        segmenter.process_frame(frequency, elapsed);
        windows += 1;
        index += config.hop_size;
    }

    segmenter.close_last_note(samples.len() as f32 / sample_rate as f32);

    let events = segmenter.into_events();
    eprintln!("[ANALYZE] {} windows scanned, {} notes", windows, events.len());
    events
}

/// Merges consecutive events of the same pitch separated by a gap
/// shorter than `max_gap` seconds into one longer event.
///
/// Frame-level analysis sometimes briefly loses a sustained note and
/// re-finds it; without this pass such a note shows up twice.
pub fn merge_repeated_notes(events: &[NoteEvent], max_gap: f32) -> Vec<NoteEvent> {
    let mut merged: Vec<NoteEvent> = Vec::with_capacity(events.len());

    for event in events {
        match merged.last_mut() {
            Some(last)
                if last.midi == event.midi
                    && event.onset - (last.onset + last.duration) < max_gap =>
            {
                last.duration = event.onset + event.duration - last.onset;
            }
            _ => merged.push(event.clone()),
        }
    }

    merged
}

/// Snaps event durations to rhythmic buckets for layout: quarter notes
/// above 0.6 s, eighths above 0.3 s, sixteenths otherwise.
pub fn quantize_durations(events: &mut [NoteEvent]) {
    for event in events {
        event.duration = if event.duration > 0.6 {
            1.0
        } else if event.duration > 0.3 {
            0.5
        } else {
            0.25
        };
    }
}
