// transcriber-core/src/lib.rs

//! Core logic for the audio-to-notes transcriber.
//! This crate is responsible for audio capture, pitch estimation,
//! note segmentation, and tablature mapping. It is completely
//! headless and contains no terminal or rendering code.

pub mod analysis;
pub mod audio;
pub mod pitch;
pub mod segment;
pub mod tab;
pub mod tuning;

/// Snapshot of a single live analysis frame, for front-end display.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// The detected fundamental for the frame, if any.
    pub frequency: Option<f32>,
    /// Name of the nearest reference note.
    pub note_name: Option<String>,
    /// Deviation from that reference note in cents.
    pub cents_deviation: Option<f32>,
    /// Stream time of the frame in seconds.
    pub elapsed: f32,
}

impl FrameSnapshot {
    /// Builds a display snapshot from one frame's pitch estimate.
    pub fn from_estimate(frequency: Option<f32>, elapsed: f32) -> Self {
        match frequency {
            Some(freq) => {
                let (note_name, target) = tuning::find_nearest_note(freq);
                FrameSnapshot {
                    frequency: Some(freq),
                    note_name: Some(note_name),
                    cents_deviation: Some(tuning::cents_deviation(freq, target)),
                    elapsed,
                }
            }
            None => FrameSnapshot {
                frequency: None,
                note_name: None,
                cents_deviation: None,
                elapsed,
            },
        }
    }
}
