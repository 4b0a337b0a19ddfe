//! # Note Segmentation Module
//!
//! Turns a frame-by-frame stream of pitch estimates into discrete note
//! events. Frame-level pitch detection flickers: vibrato shifts the
//! estimate by fractions of a semitone, a single pluck can re-trigger,
//! and transients produce one-frame spurious notes. The segmenter owns
//! the hysteresis, debounce, and stability-voting logic that turns that
//! jitter into one event per sounded note.
//!
//! ## Features
//! - Hysteresis: sub-semitone wobble around the active note is a
//!   continuation, not a new onset
//! - Debounce: a re-detection of the just-confirmed pitch within a
//!   short window is ignored outright
//! - Stability voting: a pitch change must persist for a configurable
//!   number of frames before it replaces the active note
//! - Minimum-duration floor: one-frame blips are discarded, never emitted

use serde::Serialize;

use crate::pitch::FrequencyBand;
use crate::tuning::{self, DetectedPitch, MidiRange};

/// How a detection is compared against the active note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteMatch {
    /// Same note when within this fractional-MIDI distance. 0.8
    /// absorbs vibrato and cents jitter.
    Tolerance(f32),
    /// Same note only on an exact rounded-MIDI match.
    Exact,
}

impl NoteMatch {
    fn matches(&self, detected: &DetectedPitch, active: &DetectedPitch) -> bool {
        match *self {
            NoteMatch::Tolerance(tolerance) => {
                (detected.midi_exact - active.midi_exact).abs() <= tolerance
            }
            NoteMatch::Exact => detected.midi == active.midi,
        }
    }
}

/// Tunable thresholds for the segmentation state machine.
///
/// Every constant that shapes segmentation behavior lives here, so the
/// stricter and looser variants are all reachable as configuration.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Frequencies outside this band count as "no detection".
    pub band: FrequencyBand,
    /// MIDI notes outside this range count as "no detection".
    pub midi_range: MidiRange,
    /// Consecutive frames a new pitch must persist before it replaces
    /// the active note. 1 means near-immediate switching.
    pub stability_threshold: u32,
    /// Window after a confirmation during which re-detections of the
    /// same MIDI note are ignored, in seconds.
    pub debounce_secs: f32,
    /// Notes closed with a duration at or below this floor are
    /// discarded as analysis artifacts, in seconds.
    pub min_note_duration: f32,
    /// Continuation test against the active note.
    pub same_note: NoteMatch,
    /// Maximum fractional-MIDI distance between a detection and the
    /// pending candidate for the detection to count as a stability vote.
    pub pending_tolerance: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            band: FrequencyBand::GUITAR,
            midi_range: MidiRange::PIANO,
            stability_threshold: 1,
            debounce_secs: 0.4,
            min_note_duration: 0.1,
            same_note: NoteMatch::Tolerance(0.8),
            pending_tolerance: 0.5,
        }
    }
}

/// A closed note in the output sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEvent {
    /// MIDI note number.
    pub midi: i32,
    /// Display name, e.g. "A4".
    pub name: String,
    /// Detected fundamental at onset, in Hz.
    pub frequency: f32,
    /// Time the note began sounding, in seconds from stream start.
    pub onset: f32,
    /// How long the note sounded, in seconds. Always exceeds the
    /// configured minimum duration.
    pub duration: f32,
}

/// Stateful stream processor: `(frequency, elapsed)` frames in, an
/// append-only list of [`NoteEvent`]s out.
///
/// One segmenter serves exactly one recording or analysis pass; call
/// [`NoteSegmenter::reset`] before reusing it for an unrelated stream.
/// Frames must arrive in order with monotonically advancing times, and
/// the caller must invoke [`NoteSegmenter::close_last_note`] with the
/// stream's true end time or the final note is silently lost.
#[derive(Debug)]
pub struct NoteSegmenter {
    config: SegmenterConfig,
    /// The note currently sounding, if any. Its `time` is the onset.
    active: Option<DetectedPitch>,
    /// Candidate for a pitch change, awaiting stability confirmation.
    /// Its `time` is the first frame the candidate was seen.
    pending: Option<DetectedPitch>,
    stability: u32,
    last_confirmed_midi: Option<i32>,
    last_confirmed_time: f32,
    events: Vec<NoteEvent>,
}

impl NoteSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        NoteSegmenter {
            config,
            active: None,
            pending: None,
            stability: 0,
            last_confirmed_midi: None,
            last_confirmed_time: 0.0,
            events: Vec::new(),
        }
    }

    /// Read-only snapshot of the closed notes, ordered by onset.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Consumes the segmenter and returns the closed notes.
    pub fn into_events(self) -> Vec<NoteEvent> {
        self.events
    }

    /// The note currently sounding, for live display.
    pub fn active_note(&self) -> Option<&DetectedPitch> {
        self.active.as_ref()
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Processes one analysis frame.
    ///
    /// `frequency` is the estimator's output for the frame (`None` for
    /// silence or no confident pitch), `elapsed` the stream time of the
    /// frame in seconds. Malformed frequencies (NaN, zero, out of band)
    /// are treated as "no detection"; this never fails.
    pub fn process_frame(&mut self, frequency: Option<f32>, elapsed: f32) {
        let Some(freq) = frequency.filter(|f| self.config.band.contains(*f)) else {
            self.close_last_note(elapsed);
            return;
        };

        let Some(detected) = tuning::frequency_to_note(freq, elapsed, self.config.midi_range)
        else {
            self.close_last_note(elapsed);
            return;
        };

        // Debounce guard: a single pluck re-triggered by analysis noise
        // would otherwise open two back-to-back notes of the same pitch.
        if self.last_confirmed_midi == Some(detected.midi)
            && elapsed - self.last_confirmed_time < self.config.debounce_secs
        {
            return;
        }

        let continues_active = self
            .active
            .as_ref()
            .is_some_and(|active| self.config.same_note.matches(&detected, active));

        if continues_active {
            // The note is still sounding; drop any half-formed candidate.
            self.stability = 0;
            self.pending = None;
            return;
        }

        // Stability voting for a pitch change.
        let votes_for_pending = self.pending.as_ref().is_some_and(|pending| {
            (detected.midi_exact - pending.midi_exact).abs() <= self.config.pending_tolerance
        });
        if votes_for_pending {
            self.stability += 1;
        } else {
            self.pending = Some(detected);
            self.stability = 1;
        }

        if self.stability >= self.config.stability_threshold {
            if let Some(candidate) = self.pending.take() {
                // The switch is backdated to the candidate's first
                // detection so the old note is not credited with frames
                // that already belonged to the new one.
                self.close_last_note(candidate.time);
                self.last_confirmed_midi = Some(candidate.midi);
                self.last_confirmed_time = elapsed;
                self.active = Some(candidate);
            }
            self.stability = 0;
        }
    }

    /// Closes the active note at `elapsed`, emitting it if it lasted
    /// longer than the minimum duration. Must be called at end of
    /// stream; also invoked internally on silence and pitch changes.
    pub fn close_last_note(&mut self, elapsed: f32) {
        if let Some(active) = self.active.take() {
            let duration = elapsed - active.time;
            if duration > self.config.min_note_duration {
                self.events.push(NoteEvent {
                    midi: active.midi,
                    name: active.full_name(),
                    frequency: active.frequency,
                    onset: active.time,
                    duration,
                });
            }
        }
    }

    /// Clears all state and the output sequence. Required between
    /// independent recordings.
    pub fn reset(&mut self) {
        self.active = None;
        self.pending = None;
        self.stability = 0;
        self.last_confirmed_midi = None;
        self.last_confirmed_time = 0.0;
        self.events.clear();
    }
}
