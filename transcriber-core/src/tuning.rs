//! # Musical Tuning Module
//!
//! Equal temperament calculations for the transcription pipeline.
//! Maps detected frequencies onto MIDI note numbers (A4 = 440 Hz),
//! derives note names and octaves, and backs nearest-note lookups
//! with a precomputed piano-range note table.
//!
//! ## Features
//! - Frequency to MIDI note conversion with cents precision
//! - Configurable accepted MIDI ranges (full piano, guitar)
//! - Note name and octave derivation from MIDI numbers
//! - Nearest-note and cent deviation queries for live display

use once_cell::sync::Lazy;

/// Chromatic note names within one octave, rooted at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference pitch for equal temperament.
pub const A4_FREQUENCY: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI: i32 = 69;

/// Inclusive range of MIDI note numbers accepted by [`frequency_to_note`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiRange {
    pub min: i32,
    pub max: i32,
}

impl MidiRange {
    /// Full 88-key piano range, A0 to C8.
    pub const PIANO: MidiRange = MidiRange { min: 21, max: 108 };

    /// Practical range for standard-tuning guitar, E2 to C6.
    pub const GUITAR: MidiRange = MidiRange { min: 40, max: 84 };

    pub fn contains(&self, midi: i32) -> bool {
        midi >= self.min && midi <= self.max
    }
}

impl Default for MidiRange {
    fn default() -> Self {
        MidiRange::PIANO
    }
}

/// A single pitch detection mapped onto the equal-tempered scale.
///
/// Carries the fractional MIDI value alongside the rounded note number
/// so downstream consumers can compare pitches with sub-semitone
/// tolerance (vibrato, slightly bent strings) without losing the note
/// identity.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPitch {
    /// Fractional MIDI number, carrying cents precision.
    pub midi_exact: f32,
    /// Nearest MIDI note number.
    pub midi: i32,
    /// Name of the nearest note, without octave (e.g. "A", "F#").
    pub note_name: &'static str,
    /// Octave of the nearest note (A4 is octave 4).
    pub octave: i32,
    /// Source frequency in Hz.
    pub frequency: f32,
    /// Stream time at which the detection was made, in seconds.
    pub time: f32,
}

impl DetectedPitch {
    /// Full display name, e.g. "A4" or "F#3".
    pub fn full_name(&self) -> String {
        format!("{}{}", self.note_name, self.octave)
    }
}

/// Converts a frequency to the nearest equal-tempered note.
///
/// Returns `None` for non-positive or non-finite frequencies and for
/// notes outside `range`. The conversion is pure arithmetic:
/// `midi = 69 + 12 * log2(freq / 440)`, rounded to the nearest note.
///
/// # Arguments
/// * `frequency` - Input frequency in Hz
/// * `at_time` - Stream time of the detection, in seconds
/// * `range` - Accepted MIDI note range
pub fn frequency_to_note(frequency: f32, at_time: f32, range: MidiRange) -> Option<DetectedPitch> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return None;
    }

    let midi_exact = A4_MIDI as f32 + 12.0 * (frequency / A4_FREQUENCY).log2();
    let midi = midi_exact.round() as i32;

    if !range.contains(midi) {
        return None;
    }

    Some(DetectedPitch {
        midi_exact,
        midi,
        note_name: NOTE_NAMES[midi.rem_euclid(12) as usize],
        octave: midi.div_euclid(12) - 1,
        frequency,
        time: at_time,
    })
}

/// Equal-tempered frequency of a MIDI note number.
pub fn midi_to_frequency(midi: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((midi - A4_MIDI) as f32 / 12.0)
}

/// Display name for a MIDI note number, e.g. `69` -> "A4".
pub fn note_display_name(midi: i32) -> String {
    let index = midi - MidiRange::PIANO.min;
    if index >= 0 && (index as usize) < NOTES.len() {
        NOTES[index as usize].name.clone()
    } else {
        format!(
            "{}{}",
            NOTE_NAMES[midi.rem_euclid(12) as usize],
            midi.div_euclid(12) - 1
        )
    }
}

/// A reference note in the precomputed table.
#[derive(Debug, Clone)]
pub struct Note {
    pub midi: i32,
    pub name: String,
    pub frequency: f32,
}

/// Statically computed notes for the full piano range (A0 to C8).
///
/// Built once at startup; backs display-name lookups and nearest-note
/// queries so the per-frame paths never format strings.
static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    (MidiRange::PIANO.min..=MidiRange::PIANO.max)
        .map(|midi| Note {
            midi,
            name: format!(
                "{}{}",
                NOTE_NAMES[midi.rem_euclid(12) as usize],
                midi.div_euclid(12) - 1
            ),
            frequency: midi_to_frequency(midi),
        })
        .collect()
});

/// Finds the reference note closest in frequency to the input.
///
/// Used by the live monitor to show what the player is currently
/// sounding, independent of the segmentation state.
///
/// # Returns
/// * `(note_name, target_frequency)` - Closest note and its equal-tempered frequency
pub fn find_nearest_note(freq: f32) -> (String, f32) {
    let closest = NOTES
        .iter()
        .min_by(|a, b| {
            let diff_a = (a.frequency - freq).abs();
            let diff_b = (b.frequency - freq).abs();
            diff_a.partial_cmp(&diff_b).unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap(); // Safe: NOTES is never empty.

    (closest.name.clone(), closest.frequency)
}

/// Deviation of `freq` from `target_freq` in cents.
///
/// 100 cents is one semitone; positive values are sharp, negative flat.
pub fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_maps_to_midi_69() {
        let pitch = frequency_to_note(440.0, 0.0, MidiRange::PIANO).unwrap();
        assert_eq!(pitch.midi, 69);
        assert_eq!(pitch.note_name, "A");
        assert_eq!(pitch.octave, 4);
        assert!((pitch.midi_exact - 69.0).abs() < 1e-4);
    }

    #[test]
    fn well_known_notes_map_correctly() {
        // Middle C
        let c4 = frequency_to_note(261.63, 0.0, MidiRange::PIANO).unwrap();
        assert_eq!(c4.midi, 60);
        assert_eq!(c4.full_name(), "C4");

        // Low E string of a guitar
        let e2 = frequency_to_note(82.41, 0.0, MidiRange::PIANO).unwrap();
        assert_eq!(e2.midi, 40);
        assert_eq!(e2.full_name(), "E2");
    }

    #[test]
    fn out_of_range_frequencies_rejected() {
        // Below A0 and above C8
        assert!(frequency_to_note(10.0, 0.0, MidiRange::PIANO).is_none());
        assert!(frequency_to_note(8000.0, 0.0, MidiRange::PIANO).is_none());

        // C4 is inside the piano range but outside the guitar floor shifted up
        let narrow = MidiRange { min: 64, max: 84 };
        assert!(frequency_to_note(261.63, 0.0, narrow).is_none());
    }

    #[test]
    fn invalid_input_rejected() {
        assert!(frequency_to_note(0.0, 0.0, MidiRange::PIANO).is_none());
        assert!(frequency_to_note(-440.0, 0.0, MidiRange::PIANO).is_none());
        assert!(frequency_to_note(f32::NAN, 0.0, MidiRange::PIANO).is_none());
    }

    #[test]
    fn mapping_is_monotonic_in_log_frequency() {
        let mut last_midi = i32::MIN;
        let mut freq = 30.0f32;
        while freq < 5000.0 {
            if let Some(pitch) = frequency_to_note(freq, 0.0, MidiRange::PIANO) {
                assert!(
                    pitch.midi >= last_midi,
                    "midi decreased at {} Hz: {} -> {}",
                    freq,
                    last_midi,
                    pitch.midi
                );
                last_midi = pitch.midi;
            }
            freq *= 1.01;
        }
    }

    #[test]
    fn nearest_note_lookup() {
        let (name, target) = find_nearest_note(443.0);
        assert_eq!(name, "A4");
        assert!((target - 440.0).abs() < 0.01);
    }

    #[test]
    fn cents_deviation_signs() {
        assert!(cents_deviation(441.0, 440.0) > 0.0);
        assert!(cents_deviation(439.0, 440.0) < 0.0);
        // One semitone up is 100 cents
        let semitone = cents_deviation(midi_to_frequency(70), midi_to_frequency(69));
        assert!((semitone - 100.0).abs() < 0.01);
    }

    #[test]
    fn display_names_cover_table_and_fallback() {
        assert_eq!(note_display_name(69), "A4");
        assert_eq!(note_display_name(21), "A0");
        assert_eq!(note_display_name(108), "C8");
        // Outside the table, falls back to arithmetic naming
        assert_eq!(note_display_name(12), "C0");
    }
}
