//! # Tablature Module
//!
//! Maps note events onto guitar strings and frets. The assignment is a
//! greedy heuristic, not an optimal fingering solver: notes are placed
//! lowest-pitch first, each on the unoccupied string whose fret lands
//! closest to the middle of the neck, in groups of six notes per
//! rendered position.

use serde::Serialize;

use crate::segment::NoteEvent;

/// Open-string MIDI numbers for standard tuning, low E to high E.
pub const STANDARD_TUNING: [i32; 6] = [40, 45, 50, 55, 59, 64];

/// Highest fret considered by the assignment.
pub const MAX_FRET: i32 = 18;

/// Notes laid out per tablature position.
pub const NOTES_PER_POSITION: usize = 6;

// The greedy assignment gravitates toward mid-neck fingerings.
const PREFERRED_FRET: i32 = 7;

/// One note placed on the fretboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabNote {
    /// String number, 1 (lowest) to 6 (highest).
    pub string: u8,
    /// Fret number; 0 is the open string.
    pub fret: i32,
    pub midi: i32,
    pub name: String,
    /// Onset of the source note event, in seconds.
    pub time: f32,
}

/// A group of placed notes rendered together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabPosition {
    /// 1-based position index.
    pub position: usize,
    pub notes: Vec<TabNote>,
    /// Suggested fret to start rendering the position from.
    pub start_fret: i32,
}

/// Lays out a note event sequence as tablature positions.
///
/// Events are taken in order, six per position. Notes that cannot be
/// played in the given tuning within [`MAX_FRET`] are skipped.
pub fn generate_tablature(events: &[NoteEvent], tuning: &[i32]) -> Vec<TabPosition> {
    events
        .chunks(NOTES_PER_POSITION)
        .enumerate()
        .map(|(index, chunk)| {
            let notes = assign_frets(chunk, tuning);
            let start_fret = starting_fret(&notes);
            TabPosition {
                position: index + 1,
                notes,
                start_fret,
            }
        })
        .collect()
}

/// Greedy string/fret assignment for one position, lowest pitch first.
fn assign_frets(events: &[NoteEvent], tuning: &[i32]) -> Vec<TabNote> {
    let mut sorted: Vec<&NoteEvent> = events.iter().collect();
    sorted.sort_by_key(|event| event.midi);

    let mut assigned: Vec<TabNote> = Vec::with_capacity(sorted.len());

    for event in sorted {
        let mut best: Option<(usize, i32)> = None;
        let mut best_distance = i32::MAX;

        for (string_index, &open_note) in tuning.iter().enumerate() {
            let fret = event.midi - open_note;
            if fret < 0 || fret > MAX_FRET {
                continue;
            }

            let occupied = assigned
                .iter()
                .any(|tab| tab.fret == fret && tab.string == (string_index + 1) as u8);
            let distance = (fret - PREFERRED_FRET).abs();

            if !occupied && distance < best_distance {
                best = Some((string_index, fret));
                best_distance = distance;
            }
        }

        if let Some((string_index, fret)) = best {
            assigned.push(TabNote {
                string: (string_index + 1) as u8,
                fret,
                midi: event.midi,
                name: event.name.clone(),
                time: event.onset,
            });
        }
    }

    assigned
}

/// One fret below the lowest used fret, floored at 1.
fn starting_fret(notes: &[TabNote]) -> i32 {
    notes
        .iter()
        .map(|tab| tab.fret)
        .min()
        .map_or(1, |min_fret| (min_fret - 1).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::{midi_to_frequency, note_display_name};

    fn event(midi: i32, onset: f32) -> NoteEvent {
        NoteEvent {
            midi,
            name: note_display_name(midi),
            frequency: midi_to_frequency(midi),
            onset,
            duration: 0.5,
        }
    }

    #[test]
    fn open_low_e_lands_on_string_one() {
        let positions = generate_tablature(&[event(40, 0.0)], &STANDARD_TUNING);
        assert_eq!(positions.len(), 1);
        let note = &positions[0].notes[0];
        assert_eq!(note.string, 1);
        assert_eq!(note.fret, 0);
        assert_eq!(positions[0].start_fret, 1);
    }

    #[test]
    fn prefers_mid_neck_fingerings() {
        // E3 (52): fret 12 on the E string or fret 7 on the A string.
        let positions = generate_tablature(&[event(52, 0.0)], &STANDARD_TUNING);
        let note = &positions[0].notes[0];
        assert_eq!(note.string, 2);
        assert_eq!(note.fret, 7);

        // B3 (59): fret 9 on the D string beats fret 4 on the G string
        // only on distance; distance 2 < 3, so the D string wins.
        let positions = generate_tablature(&[event(59, 0.0)], &STANDARD_TUNING);
        let note = &positions[0].notes[0];
        assert_eq!(note.string, 3);
        assert_eq!(note.fret, 9);
    }

    #[test]
    fn repeated_note_moves_to_a_free_string() {
        let events = [event(52, 0.0), event(52, 0.5)];
        let positions = generate_tablature(&events, &STANDARD_TUNING);
        let notes = &positions[0].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].string, notes[0].fret), (2, 7));
        // The A-string spot is taken; the low E string at fret 12 is
        // the first remaining candidate at distance 5.
        assert_eq!((notes[1].string, notes[1].fret), (1, 12));
    }

    #[test]
    fn unplayable_notes_are_skipped() {
        let events = [event(30, 0.0), event(100, 0.5), event(45, 1.0)];
        let positions = generate_tablature(&events, &STANDARD_TUNING);
        let notes = &positions[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].midi, 45);
    }

    #[test]
    fn positions_hold_six_notes_each() {
        let events: Vec<NoteEvent> = (0..8).map(|i| event(45 + i, i as f32 * 0.5)).collect();
        let positions = generate_tablature(&events, &STANDARD_TUNING);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].notes.len(), 6);
        assert_eq!(positions[1].notes.len(), 2);
        assert_eq!(positions[0].position, 1);
        assert_eq!(positions[1].position, 2);
    }

    #[test]
    fn notes_within_a_position_sort_by_pitch() {
        let events = [event(64, 0.0), event(40, 0.5), event(52, 1.0)];
        let positions = generate_tablature(&events, &STANDARD_TUNING);
        let midis: Vec<i32> = positions[0].notes.iter().map(|n| n.midi).collect();
        assert_eq!(midis, vec![40, 52, 64]);
    }

    #[test]
    fn start_fret_sits_below_the_lowest_used_fret() {
        // A3 (57): fret 7 on the D string.
        let positions = generate_tablature(&[event(57, 0.0)], &STANDARD_TUNING);
        assert_eq!(positions[0].notes[0].fret, 7);
        assert_eq!(positions[0].start_fret, 6);
    }
}
