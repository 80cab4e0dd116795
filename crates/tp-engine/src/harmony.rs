//! Harmonic mapping: scale degrees, chord progressions, pitch.
//!
//! Everything here is referentially transparent. The groove's determinism
//! (given its control state and step counter) rests on that.

use rand::Rng;
use tp_ir::{Mood, Scale};

/// Semitone offsets within one octave for each scale.
pub fn scale_steps(scale: Scale) -> &'static [i32] {
    match scale {
        Scale::Pentatonic => &[0, 3, 5, 7, 10],
        Scale::Minor => &[0, 2, 3, 5, 7, 10],
        Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
        Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
    }
}

/// Four-chord progression (semitone offsets from the root) per mood.
pub fn mood_progression(mood: Mood) -> [i32; 4] {
    match mood {
        Mood::Calm => [0, 3, 5, 4],
        Mood::Playful => [0, 4, 5, 3],
        Mood::Tense => [0, 2, 1, 5],
        Mood::Driving => [0, 5, 3, 4],
    }
}

/// Map a scale degree above `root` to a note number.
///
/// Degrees wrap into higher (or, for negative degrees, lower) octaves.
/// Out-of-range inputs saturate at the `i32` limits.
pub fn degree_to_midi(root: i32, degree: i32, scale: Scale) -> i32 {
    let steps = scale_steps(scale);
    let len = steps.len() as i32;
    let octave = degree.div_euclid(len);
    let step = steps[degree.rem_euclid(len) as usize];
    root.saturating_add(octave.saturating_mul(12)).saturating_add(step)
}

/// Root of chord `chord_index` in the mood's progression.
pub fn chord_root(base_root: i32, chord_index: u64, mood: Mood) -> i32 {
    let offsets = mood_progression(mood);
    base_root.saturating_add(offsets[(chord_index % offsets.len() as u64) as usize])
}

/// Scale degree `degree` above the root of chord `chord_index`.
pub fn chord_tone(base_root: i32, chord_index: u64, degree: i32, mood: Mood, scale: Scale) -> i32 {
    degree_to_midi(chord_root(base_root, chord_index, mood), degree, scale)
}

/// Equal-tempered frequency in Hz (A4 = note 69 = 440 Hz).
///
/// Absurd note numbers overflow to infinity; voices treat that as a no-op.
pub fn midi_to_freq(note: i32) -> f32 {
    440.0 * libm::powf(2.0, (note as f32 - 69.0) / 12.0)
}

/// Keyboard row mapped positionally onto scale degrees.
pub const KEY_ROW: &str = "awsedftgyhujkolp";

/// Scale degree for a pressed key.
///
/// Keys on [`KEY_ROW`] map to `index mod 7`; anything else (or no key)
/// picks a degree in `0..5` from `rng`.
pub fn key_to_degree<R: Rng + ?Sized>(key: Option<char>, rng: &mut R) -> i32 {
    let index = key
        .map(|k| k.to_ascii_lowercase())
        .and_then(|k| KEY_ROW.chars().position(|c| c == k));
    match index {
        Some(i) => (i % 7) as i32,
        None => rng.random_range(0..5),
    }
}
