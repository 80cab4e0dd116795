//! Trigger requests: one note-like event aimed at a named instrument.

use arrayvec::ArrayString;
use core::fmt;

/// Maximum instrument name length in bytes.
pub const INSTRUMENT_NAME_LEN: usize = 16;

/// Fixed-capacity instrument name (no heap allocation on the hot path).
///
/// Names longer than [`INSTRUMENT_NAME_LEN`] are truncated at a char
/// boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrumentName(ArrayString<INSTRUMENT_NAME_LEN>);

impl InstrumentName {
    pub fn new(name: &str) -> Self {
        let mut s = ArrayString::new();
        for ch in name.chars() {
            if s.try_push(ch).is_err() {
                break;
            }
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for InstrumentName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for InstrumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six instrument roles the groove knows how to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Kick,
    Snare,
    Hat,
    Lead,
    Bass,
    Texture,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Kick,
        Role::Snare,
        Role::Hat,
        Role::Lead,
        Role::Bass,
        Role::Texture,
    ];

    /// Registration name used by the scheduler.
    pub const fn name(self) -> &'static str {
        match self {
            Role::Kick => "kick",
            Role::Snare => "snare",
            Role::Hat => "hat",
            Role::Lead => "lead",
            Role::Bass => "bass",
            Role::Texture => "texture",
        }
    }

    pub fn instrument(self) -> InstrumentName {
        InstrumentName::new(self.name())
    }
}

/// Who produced a request. Used by the queue's overflow policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Origin {
    /// Quantized groove step.
    #[default]
    Groove,
    /// Immediate fill from a raw interaction event.
    Fill,
}

/// A time-stamped request to sound one instrument.
///
/// Ephemeral: consumed exactly once by the scheduler. Duplicates at the
/// same time are allowed (layered hits).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerRequest {
    pub instrument: InstrumentName,
    /// Audio-clock time in seconds.
    pub time: f64,
    /// Velocity, nominally 0..=1 (voices clamp).
    pub velocity: f32,
    /// MIDI-like pitch; `None` means the voice's default note.
    pub note: Option<i32>,
    pub origin: Origin,
}

impl TriggerRequest {
    pub fn new(instrument: impl Into<InstrumentName>, time: f64, velocity: f32) -> Self {
        Self {
            instrument: instrument.into(),
            time,
            velocity,
            note: None,
            origin: Origin::Groove,
        }
    }

    pub fn with_note(mut self, note: i32) -> Self {
        self.note = Some(note);
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_truncate() {
        let name = InstrumentName::new("a-very-long-instrument-name");
        assert_eq!(name.as_str().len(), INSTRUMENT_NAME_LEN);
        assert_eq!(name.as_str(), "a-very-long-inst");
    }

    #[test]
    fn multibyte_names_truncate_on_char_boundary() {
        let name = InstrumentName::new("ééééééééé");
        // 8 two-byte chars fit, the ninth does not
        assert_eq!(name.as_str().chars().count(), 8);
    }

    #[test]
    fn role_names_round_trip_through_instrument() {
        for role in Role::ALL {
            assert_eq!(role.instrument().as_str(), role.name());
        }
    }

    #[test]
    fn builder_sets_note_and_origin() {
        let req = TriggerRequest::new("lead", 1.5, 0.4)
            .with_note(64)
            .with_origin(Origin::Fill);
        assert_eq!(req.note, Some(64));
        assert_eq!(req.origin, Origin::Fill);
        assert_eq!(req.instrument.as_str(), "lead");
    }
}
