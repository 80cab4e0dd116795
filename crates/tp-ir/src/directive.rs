//! High-level musical directives supplied by the advisory layer.
//!
//! A directive is immutable once accepted: updates replace it wholesale.
//! Bounds are checked by [`Directive::validate`]; out-of-range values are
//! rejected, never clamped.

use alloc::string::String;
use serde::{Deserialize, Serialize};

pub const BPM_MIN: f32 = 60.0;
pub const BPM_MAX: f32 = 160.0;
pub const SWING_MAX: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Pentatonic,
    Minor,
    Dorian,
    Lydian,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Calm,
    #[default]
    Playful,
    Tense,
    Driving,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadMode {
    #[default]
    Sine,
    Triangle,
    Fm,
    Pluck,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BassMode {
    #[default]
    Sub,
    Square,
    Fm,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureMode {
    Noise,
    #[default]
    Pad,
    Grain,
}

/// A timbral mode for one of the melodic voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceMode {
    Lead(LeadMode),
    Bass(BassMode),
    Texture(TextureMode),
}

/// Per-voice timbre selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentModes {
    pub lead: LeadMode,
    pub bass: BassMode,
    pub texture: TextureMode,
}

/// How strongly each interaction dimension steers the groove.
///
/// Nominally 0..=1. Any finite value is accepted; consumers clamp at use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingAdjustments {
    pub pitch_influence: f32,
    pub rhythm_influence: f32,
    pub chaos_influence: f32,
}

impl Default for MappingAdjustments {
    fn default() -> Self {
        Self {
            pitch_influence: 0.5,
            rhythm_influence: 0.5,
            chaos_influence: 0.5,
        }
    }
}

/// The full directive record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub bpm: f32,
    pub scale: Scale,
    pub mood: Mood,
    pub density: f32,
    pub swing: f32,
    pub instruments: InstrumentModes,
    pub mapping_adjustments: MappingAdjustments,
}

impl Default for Directive {
    fn default() -> Self {
        Self {
            bpm: 96.0,
            scale: Scale::Pentatonic,
            mood: Mood::Playful,
            density: 0.4,
            swing: 0.08,
            instruments: InstrumentModes::default(),
            mapping_adjustments: MappingAdjustments::default(),
        }
    }
}

/// Why a directive was refused.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DirectiveError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("malformed directive: {0}")]
    Parse(String),
}

fn check(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), DirectiveError> {
    if !value.is_finite() {
        return Err(DirectiveError::NonFinite { field });
    }
    if value < min || value > max {
        return Err(DirectiveError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

#[inline]
fn lerp(current: f32, target: f32, amount: f32) -> f32 {
    current + (target - current) * amount
}

impl Directive {
    /// Check bpm, density and swing against their documented ranges.
    /// Mapping influences only need to be finite.
    pub fn validate(&self) -> Result<(), DirectiveError> {
        check("bpm", self.bpm, BPM_MIN, BPM_MAX)?;
        check("density", self.density, 0.0, 1.0)?;
        check("swing", self.swing, 0.0, SWING_MAX)?;
        let adj = &self.mapping_adjustments;
        check("pitchInfluence", adj.pitch_influence, f32::MIN, f32::MAX)?;
        check("rhythmInfluence", adj.rhythm_influence, f32::MIN, f32::MAX)?;
        check("chaosInfluence", adj.chaos_influence, f32::MIN, f32::MAX)?;
        Ok(())
    }

    /// Move numeric fields `amount` of the way toward `target`.
    ///
    /// Discrete fields (scale, mood, instrument modes) cannot be interpolated;
    /// they are taken from `target` only when `adopt_discrete` is set.
    pub fn blend(&self, target: &Directive, amount: f32, adopt_discrete: bool) -> Directive {
        let t = amount.clamp(0.0, 1.0);
        let (a, b) = (&self.mapping_adjustments, &target.mapping_adjustments);
        let discrete = if adopt_discrete { target } else { self };
        Directive {
            bpm: lerp(self.bpm, target.bpm, t),
            scale: discrete.scale,
            mood: discrete.mood,
            density: lerp(self.density, target.density, t),
            swing: lerp(self.swing, target.swing, t),
            instruments: discrete.instruments,
            mapping_adjustments: MappingAdjustments {
                pitch_influence: lerp(a.pitch_influence, b.pitch_influence, t),
                rhythm_influence: lerp(a.rhythm_influence, b.rhythm_influence, t),
                chaos_influence: lerp(a.chaos_influence, b.chaos_influence, t),
            },
        }
    }

    /// The melodic voice modes this directive selects.
    pub fn voice_modes(&self) -> [VoiceMode; 3] {
        [
            VoiceMode::Lead(self.instruments.lead),
            VoiceMode::Bass(self.instruments.bass),
            VoiceMode::Texture(self.instruments.texture),
        ]
    }
}
