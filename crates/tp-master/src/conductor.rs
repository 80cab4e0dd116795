//! Local stand-ins for the advisory process that proposes directives.
//!
//! A conductor answers with raw JSON, exactly what a remote advisor would
//! send, so its output goes through the same parse-and-validate intake.

use std::collections::VecDeque;

use tp_ir::{
    clamp01, BassMode, Directive, InteractionSnapshot, LeadMode, Mood, Scale, TextureMode,
    BPM_MAX, BPM_MIN, SWING_MAX,
};
use tracing::warn;

pub trait Conductor: Send {
    /// Propose the next directive given the recent snapshot and the last
    /// accepted target. `None` means "no change".
    fn propose(&mut self, snapshot: &InteractionSnapshot, previous: &Directive) -> Option<String>;
}

/// Deterministic rules mirroring the advisory guidance: react to energy
/// with tempo, to chaos with swing, and map focus to harmonic colour.
#[derive(Debug, Default)]
pub struct RuleConductor;

impl RuleConductor {
    pub fn decide(snapshot: &InteractionSnapshot, previous: &Directive) -> Directive {
        let s = snapshot.clamped();
        let mut next = *previous;
        next.density = previous.density + (s.density - previous.density) * 0.35;

        if s.energy > 0.8 {
            next.bpm = previous.bpm + 8.0 + 10.0 * (s.energy - 0.8) / 0.2;
            next.density = next.density.max(0.25);
        } else if s.energy < 0.25 {
            let target = 70.0 + 80.0 * s.energy;
            next.bpm = previous.bpm + (target - previous.bpm) * 0.5;
        }

        let adj = &mut next.mapping_adjustments;
        if s.chaos > 0.6 {
            next.swing = previous.swing + 0.05 + 0.07 * (s.chaos - 0.6) / 0.4;
            if previous.density < 0.8 {
                adj.chaos_influence = clamp01(adj.chaos_influence + 0.15);
            }
        } else if s.chaos < 0.2 {
            next.swing = previous.swing.min(0.07);
        }

        adj.pitch_influence = clamp01(0.3 + 1.4 * (s.focus_x - 0.5).abs());
        adj.rhythm_influence = adj.rhythm_influence + (s.rhythm_intent - adj.rhythm_influence) * 0.5;

        // Low on screen is darker, high is brighter.
        next.scale = match s.focus_y {
            y if y < 0.25 => Scale::Lydian,
            y if y < 0.5 => Scale::Pentatonic,
            y if y < 0.75 => Scale::Dorian,
            _ => Scale::Minor,
        };
        next.mood = if s.chaos > 0.6 {
            Mood::Tense
        } else if s.energy > 0.7 {
            Mood::Driving
        } else if s.energy < 0.25 {
            Mood::Calm
        } else {
            Mood::Playful
        };

        next.instruments.lead = match next.mood {
            Mood::Tense => LeadMode::Fm,
            Mood::Driving => LeadMode::Pluck,
            Mood::Calm => LeadMode::Sine,
            Mood::Playful => LeadMode::Triangle,
        };
        next.instruments.bass = match next.mood {
            Mood::Tense => BassMode::Fm,
            Mood::Driving => BassMode::Square,
            _ => BassMode::Sub,
        };
        next.instruments.texture = if s.chaos > 0.6 {
            TextureMode::Noise
        } else if s.rhythm_intent > 0.5 {
            TextureMode::Grain
        } else {
            TextureMode::Pad
        };

        next.bpm = next.bpm.clamp(BPM_MIN, BPM_MAX);
        next.swing = next.swing.clamp(0.0, SWING_MAX);
        next.density = clamp01(next.density);
        next
    }
}

impl Conductor for RuleConductor {
    fn propose(&mut self, snapshot: &InteractionSnapshot, previous: &Directive) -> Option<String> {
        let next = Self::decide(snapshot, previous);
        match serde_json::to_string(&next) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(%err, "cannot encode directive");
                None
            }
        }
    }
}

/// Replays a fixed list of JSON directives, one per cycle.
#[derive(Debug, Default)]
pub struct ScriptedConductor {
    script: VecDeque<String>,
}

impl ScriptedConductor {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { script: script.into_iter().map(Into::into).collect() }
    }

    /// One directive per non-blank line.
    pub fn from_json_lines(text: &str) -> Self {
        Self::new(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Conductor for ScriptedConductor {
    fn propose(&mut self, _: &InteractionSnapshot, _: &Directive) -> Option<String> {
        self.script.pop_front()
    }
}

/// Never proposes anything.
#[derive(Debug, Default)]
pub struct SilentConductor;

impl Conductor for SilentConductor {
    fn propose(&mut self, _: &InteractionSnapshot, _: &Directive) -> Option<String> {
        None
    }
}
